use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{ItemRange, ItemRect};

/// Fired when the materialized index range changes. `ItemRange::EMPTY`
/// (`-1/-1`) means nothing is materialized.
pub type RangeChangedHook = Arc<dyn Fn(ItemRange) + Send + Sync>;

/// Fired when the total scroll-size estimate changes.
pub type ScrollSizeChangedHook = Arc<dyn Fn(f64) + Send + Sync>;

/// Fired after every pass with a non-empty window; positions may shift even
/// when the range does not.
pub type ItemPositionsChangedHook = Arc<dyn Fn(&BTreeMap<usize, ItemRect>) + Send + Sync>;

/// Fired when a pass adjusted the internal scroll position for any reason:
/// drift correction, clamping an out-of-range scroll, or scroll-intent
/// resolution. The host must add the delta to its own scroll offset in the
/// same frame to avoid visible jitter.
pub type ScrollErrorHook = Arc<dyn Fn(f64) + Send + Sync>;

/// Observer registration for the engine's four output events.
///
/// Emission order within one pass is a contract, not an accident:
/// range-changed, then scroll-size-changed, then item-position-changed, then
/// scroll-error. Hooks receive plain data and cannot re-enter the engine.
#[derive(Clone, Default)]
pub struct EngineHooks {
    pub on_range_changed: Option<RangeChangedHook>,
    pub on_scroll_size_changed: Option<ScrollSizeChangedHook>,
    pub on_item_positions_changed: Option<ItemPositionsChangedHook>,
    pub on_scroll_error: Option<ScrollErrorHook>,
}

impl std::fmt::Debug for EngineHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHooks")
            .field("on_range_changed", &self.on_range_changed.is_some())
            .field(
                "on_scroll_size_changed",
                &self.on_scroll_size_changed.is_some(),
            )
            .field(
                "on_item_positions_changed",
                &self.on_item_positions_changed.is_some(),
            )
            .field("on_scroll_error", &self.on_scroll_error.is_some())
            .finish()
    }
}
