use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;

use crate::events::EngineHooks;
use crate::flow::FlowLayout;
use crate::layout::Layout;
use crate::{Alignment, EngineConfig, ItemRange, ItemRect, MeasuredSize, Viewport};

/// Where the engine is in its input-coalesce / reflow cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Outputs match inputs; nothing to do.
    Clean,
    /// At least one input changed since the last pass.
    Dirty,
    /// A pass is running right now. Inputs arriving in this phase set the
    /// pending flag instead of the dirty phase.
    Reflowing,
}

/// The reflow scheduler wrapped around a layout policy.
///
/// Setters only record inputs and mark the engine dirty; nothing is
/// recomputed until [`WindowingEngine::reflow`] runs, so any number of input
/// changes between passes coalesce into one pass. The host decides when a
/// pass runs (typically once per frame).
///
/// A pass emits up to four events through [`EngineHooks`], always in the same
/// order: range-changed, scroll-size-changed, item-positions-changed,
/// scroll-error. Range and scroll-size are diffed against the previous pass;
/// positions fire on every pass with a non-empty window; scroll-error fires
/// whenever the pass adjusted the internal scroll position.
#[derive(Debug)]
pub struct WindowingEngine<L: Layout = FlowLayout> {
    layout: L,
    config: EngineConfig,
    hooks: EngineHooks,
    phase: Phase,
    pending: bool,
    last_range: Option<ItemRange>,
    last_scroll_size: Option<f64>,
    /// Scroll position the engine expects the host to be at while a scroll
    /// intent is pending. A host position that strays beyond the cancel
    /// threshold means the user scrolled independently.
    expected_scroll: Option<f64>,
}

impl<L: Layout + Default> Default for WindowingEngine<L> {
    fn default() -> Self {
        Self::new(L::default())
    }
}

impl<L: Layout> WindowingEngine<L> {
    pub fn new(layout: L) -> Self {
        Self::with_config(layout, EngineConfig::default())
    }

    pub fn with_config(layout: L, config: EngineConfig) -> Self {
        Self {
            layout,
            config,
            hooks: EngineHooks::default(),
            phase: Phase::Dirty,
            pending: false,
            last_range: None,
            last_scroll_size: None,
            expected_scroll: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    /// Mutable access to the policy. Conservatively marks the engine dirty,
    /// since the engine cannot see what the caller changed.
    pub fn layout_mut(&mut self) -> &mut L {
        self.invalidate();
        &mut self.layout
    }

    pub fn on_range_changed(&mut self, hook: impl Fn(ItemRange) + Send + Sync + 'static) {
        self.hooks.on_range_changed = Some(Arc::new(hook));
    }

    pub fn on_scroll_size_changed(&mut self, hook: impl Fn(f64) + Send + Sync + 'static) {
        self.hooks.on_scroll_size_changed = Some(Arc::new(hook));
    }

    pub fn on_item_positions_changed(
        &mut self,
        hook: impl Fn(&BTreeMap<usize, ItemRect>) + Send + Sync + 'static,
    ) {
        self.hooks.on_item_positions_changed = Some(Arc::new(hook));
    }

    pub fn on_scroll_error(&mut self, hook: impl Fn(f64) + Send + Sync + 'static) {
        self.hooks.on_scroll_error = Some(Arc::new(hook));
    }

    pub fn set_hooks(&mut self, hooks: EngineHooks) {
        self.hooks = hooks;
    }

    pub fn set_total_items(&mut self, count: usize) {
        if count == self.layout.total_items() {
            return;
        }
        self.layout.set_total_items(count);
        self.invalidate();
    }

    pub fn total_items(&self) -> usize {
        self.layout.total_items()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport == self.layout.viewport() {
            return;
        }
        self.layout.set_viewport(viewport);
        self.invalidate();
    }

    pub fn set_viewport_extent(&mut self, main: f64) {
        let viewport = self.layout.viewport();
        self.set_viewport(Viewport { main, ..viewport });
    }

    pub fn set_cross_extent(&mut self, cross: f64) {
        let viewport = self.layout.viewport();
        self.set_viewport(Viewport { cross, ..viewport });
    }

    pub fn set_overhang(&mut self, overhang: f64) {
        if overhang == self.layout.overhang() {
            return;
        }
        self.layout.set_overhang(overhang);
        self.invalidate();
    }

    /// Records the host's scroll position.
    ///
    /// Movement below the scroll threshold is stored but never triggers a
    /// pass. Larger movement triggers a pass only when the physical window no
    /// longer covers the viewport plus overhang. Independent movement while a
    /// scroll intent is pending cancels the intent.
    pub fn set_scroll_position(&mut self, position: f64) {
        let position = if position.is_finite() { position } else { 0.0 };
        if let Some(expected) = self.expected_scroll {
            if (position - expected).abs() > self.config.intent_cancel_threshold {
                ldebug!(position, expected, "scroll intent cancelled by host scroll");
                self.layout.cancel_scroll_to();
                self.expected_scroll = None;
            }
        }
        let moved = (position - self.layout.scroll_position()).abs();
        self.layout.set_scroll_position(position);
        if moved >= self.config.scroll_threshold && !self.layout.covers_viewport() {
            self.invalidate();
        }
    }

    pub fn scroll_position(&self) -> f64 {
        self.layout.scroll_position()
    }

    /// Applies one frame's worth of host scroll state as a single coalesced
    /// update.
    pub fn apply_scroll_frame(&mut self, position: f64, viewport: Viewport) {
        self.set_viewport(viewport);
        self.set_scroll_position(position);
    }

    /// Feeds back one measured item size. Non-finite or negative dimensions
    /// are clamped before the policy sees them.
    pub fn measurement_result(&mut self, index: usize, size: MeasuredSize) {
        if self.record(index, size) {
            self.invalidate();
        }
    }

    /// Feeds back a batch of measurements with a single invalidation.
    pub fn measure_many(&mut self, measurements: impl IntoIterator<Item = (usize, MeasuredSize)>) {
        let mut changed = false;
        for (index, size) in measurements {
            changed |= self.record(index, size);
        }
        if changed {
            self.invalidate();
        }
    }

    fn record(&mut self, index: usize, size: MeasuredSize) -> bool {
        let size = MeasuredSize {
            main: sanitize(size.main),
            cross: sanitize(size.cross),
        };
        self.layout.record_measurement(index, size)
    }

    /// Requests that `index` be brought to `alignment`. The request persists
    /// across passes (re-resolved as estimates become measurements) until it
    /// is cancelled by independent host scrolling.
    pub fn scroll_to_index(&mut self, index: usize, alignment: Alignment) {
        ldebug!(index, ?alignment, "scroll_to_index");
        self.layout.request_scroll_to(index, alignment);
        self.expected_scroll = None;
        self.invalidate();
    }

    pub fn range(&self) -> ItemRange {
        self.layout.range()
    }

    pub fn scroll_size(&self) -> f64 {
        self.layout.scroll_size()
    }

    /// Largest valid scroll offset for the current scroll-size estimate.
    pub fn max_scroll_offset(&self) -> f64 {
        (self.layout.scroll_size() - self.layout.viewport().main).max(0.0)
    }

    pub fn clamp_scroll_offset(&self, position: f64) -> f64 {
        position.clamp(0.0, self.max_scroll_offset())
    }

    pub fn is_dirty(&self) -> bool {
        self.phase == Phase::Dirty
    }

    fn invalidate(&mut self) {
        match self.phase {
            Phase::Reflowing => self.pending = true,
            _ => self.phase = Phase::Dirty,
        }
    }

    /// Runs one pass if any input changed since the last one. Returns whether
    /// a pass ran.
    pub fn reflow(&mut self) -> bool {
        if self.phase != Phase::Dirty {
            return false;
        }
        self.phase = Phase::Reflowing;
        let previous = self.last_range;
        let state = self.layout.reflow();
        ldebug!(
            first = state.range.first,
            last = state.range.last,
            scroll_size = state.scroll_size,
            scroll_error = state.scroll_error,
            stable = state.stable,
            "reflow pass"
        );

        if Some(state.range) != previous {
            self.last_range = Some(state.range);
            if let Some(hook) = &self.hooks.on_range_changed {
                hook(state.range);
            }
        }
        if Some(state.scroll_size) != self.last_scroll_size {
            self.last_scroll_size = Some(state.scroll_size);
            if let Some(hook) = &self.hooks.on_scroll_size_changed {
                hook(state.scroll_size);
            }
        }
        if !state.positions.is_empty() {
            if let Some(hook) = &self.hooks.on_item_positions_changed {
                hook(&state.positions);
            }
        }
        if state.scroll_error != 0.0 {
            if let Some(hook) = &self.hooks.on_scroll_error {
                hook(state.scroll_error);
            }
        }

        // A pass that changed nothing has settled; drop cross-pass
        // continuity state so the next pass re-anchors fresh.
        if state.range.is_empty() || previous == Some(state.range) {
            self.layout.reset_pass_state();
        }
        self.expected_scroll = self
            .layout
            .has_pending_intent()
            .then(|| self.layout.scroll_position());
        self.phase = if mem::take(&mut self.pending) {
            Phase::Dirty
        } else {
            Phase::Clean
        };
        true
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}
