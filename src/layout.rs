use crate::{Alignment, ItemRange, LayoutState, MeasuredSize, Viewport};

/// The seam between the reflow scheduler and a layout policy.
///
/// A policy owns all derived geometry: the physical window, the scroll-size
/// estimate, and the scroll position (which a pass may adjust for drift
/// correction or a pending scroll intent). Setters only store inputs; no
/// geometry is recomputed until [`Layout::reflow`] runs.
pub trait Layout {
    fn set_total_items(&mut self, count: usize);
    fn total_items(&self) -> usize;

    fn set_viewport(&mut self, viewport: Viewport);
    fn viewport(&self) -> Viewport;

    fn set_overhang(&mut self, overhang: f64);
    fn overhang(&self) -> f64;

    fn set_scroll_position(&mut self, position: f64);
    fn scroll_position(&self) -> f64;

    /// Current total-extent estimate used to size the scrollable container.
    fn scroll_size(&self) -> f64;

    /// Stores a measurement. Returns `true` when the value changed something
    /// and a reflow is warranted; out-of-range or invalid measurements are
    /// silently discarded and return `false`.
    fn record_measurement(&mut self, index: usize, size: MeasuredSize) -> bool;

    fn request_scroll_to(&mut self, index: usize, alignment: Alignment);
    fn cancel_scroll_to(&mut self);
    fn has_pending_intent(&self) -> bool;

    /// The materialized range from the last pass.
    fn range(&self) -> ItemRange;

    /// Whether the current physical window still covers the viewport plus
    /// overhang at the current scroll position. When `false`, a scroll
    /// movement must trigger a reflow.
    fn covers_viewport(&self) -> bool;

    /// Runs one synchronous, non-reentrant pass and returns its full outcome.
    fn reflow(&mut self) -> LayoutState;

    /// Forgets cross-pass continuity state (the held anchor). Called by the
    /// engine when a pass settles, so the next pass re-anchors fresh.
    fn reset_pass_state(&mut self);
}
