//! A headless incremental windowing engine for virtualized lists.
//!
//! The engine decides which slice of an arbitrarily long list is worth
//! materializing for the current viewport and scroll position, places those
//! items, and refines its picture as real measurements replace estimates.
//! Geometry is always derived: a pass rebuilds the physical window from the
//! item count, the viewport, and the measurements collected so far, so the
//! window can jump cheaply on random-access scrolls and memory stays
//! proportional to what has been measured, not to the list.
//!
//! It is UI-agnostic. A host layer is expected to provide:
//! - viewport extents (main and cross axis)
//! - the scroll position, echoed back each frame
//! - measured item sizes, fed back as items render
//!
//! Two layout policies ship with the crate: [`FlowLayout`] for 1-D lists with
//! per-item extents, and [`RowPackingLayout`] for 2-D justified rows packed
//! by aspect ratio. Both sit behind the [`Layout`] trait, which is the seam
//! for custom policies.
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod config;
mod engine;
mod estimator;
mod events;
mod flow;
mod layout;
mod row_pack;
mod scroll_intent;
mod types;

#[cfg(test)]
mod tests;

pub use config::{EngineConfig, FlowConfig, RowPackingConfig};
pub use engine::WindowingEngine;
pub use estimator::{AspectRatioEstimator, SizeEstimator};
pub use events::{
    EngineHooks, ItemPositionsChangedHook, RangeChangedHook, ScrollErrorHook,
    ScrollSizeChangedHook,
};
pub use flow::FlowLayout;
pub use layout::Layout;
pub use row_pack::RowPackingLayout;
pub use scroll_intent::ScrollIntent;
pub use types::{
    Alignment, ItemRange, ItemRect, LayoutState, MeasuredSize, PhysicalEntry, Viewport,
};
