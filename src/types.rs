use std::collections::BTreeMap;

/// How a scroll-to-index request positions the target item in the viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Alignment {
    Start,
    Center,
    End,
    /// Resolves to `Start` or `End` depending on where the target index sits
    /// relative to the midpoint of the current window.
    Nearest,
}

/// Viewport extents in the scroll ("main") axis and the perpendicular
/// ("cross") axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    pub main: f64,
    pub cross: f64,
}

/// The materialized index range, inclusive on both ends.
///
/// `-1/-1` is the empty sentinel: no items are materialized. This mirrors the
/// range reported to hosts, which need a stable "nothing to show" value when
/// the item count or viewport collapses to zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemRange {
    pub first: isize,
    pub last: isize,
}

impl ItemRange {
    pub const EMPTY: Self = Self {
        first: -1,
        last: -1,
    };

    pub fn new(first: usize, last: usize) -> Self {
        Self {
            first: first as isize,
            last: last as isize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first < 0 || self.last < self.first
    }

    /// Number of materialized items.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.last - self.first + 1) as usize
        }
    }
}

impl Default for ItemRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// A positioned entry of the physical window.
///
/// `position` is the main-axis coordinate of the leading edge, relative to
/// the start of the list. `measured` records whether `extent` came from a
/// real measurement or from the estimator.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhysicalEntry {
    pub position: f64,
    pub extent: f64,
    pub measured: bool,
}

impl PhysicalEntry {
    pub fn end(&self) -> f64 {
        self.position + self.extent
    }
}

/// The computed placement of a materialized item, delivered through the
/// item-positions hook.
///
/// 1-D policies only move items along the main axis and leave `cross` at 0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemRect {
    pub main: f64,
    pub cross: f64,
    pub main_extent: f64,
    pub cross_extent: f64,
}

/// A measurement reported by the host for a single item.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeasuredSize {
    pub main: f64,
    pub cross: f64,
}

/// The full outcome of one reflow pass, produced by a layout policy and
/// diffed against the previous pass by the engine before anything is emitted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutState {
    pub range: ItemRange,
    pub scroll_size: f64,
    pub positions: BTreeMap<usize, ItemRect>,
    /// Signed adjustment the pass applied to the internal scroll position.
    /// The host must add this to its own scroll offset in the same frame.
    pub scroll_error: f64,
    /// `true` only if every entry in the window was built from a measured
    /// extent.
    pub stable: bool,
}
