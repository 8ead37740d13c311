/// Configuration for [`crate::FlowLayout`].
///
/// All fields are plain values with documented defaults; there is no dynamic
/// merging. Invalid values are clamped at the point of use rather than
/// rejected, since a transient bad input must never crash a pass.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlowConfig {
    /// Extent assumed for an item before any measurement exists. Default: `100.0`.
    pub default_extent: f64,
    /// Main-axis space between adjacent items (not before the first or after
    /// the last). Default: `0.0`.
    pub spacing: f64,
    /// Extra main-axis distance beyond the viewport that must also be covered
    /// by materialized items. Default: `1000.0`.
    pub overhang: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            default_extent: 100.0,
            spacing: 0.0,
            overhang: 1000.0,
        }
    }
}

impl FlowConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_extent(mut self, default_extent: f64) -> Self {
        self.default_extent = default_extent;
        self
    }

    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_overhang(mut self, overhang: f64) -> Self {
        self.overhang = overhang;
        self
    }
}

/// Configuration for [`crate::RowPackingLayout`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowPackingConfig {
    /// Target main-axis extent of a packed row before justification scaling.
    /// Default: `200.0`.
    pub ideal_extent: f64,
    /// Space between items within a row and between rows. Default: `8.0`.
    pub gap: f64,
    /// Extra main-axis distance beyond the viewport that must also be covered.
    /// Default: `1000.0`.
    pub overhang: f64,
    /// Seed for the deterministic aspect-ratio sampler used for unmeasured
    /// items. Default: `0x9e37_79b9_7f4a_7c15`.
    pub sample_seed: u64,
}

impl Default for RowPackingConfig {
    fn default() -> Self {
        Self {
            ideal_extent: 200.0,
            gap: 8.0,
            overhang: 1000.0,
            sample_seed: 0x9e37_79b9_7f4a_7c15,
        }
    }
}

impl RowPackingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ideal_extent(mut self, ideal_extent: f64) -> Self {
        self.ideal_extent = ideal_extent;
        self
    }

    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_overhang(mut self, overhang: f64) -> Self {
        self.overhang = overhang;
        self
    }

    pub fn with_sample_seed(mut self, sample_seed: u64) -> Self {
        self.sample_seed = sample_seed;
        self
    }
}

/// Configuration for [`crate::WindowingEngine`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Minimum scroll-position change that counts as movement at all.
    /// Smaller changes are recorded but never trigger a reflow. Default: `1.0`.
    pub scroll_threshold: f64,
    /// How far the host's scroll position may drift from the engine's
    /// expected position before a pending scroll-to-index request is
    /// cancelled. Default: `1.0`.
    pub intent_cancel_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scroll_threshold: 1.0,
            intent_cancel_threshold: 1.0,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scroll_threshold(mut self, scroll_threshold: f64) -> Self {
        self.scroll_threshold = scroll_threshold;
        self
    }

    pub fn with_intent_cancel_threshold(mut self, intent_cancel_threshold: f64) -> Self {
        self.intent_cancel_threshold = intent_cancel_threshold;
        self
    }
}
