use std::collections::BTreeMap;
use std::mem;

use crate::estimator::SizeEstimator;
use crate::layout::Layout;
use crate::scroll_intent::{self, ScrollIntent};
use crate::{
    Alignment, FlowConfig, ItemRange, ItemRect, LayoutState, MeasuredSize, PhysicalEntry, Viewport,
};

#[derive(Clone, Copy, Debug)]
struct Anchor {
    index: usize,
    position: f64,
}

/// The 1-D windowing policy: anchor-preserving incremental search with
/// online size estimation and drift correction.
///
/// All geometry is derived, not owned: every pass rebuilds the physical
/// window from the item count, the viewport, and the measured extents
/// collected so far. Measured extents persist across passes; the window
/// itself is ephemeral, which bounds memory and lets the window jump cheaply
/// on random-access scrolls.
#[derive(Clone, Debug)]
pub struct FlowLayout {
    config: FlowConfig,
    total_items: usize,
    viewport: Viewport,
    scroll_position: f64,
    scroll_size: f64,

    /// Persisted per-item measured extents. Written once per measurement,
    /// overwritten only if a later measurement differs.
    measured: BTreeMap<usize, f64>,
    estimator: SizeEstimator,

    /// Entries committed by the last stable pass.
    window: BTreeMap<usize, PhysicalEntry>,
    /// Entries placed by in-flight passes; lookups prefer this map. Swapped
    /// into `window` when a pass completes stable.
    staging: BTreeMap<usize, PhysicalEntry>,

    first: isize,
    last: isize,
    first_visible: isize,
    last_visible: isize,
    physical_min: f64,
    physical_max: f64,

    /// The anchor is chosen once and held fixed across unstable passes, so
    /// repeated passes refine the same window instead of jumping.
    anchor: Option<Anchor>,
    stable: bool,

    intent: Option<ScrollIntent>,
}

impl Default for FlowLayout {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

impl FlowLayout {
    pub fn new(config: FlowConfig) -> Self {
        let estimator = SizeEstimator::new(config.default_extent);
        Self {
            config,
            total_items: 0,
            viewport: Viewport::default(),
            scroll_position: 0.0,
            scroll_size: 0.0,
            measured: BTreeMap::new(),
            estimator,
            window: BTreeMap::new(),
            staging: BTreeMap::new(),
            first: -1,
            last: -1,
            first_visible: -1,
            last_visible: -1,
            physical_min: 0.0,
            physical_max: 0.0,
            anchor: None,
            stable: true,
            intent: None,
        }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// The first/last indices intersecting the viewport proper (no overhang),
    /// recomputed each pass. A query surface only; not an event.
    pub fn visible_range(&self) -> ItemRange {
        ItemRange {
            first: self.first_visible,
            last: self.last_visible,
        }
    }

    /// Leading/trailing physical coordinates of the current window.
    pub fn physical_bounds(&self) -> (f64, f64) {
        (self.physical_min, self.physical_max)
    }

    pub fn is_measured(&self, index: usize) -> bool {
        self.measured.contains_key(&index)
    }

    /// Current physical entry for `index`, preferring in-flight placements.
    pub fn entry(&self, index: usize) -> Option<PhysicalEntry> {
        self.staging
            .get(&index)
            .or_else(|| self.window.get(&index))
            .copied()
    }

    /// Drops all measurements and the estimator aggregate.
    pub fn reset_measurements(&mut self) {
        self.measured.clear();
        self.estimator.clear();
    }

    /// Mean step from one leading edge to the next: estimated extent plus
    /// spacing.
    fn mean_step(&self) -> f64 {
        self.estimator.estimate() + self.config.spacing
    }

    fn update_scroll_size(&mut self) {
        let n = self.total_items;
        self.scroll_size = if n == 0 {
            0.0
        } else {
            let spacing_total = self.config.spacing * (n - 1) as f64;
            (n as f64 * self.estimator.estimate() + spacing_total).max(0.0)
        };
    }

    /// Best-known position of the leading edge of `index`: exact for index 0,
    /// the tracked position for windowed entries, an estimate otherwise.
    fn position_of(&self, index: usize) -> f64 {
        if index == 0 {
            return 0.0;
        }
        match self.entry(index) {
            Some(entry) => entry.position,
            None => self.estimate_position(index),
        }
    }

    fn estimate_position(&self, index: usize) -> f64 {
        if self.first < 0 || self.last < 0 {
            return index as f64 * self.mean_step();
        }
        let first = self.first as usize;
        let last = self.last as usize;
        if index < first {
            let reference = self.entry(first).map_or(0.0, |e| e.position);
            reference - (first - index) as f64 * self.mean_step()
        } else {
            let reference = self
                .entry(last)
                .map_or(last as f64 * self.mean_step(), |e| e.end());
            let gap_steps = index.saturating_sub(last + 1) as f64;
            reference + self.config.spacing + gap_steps * self.mean_step()
        }
    }

    /// Arithmetic anchor estimate for when no usable previous window exists.
    fn calculate_anchor(&self, lower: f64, upper: f64) -> usize {
        if lower <= 0.0 {
            return 0;
        }
        if upper >= self.scroll_size - self.viewport.main {
            return self.total_items - 1;
        }
        let midpoint = (lower + upper) / 2.0;
        let step = self.mean_step().max(f64::MIN_POSITIVE);
        ((midpoint / step) as usize).min(self.total_items - 1)
    }

    /// Picks the anchor for this pass: an entry of the previous window when
    /// it overlaps the requested bounds (continuity), otherwise an arithmetic
    /// estimate.
    fn resolve_anchor(&self, lower: f64, upper: f64) -> usize {
        if self.first < 0 || self.last < 0 {
            return self.calculate_anchor(lower, upper);
        }
        let first = self.first as usize;
        let last = self.last as usize;
        let (Some(first_entry), Some(last_entry)) = (self.entry(first), self.entry(last)) else {
            return self.calculate_anchor(lower, upper);
        };
        if last_entry.end() < lower || first_entry.position > upper {
            // Requested range lies entirely past or before the previous
            // window.
            return self.calculate_anchor(lower, upper);
        }
        // The previous window overlaps the bounds; binary-search its
        // contiguous index range for the first entry whose trailing edge
        // reaches `lower`. Positions are monotone in index.
        let mut lo = first;
        let mut hi = last;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let Some(entry) = self.entry(mid) else {
                return self.calculate_anchor(lower, upper);
            };
            if entry.end() < lower {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Extent for `index`: the measurement if one exists, else the running
    /// estimate, flagging the pass unstable.
    fn extent_for(&self, index: usize, stable: &mut bool) -> (f64, bool) {
        match self.measured.get(&index) {
            Some(&extent) => (extent, true),
            None => {
                *stable = false;
                (self.estimator.estimate(), false)
            }
        }
    }

    fn clear_window(&mut self) {
        self.first = -1;
        self.last = -1;
        self.first_visible = -1;
        self.last_visible = -1;
        self.physical_min = 0.0;
        self.physical_max = 0.0;
        mem::swap(&mut self.window, &mut self.staging);
        self.staging.clear();
        self.anchor = None;
        self.stable = true;
    }

    /// Drift correction (single scalar subtracted from all positions and the
    /// scroll position), evaluated in priority order. `first == 0` comes
    /// first so the degenerate whole-list-fits case collapses to pinning
    /// `position(0)` at exactly 0.
    fn correction(&self, first: usize, last: usize) -> f64 {
        let step = self.mean_step();
        if first == 0 {
            self.physical_min
        } else if self.physical_min <= 0.0 {
            self.physical_min - first as f64 * step
        } else if last == self.total_items - 1 {
            self.physical_max - self.scroll_size
        } else if self.physical_max >= self.scroll_size {
            (self.physical_max - self.scroll_size)
                + (self.total_items - 1 - last) as f64 * step
        } else {
            0.0
        }
    }

    fn update_visible_indices(&mut self) {
        if self.first < 0 || self.last < 0 {
            self.first_visible = -1;
            self.last_visible = -1;
            return;
        }
        let mut first_visible = self.first as usize;
        let last = self.last as usize;
        while first_visible < last {
            match self.entry(first_visible) {
                Some(entry) if entry.end() <= self.scroll_position => first_visible += 1,
                _ => break,
            }
        }
        let mut last_visible = last;
        let viewport_end = self.scroll_position + self.viewport.main;
        while last_visible > first_visible {
            match self.entry(last_visible) {
                Some(entry) if entry.position >= viewport_end => last_visible -= 1,
                _ => break,
            }
        }
        self.first_visible = first_visible as isize;
        self.last_visible = last_visible as isize;
    }

    fn build_state(&self, scroll_error: f64) -> LayoutState {
        let mut positions = BTreeMap::new();
        if self.first >= 0 && self.last >= self.first {
            for index in self.first as usize..=self.last as usize {
                if let Some(entry) = self.entry(index) {
                    positions.insert(
                        index,
                        ItemRect {
                            main: entry.position,
                            cross: 0.0,
                            main_extent: entry.extent,
                            cross_extent: self.viewport.cross,
                        },
                    );
                }
            }
        }
        LayoutState {
            range: self.range(),
            scroll_size: self.scroll_size,
            positions,
            scroll_error,
            stable: self.stable,
        }
    }
}

impl Layout for FlowLayout {
    fn set_total_items(&mut self, count: usize) {
        if self.total_items == count {
            return;
        }
        ldebug!(count, "FlowLayout::set_total_items");
        self.total_items = count;
        // Entries past the new end are meaningless geometry; drop them but
        // keep in-range entries for anchor continuity.
        self.window.split_off(&count);
        self.staging.split_off(&count);
        if self.last >= count as isize {
            self.first = -1;
            self.last = -1;
        }
        if self.anchor.is_some_and(|a| a.index >= count) {
            self.anchor = None;
        }
        if count == 0 {
            self.intent = None;
        }
    }

    fn total_items(&self) -> usize {
        self.total_items
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Viewport {
            main: sanitize(viewport.main),
            cross: sanitize(viewport.cross),
        };
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_overhang(&mut self, overhang: f64) {
        self.config.overhang = sanitize(overhang);
    }

    fn overhang(&self) -> f64 {
        self.config.overhang
    }

    fn set_scroll_position(&mut self, position: f64) {
        self.scroll_position = if position.is_finite() { position } else { 0.0 };
    }

    fn scroll_position(&self) -> f64 {
        self.scroll_position
    }

    fn scroll_size(&self) -> f64 {
        self.scroll_size
    }

    fn record_measurement(&mut self, index: usize, size: MeasuredSize) -> bool {
        if index >= self.total_items {
            // Stale callback, e.g. after a count shrink.
            lwarn!(index, count = self.total_items, "discarding measurement");
            return false;
        }
        let extent = sanitize(size.main);
        let previous = self.measured.insert(index, extent);
        if previous == Some(extent) {
            return false;
        }
        ltrace!(index, extent, "FlowLayout::record_measurement");
        self.estimator.record(previous, extent);
        true
    }

    fn request_scroll_to(&mut self, index: usize, alignment: Alignment) {
        self.intent = Some(ScrollIntent::new(index, alignment));
    }

    fn cancel_scroll_to(&mut self) {
        self.intent = None;
    }

    fn has_pending_intent(&self) -> bool {
        self.intent.is_some()
    }

    fn range(&self) -> ItemRange {
        ItemRange {
            first: self.first,
            last: self.last,
        }
    }

    fn covers_viewport(&self) -> bool {
        if self.first < 0 || self.last < 0 {
            return self.total_items == 0 || self.viewport.main <= 0.0;
        }
        let overhang = self.config.overhang;
        let min = (self.scroll_position - overhang).max(0.0);
        let max = (self.scroll_position + self.viewport.main + overhang).min(self.scroll_size);
        self.physical_min <= min && self.physical_max >= max
    }

    fn reflow(&mut self) -> LayoutState {
        self.update_scroll_size();
        // Signed adjustment applied to the internal scroll position this
        // pass; surfaced as the scroll-error delta.
        let mut adjustment = 0.0;

        if self.total_items == 0 || self.viewport.main <= 0.0 {
            self.clear_window();
            return self.build_state(0.0);
        }

        // Measurements may have shrunk the estimate below the host's scroll
        // position. Pull the scroll back into the valid range instead of
        // letting the window fall off the end of the list; the move is
        // surfaced as scroll error like any other adjustment.
        let max_scroll = (self.scroll_size - self.viewport.main).max(0.0);
        let clamped = self.scroll_position.clamp(0.0, max_scroll);
        if clamped != self.scroll_position {
            ldebug!(
                from = self.scroll_position,
                to = clamped,
                "clamping scroll position"
            );
            adjustment += clamped - self.scroll_position;
            self.scroll_position = clamped;
            // The held anchor described the old scroll frame.
            self.anchor = None;
        }

        // A pending scroll intent overrides the scroll position and anchors
        // the pass on its target, re-resolved from the target's best-known
        // (possibly still estimated) position.
        if let Some(intent) = self.intent {
            let index = intent.index.min(self.total_items - 1);
            let alignment = intent.alignment.resolve(index, self.range());
            let position = self.position_of(index);
            let extent = self
                .measured
                .get(&index)
                .copied()
                .unwrap_or_else(|| self.estimator.estimate());
            let target = scroll_intent::target_offset(
                position,
                extent,
                alignment,
                self.viewport.main,
                self.scroll_size,
            );
            if target != self.scroll_position {
                adjustment += target - self.scroll_position;
                self.scroll_position = target;
            }
            self.anchor = Some(Anchor {
                index,
                position: self.position_of(index),
            });
        }

        let mut lower = self.scroll_position - self.config.overhang;
        let mut upper = self.scroll_position + self.viewport.main + self.config.overhang;

        let mut anchor = match self.anchor {
            Some(anchor) if anchor.index < self.total_items => anchor,
            _ => {
                let index = self.resolve_anchor(lower, upper);
                Anchor {
                    index,
                    position: self.position_of(index),
                }
            }
        };

        let mut stable = true;
        let spacing = self.config.spacing;
        let (anchor_extent, anchor_measured) = self.extent_for(anchor.index, &mut stable);

        // Boundary pins need no geometry: index 0 starts at 0, the last
        // index ends at the scroll-size estimate.
        if anchor.index == 0 {
            anchor.position = 0.0;
        }
        if anchor.index == self.total_items - 1 {
            anchor.position = self.scroll_size - anchor_extent;
        }

        // The anchor itself may sit outside the requested bounds (its
        // position was an estimate). Correct the error and keep the anchor.
        let mut anchor_error = 0.0;
        if anchor.position + anchor_extent + spacing < lower {
            anchor_error = lower - (anchor.position + anchor_extent + spacing);
        }
        if anchor.position > upper {
            anchor_error = upper - anchor.position;
        }
        if anchor_error != 0.0 {
            self.scroll_position -= anchor_error;
            adjustment -= anchor_error;
            lower -= anchor_error;
            upper -= anchor_error;
        }

        self.staging.insert(
            anchor.index,
            PhysicalEntry {
                position: anchor.position,
                extent: anchor_extent,
                measured: anchor_measured,
            },
        );
        let mut first = anchor.index;
        let mut last = anchor.index;
        self.physical_min = anchor.position;
        self.physical_max = anchor.position + anchor_extent;

        // Expansion must terminate: each step strictly grows coverage and the
        // index range is finite. The cap guards against a programming error
        // turning into an infinite loop.
        let cap = self.total_items;
        let mut steps = 0usize;

        while self.physical_min > lower && first > 0 {
            if steps >= cap {
                lwarn!(first, last, "expansion cap hit while filling backward");
                debug_assert!(steps < cap, "window expansion failed to terminate");
                stable = false;
                break;
            }
            steps += 1;
            first -= 1;
            let (extent, measured) = self.extent_for(first, &mut stable);
            self.physical_min -= extent + spacing;
            self.staging.insert(
                first,
                PhysicalEntry {
                    position: self.physical_min,
                    extent,
                    measured,
                },
            );
        }

        steps = 0;
        while self.physical_max < upper && last < self.total_items - 1 {
            if steps >= cap {
                lwarn!(first, last, "expansion cap hit while filling forward");
                debug_assert!(steps < cap, "window expansion failed to terminate");
                stable = false;
                break;
            }
            steps += 1;
            last += 1;
            let (extent, measured) = self.extent_for(last, &mut stable);
            let position = self.physical_max + spacing;
            self.staging.insert(
                last,
                PhysicalEntry {
                    position,
                    extent,
                    measured,
                },
            );
            self.physical_max = position + extent;
        }

        self.first = first as isize;
        self.last = last as isize;

        // Reconcile estimate-based backfill with the list boundaries so the
        // list does not "breathe" as measurements replace estimates.
        let delta = self.correction(first, last);
        if delta != 0.0 {
            ltrace!(delta, first, last, "drift correction");
            self.physical_min -= delta;
            self.physical_max -= delta;
            anchor.position -= delta;
            // Staging can still carry entries from earlier unstable passes
            // outside the new range; they are consulted for continuity and
            // must move with everything else.
            for entry in self.staging.values_mut() {
                entry.position -= delta;
            }
            self.scroll_position -= delta;
            adjustment -= delta;
        }

        self.anchor = Some(anchor);
        self.stable = stable;
        if stable {
            mem::swap(&mut self.window, &mut self.staging);
            self.staging.clear();
        }
        self.update_visible_indices();
        self.build_state(adjustment)
    }

    fn reset_pass_state(&mut self) {
        self.anchor = None;
        self.stable = true;
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}
