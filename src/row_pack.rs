use std::collections::BTreeMap;

use crate::estimator::AspectRatioEstimator;
use crate::layout::Layout;
use crate::scroll_intent::{self, ScrollIntent};
use crate::{
    Alignment, ItemRange, ItemRect, LayoutState, MeasuredSize, RowPackingConfig, Viewport,
};

/// One packed row: a run of consecutive items scaled by a shared ratio so
/// their summed cross extent fills the viewport's cross extent.
#[derive(Clone, Copy, Debug)]
struct Row {
    start_index: usize,
    end_index: usize,
    /// Chunk-local leading coordinate, including the leading gap.
    start_pos: f64,
    /// Main-axis extent of the row after justification.
    extent: f64,
}

/// A fixed-size slice of the list laid out independently, so a measurement
/// only ever forces one chunk to repack.
#[derive(Clone, Debug, Default)]
struct Chunk {
    rows: Vec<Row>,
    /// Chunk-local placements; `main` starts after the leading gap.
    items: BTreeMap<usize, ItemRect>,
    /// Chunk-local coordinate just past the last row.
    content_end: f64,
    end_index: usize,
    dirty: bool,
}

/// The 2-D windowing policy: packs items into justified rows by scaling each
/// item's natural aspect ratio to a shared row extent.
///
/// Items whose natural size is unknown get an aspect ratio sampled from the
/// histogram of ratios measured so far, which keeps unmeasured regions
/// plausible without per-item estimates.
#[derive(Clone, Debug)]
pub struct RowPackingLayout {
    config: RowPackingConfig,
    total_items: usize,
    viewport: Viewport,
    scroll_position: f64,
    scroll_size: f64,

    /// Persisted natural sizes by index; the measured table for this policy.
    natural: BTreeMap<usize, MeasuredSize>,
    ratios: AspectRatioEstimator,

    chunk_len: usize,
    chunks: Vec<Chunk>,
    /// Global leading coordinate of each chunk.
    offsets: Vec<f64>,

    first: isize,
    last: isize,
    first_visible: isize,
    last_visible: isize,
    physical_min: f64,
    physical_max: f64,
    stable: bool,

    intent: Option<ScrollIntent>,
}

impl Default for RowPackingLayout {
    fn default() -> Self {
        Self::new(RowPackingConfig::default())
    }
}

impl RowPackingLayout {
    pub fn new(config: RowPackingConfig) -> Self {
        let ratios = AspectRatioEstimator::new(config.sample_seed);
        Self {
            config,
            total_items: 0,
            viewport: Viewport::default(),
            scroll_position: 0.0,
            scroll_size: 0.0,
            natural: BTreeMap::new(),
            ratios,
            chunk_len: 0,
            chunks: Vec::new(),
            offsets: Vec::new(),
            first: -1,
            last: -1,
            first_visible: -1,
            last_visible: -1,
            physical_min: 0.0,
            physical_max: 0.0,
            stable: true,
            intent: None,
        }
    }

    pub fn config(&self) -> &RowPackingConfig {
        &self.config
    }

    pub fn is_measured(&self, index: usize) -> bool {
        self.natural.contains_key(&index)
    }

    /// The first/last indices whose rows intersect the viewport proper (no
    /// overhang), recomputed each pass. A query surface only; not an event.
    pub fn visible_range(&self) -> ItemRange {
        ItemRange {
            first: self.first_visible,
            last: self.last_visible,
        }
    }

    pub fn physical_bounds(&self) -> (f64, f64) {
        (self.physical_min, self.physical_max)
    }

    /// Drops all measurements and the aspect-ratio histogram; every chunk
    /// falls back to sampled geometry on the next pass.
    pub fn reset_measurements(&mut self) {
        self.natural.clear();
        self.ratios.clear();
        for chunk in &mut self.chunks {
            chunk.dirty = true;
        }
    }

    /// Chunk size scaled so a chunk holds roughly two viewports worth of
    /// ideally-sized items.
    fn ideal_chunk_len(&self) -> usize {
        let ideal = self.config.ideal_extent.max(1.0);
        let per_chunk = (2.0 * self.viewport.main * self.viewport.cross) / (ideal * ideal);
        (per_chunk.ceil() as usize).max(1)
    }

    fn natural_dims(&mut self, index: usize) -> MeasuredSize {
        match self.natural.get(&index) {
            Some(&dims) => dims,
            None => MeasuredSize {
                main: 1.0,
                cross: self.ratios.sample(),
            },
        }
    }

    /// Rebuilds the chunk table for the current count and chunk length,
    /// marking any chunk whose item span changed for relayout.
    fn ensure_chunks(&mut self) {
        let chunk_len = self.ideal_chunk_len();
        if chunk_len != self.chunk_len {
            self.chunk_len = chunk_len;
            self.chunks.clear();
        }
        let wanted = self.total_items.div_ceil(self.chunk_len);
        self.chunks.truncate(wanted);
        for (index, chunk) in self.chunks.iter_mut().enumerate() {
            let end = (((index + 1) * self.chunk_len).min(self.total_items)) - 1;
            if chunk.end_index != end {
                chunk.dirty = true;
            }
        }
        while self.chunks.len() < wanted {
            self.chunks.push(Chunk {
                dirty: true,
                ..Chunk::default()
            });
        }
    }

    fn lay_out_dirty_chunks(&mut self) {
        for index in 0..self.chunks.len() {
            if self.chunks[index].dirty {
                let chunk = self.lay_out_chunk(index);
                self.chunks[index] = chunk;
            }
        }
        self.offsets.clear();
        let mut offset = 0.0;
        for chunk in &self.chunks {
            self.offsets.push(offset);
            offset += chunk.content_end;
        }
        self.scroll_size = if self.chunks.is_empty() {
            0.0
        } else {
            offset + self.config.gap
        };
    }

    /// Greedy justified packing of one chunk. A row accumulates items while
    /// its uniform-height scale factor stays closer to 1 than deferring the
    /// next item to a new row would leave it; once adding the next item
    /// worsens the fit, the row is closed and all members scaled by its
    /// final ratio.
    fn lay_out_chunk(&mut self, chunk_index: usize) -> Chunk {
        let gap = self.config.gap;
        let ideal = self.config.ideal_extent.max(1.0);
        let cross_view = self.viewport.cross;
        let start = chunk_index * self.chunk_len;
        let end = ((chunk_index + 1) * self.chunk_len).min(self.total_items) - 1;

        let dims: Vec<MeasuredSize> = (start..=end)
            .map(|index| self.natural_dims(index))
            .collect();

        let mut items: BTreeMap<usize, ItemRect> = BTreeMap::new();
        let mut rows: Vec<Row> = Vec::new();
        let mut row_start = start;
        let mut start_pos = gap;
        let mut row_cross = 0.0;
        let mut last_ratio = f64::INFINITY;

        for index in start..=end {
            let natural = dims[index - start];
            let scale = ideal / natural.main.max(f64::MIN_POSITIVE);
            let scaled_cross = scale * natural.cross;
            items.insert(
                index,
                ItemRect {
                    main: 0.0,
                    cross: 0.0,
                    main_extent: ideal,
                    cross_extent: scaled_cross,
                },
            );
            let available = cross_view - gap * ((index - row_start) as f64 + 2.0);
            let ratio = available / (row_cross + scaled_cross);
            if (1.0 - ratio).abs() > (1.0 - last_ratio).abs() {
                // The row fits better without this item; close it and start
                // a new row here.
                finish_row(&mut items, &mut rows, row_start, index - 1, last_ratio, start_pos, gap);
                row_start = index;
                start_pos += ideal * last_ratio + gap;
                last_ratio = (cross_view - 2.0 * gap) / scaled_cross;
                row_cross = scaled_cross;
            } else {
                row_cross += scaled_cross;
                last_ratio = ratio;
            }
            if index == end {
                finish_row(&mut items, &mut rows, row_start, index, last_ratio, start_pos, gap);
            }
        }

        let content_end = rows
            .last()
            .map_or(gap, |row| row.start_pos + gap + row.extent);
        ldebug!(
            chunk_index,
            rows = rows.len(),
            content_end,
            "RowPackingLayout::lay_out_chunk"
        );
        Chunk {
            rows,
            items,
            content_end,
            end_index: end,
            dirty: false,
        }
    }

    fn chunk_of(&self, index: usize) -> usize {
        index / self.chunk_len.max(1)
    }

    /// Global placement for `index`, if its chunk has been laid out.
    pub fn item_rect(&self, index: usize) -> Option<ItemRect> {
        let chunk_index = self.chunk_of(index);
        let chunk = self.chunks.get(chunk_index)?;
        let offset = *self.offsets.get(chunk_index)?;
        let rect = chunk.items.get(&index)?;
        Some(ItemRect {
            main: rect.main + offset,
            ..*rect
        })
    }

    fn clear_window(&mut self) {
        self.first = -1;
        self.last = -1;
        self.first_visible = -1;
        self.last_visible = -1;
        self.physical_min = 0.0;
        self.physical_max = 0.0;
        self.stable = true;
    }

    fn update_visible_indices(&mut self, scroll: f64) {
        self.first_visible = -1;
        self.last_visible = -1;
        if self.first < 0 || self.last < 0 {
            return;
        }
        let viewport_end = scroll + self.viewport.main;
        for index in self.first as usize..=self.last as usize {
            if let Some(rect) = self.item_rect(index) {
                if self.first_visible < 0 && rect.main + rect.main_extent > scroll {
                    self.first_visible = index as isize;
                }
                if rect.main < viewport_end {
                    self.last_visible = index as isize;
                }
            }
        }
    }

    /// Finds the active row span covering `[min, max]` and sets the range and
    /// physical bounds from it.
    fn select_active_rows(&mut self, min: f64, max: f64) {
        let gap = self.config.gap;
        // Last chunk starting at or before `min`.
        let mut chunk_index = self
            .offsets
            .partition_point(|&offset| offset <= min)
            .saturating_sub(1);
        let mut row_index = self.chunks[chunk_index]
            .rows
            .partition_point(|row| self.offsets[chunk_index] + row.start_pos <= min)
            .saturating_sub(1);

        let start_row = self.chunks[chunk_index].rows[row_index];
        self.first = start_row.start_index as isize;
        self.physical_min = self.offsets[chunk_index] + start_row.start_pos;

        loop {
            let row = self.chunks[chunk_index].rows[row_index];
            let row_max = self.offsets[chunk_index] + row.start_pos + row.extent + 2.0 * gap;
            if row_max >= max {
                self.last = row.end_index as isize;
                self.physical_max = row_max;
                break;
            }
            if row_index + 1 < self.chunks[chunk_index].rows.len() {
                row_index += 1;
            } else if chunk_index + 1 < self.chunks.len() {
                chunk_index += 1;
                row_index = 0;
            } else {
                self.last = row.end_index as isize;
                self.physical_max = row_max;
                break;
            }
        }
    }

    fn build_state(&self, scroll_error: f64) -> LayoutState {
        let mut positions = BTreeMap::new();
        if self.first >= 0 && self.last >= self.first {
            for index in self.first as usize..=self.last as usize {
                if let Some(rect) = self.item_rect(index) {
                    positions.insert(index, rect);
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

fn finish_row(
    items: &mut BTreeMap<usize, ItemRect>,
    rows: &mut Vec<Row>,
    start_index: usize,
    end_index: usize,
    ratio: f64,
    row_start_pos: f64,
    gap: f64,
) {
    let mut cursor = gap;
    for index in start_index..=end_index {
        if let Some(rect) = items.get_mut(&index) {
            rect.main_extent *= ratio;
            rect.cross_extent *= ratio;
            rect.main = row_start_pos;
            rect.cross = cursor;
            cursor += rect.cross_extent + gap;
        }
    }
    let extent = items.get(&end_index).map_or(0.0, |rect| rect.main_extent);
    rows.push(Row {
        start_index,
        end_index,
        start_pos: row_start_pos - gap,
        extent,
    });
}

impl Layout for RowPackingLayout {
    fn set_total_items(&mut self, count: usize) {
        if self.total_items == count {
            return;
        }
        ldebug!(count, "RowPackingLayout::set_total_items");
        self.total_items = count;
        if count == 0 {
            self.intent = None;
        }
        if self.last >= count as isize {
            self.first = -1;
            self.last = -1;
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
            lwarn!(index, count = self.total_items, "discarding measurement");
            return false;
        }
        if !(size.main > 0.0) || !(size.cross > 0.0) {
            // Aspect-ratio packing needs both dimensions.
            return false;
        }
        let previous = self.natural.insert(index, size);
        if previous == Some(size) {
            return false;
        }
        ltrace!(
            index,
            main = size.main,
            cross = size.cross,
            "RowPackingLayout::record_measurement"
        );
        self.ratios.record(size.cross / size.main);
        let chunk_index = self.chunk_of(index);
        if let Some(chunk) = self.chunks.get_mut(chunk_index) {
            chunk.dirty = true;
        }
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
            return self.total_items == 0
                || self.viewport.main <= 0.0
                || self.viewport.cross <= 0.0;
        }
        let overhang = self.config.overhang;
        let min = (self.scroll_position - overhang).max(0.0);
        let max = (self.scroll_position + self.viewport.main + overhang).min(self.scroll_size);
        self.physical_min <= min && self.physical_max >= max
    }

    fn reflow(&mut self) -> LayoutState {
        if self.total_items == 0 || self.viewport.main <= 0.0 || self.viewport.cross <= 0.0 {
            self.clear_window();
            self.scroll_size = 0.0;
            return self.build_state(0.0);
        }

        self.ensure_chunks();
        self.lay_out_dirty_chunks();

        // With every chunk laid out, positions are concrete; a pending
        // intent resolves directly against the target's rect.
        let mut adjustment = 0.0;
        if let Some(intent) = self.intent {
            let index = intent.index.min(self.total_items - 1);
            let alignment = intent.alignment.resolve(index, self.range());
            if let Some(rect) = self.item_rect(index) {
                let target = scroll_intent::target_offset(
                    rect.main,
                    rect.main_extent,
                    alignment,
                    self.viewport.main,
                    self.scroll_size,
                );
                if target != self.scroll_position {
                    adjustment += target - self.scroll_position;
                    self.scroll_position = target;
                }
            }
        }

        let clamped = self
            .scroll_position
            .clamp(0.0, (self.scroll_size - self.viewport.main).max(0.0));
        let min = (clamped - self.config.overhang).max(0.0);
        let max = (clamped + self.viewport.main + self.config.overhang).min(self.scroll_size);
        self.select_active_rows(min, max);
        self.update_visible_indices(clamped);

        self.stable = (self.first as usize..=self.last as usize)
            .all(|index| self.natural.contains_key(&index));
        self.build_state(adjustment)
    }

    fn reset_pass_state(&mut self) {
        // Row packing carries no anchor between passes.
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}
