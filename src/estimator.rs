use std::collections::BTreeMap;

/// Running mean over the main-axis extents of measured items.
///
/// The estimator only keeps the scalar aggregate; per-index history lives in
/// the layout's persisted measured-extent table. Remeasurements are applied
/// as a delta against the previously recorded value so the mean never
/// double-counts an item.
#[derive(Clone, Debug)]
pub struct SizeEstimator {
    total: f64,
    count: usize,
    default_extent: f64,
}

impl SizeEstimator {
    pub fn new(default_extent: f64) -> Self {
        Self {
            total: 0.0,
            count: 0,
            default_extent: default_extent.max(0.0),
        }
    }

    /// Records a measurement. `previous` is the value previously recorded for
    /// the same item, if any.
    pub fn record(&mut self, previous: Option<f64>, extent: f64) {
        let extent = extent.max(0.0);
        match previous {
            Some(old) => self.total += extent - old,
            None => {
                self.total += extent;
                self.count += 1;
            }
        }
    }

    pub fn measured_count(&self) -> usize {
        self.count
    }

    /// The running mean, or `None` before the first measurement.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total / self.count as f64)
    }

    /// The running mean, falling back to the configured default extent.
    pub fn estimate(&self) -> f64 {
        self.mean().unwrap_or(self.default_extent)
    }

    pub fn set_default_extent(&mut self, default_extent: f64) {
        self.default_extent = default_extent.max(0.0);
    }

    pub fn clear(&mut self) {
        self.total = 0.0;
        self.count = 0;
    }
}

/// Deterministic, dependency-free PRNG (the same LCG the tests use).
#[derive(Clone, Copy, Debug)]
pub(crate) struct Lcg(u64);

impl Lcg {
    pub(crate) fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    pub(crate) fn gen_range_u64(&mut self, start: u64, end_exclusive: u64) -> u64 {
        debug_assert!(start < end_exclusive);
        let span = end_exclusive - start;
        start + (self.next_u64() % span)
    }
}

/// Histogram of observed aspect ratios (cross extent / main extent), bucketed
/// to tenths, with weighted sampling for unmeasured items.
///
/// Buckets are add-only: a remeasured item contributes a second observation
/// rather than retracting its old one. The histogram is an estimation aid,
/// not an exact census, and keeping it append-only makes updates O(1).
#[derive(Clone, Debug)]
pub struct AspectRatioEstimator {
    buckets: BTreeMap<u32, usize>,
    observed: usize,
    rng: Lcg,
}

impl AspectRatioEstimator {
    pub fn new(seed: u64) -> Self {
        Self {
            buckets: BTreeMap::new(),
            observed: 0,
            rng: Lcg::new(seed),
        }
    }

    pub fn record(&mut self, ratio: f64) {
        if !(ratio > 0.0) || !ratio.is_finite() {
            return;
        }
        // Tenth-resolution bucket; ratio 1.33 and 1.28 land together.
        let bucket = (ratio * 10.0).round().max(1.0) as u32;
        *self.buckets.entry(bucket).or_insert(0) += 1;
        self.observed += 1;
    }

    pub fn observed_count(&self) -> usize {
        self.observed
    }

    /// Draws an aspect ratio weighted by how often each bucket was observed.
    /// Returns `1.0` (square) before any observation exists.
    pub fn sample(&mut self) -> f64 {
        if self.observed == 0 {
            return 1.0;
        }
        let mut n = self.rng.gen_range_u64(0, self.observed as u64) as usize;
        for (&bucket, &weight) in &self.buckets {
            if n < weight {
                return f64::from(bucket) / 10.0;
            }
            n -= weight;
        }
        // Unreachable while `observed` equals the bucket weight sum.
        1.0
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.observed = 0;
    }
}
