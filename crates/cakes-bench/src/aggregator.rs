//! Per-method, per-test-set accumulation of benchmark statistics.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One tracked statistic's running per-test-set sums, keyed by `test_set_id`.
///
/// A single test set's value is built up from many `add_*` calls (one per query, made from
/// worker threads during a single pass), so this stores a running `(sum, count)` per test set
/// rather than one value; [`Series::mean`] and [`Series::sample_variance`] then operate on the
/// per-test-set *averages*, one number per resampled test set, not on the raw per-query values.
#[derive(Debug, Default, Clone)]
struct Series {
    by_test_set: BTreeMap<usize, (f64, usize)>,
}

impl Series {
    fn add(&mut self, test_set_id: usize, value: f64) {
        let entry = self.by_test_set.entry(test_set_id).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    /// Overwrites a test set's value outright, for statistics computed once per test set (the
    /// `set_*` methods) rather than accumulated per query.
    fn set(&mut self, test_set_id: usize, value: f64) {
        self.by_test_set.insert(test_set_id, (value, 1));
    }

    fn per_test_set_means(&self) -> Vec<f64> {
        self.by_test_set.values().map(|&(sum, count)| sum / count.to_f64_lossless()).collect()
    }

    /// Arithmetic mean of the per-test-set averages recorded so far.
    fn mean(&self) -> f64 {
        let means = self.per_test_set_means();
        if means.is_empty() {
            return 0.0;
        }
        means.iter().sum::<f64>() / means.len().to_f64_lossless()
    }

    /// Sample variance (Bessel-corrected) of the per-test-set averages recorded so far.
    ///
    /// Defined as `0.0` for zero or one test set, since a single trial carries no information
    /// about spread and `n - 1 == 0` would otherwise divide by zero.
    fn sample_variance(&self) -> f64 {
        let means = self.per_test_set_means();
        let n = means.len();
        if n < 2 {
            return 0.0;
        }
        let mean = means.iter().sum::<f64>() / n.to_f64_lossless();
        let sum_sq = means.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
        sum_sq / (n - 1).to_f64_lossless()
    }
}

/// Per-method accumulator of per-query effectiveness and efficiency statistics, resampled over
/// one or more test sets.
///
/// Additive methods (`add_*`) may be called concurrently by worker threads during the
/// efficiency pass; the driver serializes every call behind a single [`Mutex`], matching the
/// coarse locking described for the aggregator in the concurrency model. Every method takes the
/// `test_set_id` of the benchmark run it belongs to, mirroring the source's `AddDistComp(TestSetId,
/// ...)`-style calls; repeated calls with the same id accumulate into that test set's running
/// average, while `set_*` methods (called once per test set, after a pass completes) overwrite it.
#[derive(Debug, Default)]
pub struct MetaAnalysis {
    state: Mutex<MetaAnalysisState>,
}

#[derive(Debug, Default)]
struct MetaAnalysisState {
    query_time: Series,
    dist_comp: Series,
    recall: Series,
    log_rel_pos_error: Series,
    num_closer: Series,
    precision_of_approx: Series,
    impr_efficiency: Series,
    impr_dist_comp: Series,
}

impl MetaAnalysis {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the shared state, recovering it from a prior panicking holder rather than
    /// propagating the poison: a panic inside an `add_*` call already aborts the process (see
    /// `error.rs`), so there is no partially-written state a later caller needs protecting from.
    fn lock(&self) -> MutexGuard<'_, MetaAnalysisState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one query's wall-clock search time, in seconds, under `test_set_id`.
    pub fn add_query_time(&self, test_set_id: usize, seconds: f64) {
        self.lock().query_time.add(test_set_id, seconds);
    }

    /// Records one query's distance-function invocation count under `test_set_id`.
    pub fn add_dist_comp(&self, test_set_id: usize, count: u64) {
        self.lock().dist_comp.add(test_set_id, count.to_f64_lossless());
    }

    /// Records one query's recall under `test_set_id`.
    pub fn add_recall(&self, test_set_id: usize, recall: f64) {
        self.lock().recall.add(test_set_id, recall);
    }

    /// Records one query's log relative position error under `test_set_id`.
    pub fn add_log_rel_pos_error(&self, test_set_id: usize, value: f64) {
        self.lock().log_rel_pos_error.add(test_set_id, value);
    }

    /// Records one query's number-closer under `test_set_id`.
    pub fn add_num_closer(&self, test_set_id: usize, value: f64) {
        self.lock().num_closer.add(test_set_id, value);
    }

    /// Records one query's precision-of-approximation under `test_set_id`.
    pub fn add_precision_of_approx(&self, test_set_id: usize, value: f64) {
        self.lock().precision_of_approx.add(test_set_id, value);
    }

    /// Records `test_set_id`'s efficiency improvement factor (sequential search time divided by
    /// this method's search time) for the just-finished efficiency pass.
    pub fn set_impr_efficiency(&self, test_set_id: usize, value: f64) {
        self.lock().impr_efficiency.set(test_set_id, value);
    }

    /// Records `test_set_id`'s distance-computation improvement factor (data set size divided by
    /// this method's average per-query distance computations) for the just-finished efficiency
    /// pass.
    pub fn set_impr_dist_comp(&self, test_set_id: usize, value: f64) {
        self.lock().impr_dist_comp.set(test_set_id, value);
    }

    /// Mean query time across every test set recorded so far, in seconds.
    #[must_use]
    pub fn mean_query_time(&self) -> f64 {
        self.lock().query_time.mean()
    }

    /// Mean distance-function invocation count across every test set recorded so far.
    #[must_use]
    pub fn mean_dist_comp(&self) -> f64 {
        self.lock().dist_comp.mean()
    }

    /// Mean recall across every test set recorded so far.
    #[must_use]
    pub fn mean_recall(&self) -> f64 {
        self.lock().recall.mean()
    }

    /// Sample variance of recall across every test set recorded so far.
    #[must_use]
    pub fn recall_variance(&self) -> f64 {
        self.lock().recall.sample_variance()
    }

    /// Mean log relative position error across every test set recorded so far.
    #[must_use]
    pub fn mean_log_rel_pos_error(&self) -> f64 {
        self.lock().log_rel_pos_error.mean()
    }

    /// Mean number-closer across every test set recorded so far.
    #[must_use]
    pub fn mean_num_closer(&self) -> f64 {
        self.lock().num_closer.mean()
    }

    /// Mean precision-of-approximation across every test set recorded so far.
    #[must_use]
    pub fn mean_precision_of_approx(&self) -> f64 {
        self.lock().precision_of_approx.mean()
    }

    /// Mean efficiency improvement factor across every test set recorded so far.
    #[must_use]
    pub fn mean_impr_efficiency(&self) -> f64 {
        self.lock().impr_efficiency.mean()
    }

    /// Mean distance-computation improvement factor across every test set recorded so far.
    #[must_use]
    pub fn mean_impr_dist_comp(&self) -> f64 {
        self.lock().impr_dist_comp.mean()
    }
}

/// A tiny local helper so integer literals read as `f64` without sprinkling `as` casts (which
/// clippy's `cast_lossless` lint flags) through the mean/variance formulas above.
trait ToF64Lossless {
    fn to_f64_lossless(self) -> f64;
}

impl ToF64Lossless for usize {
    #[allow(clippy::cast_precision_loss)]
    fn to_f64_lossless(self) -> f64 {
        self as f64
    }
}

impl ToF64Lossless for u64 {
    #[allow(clippy::cast_precision_loss)]
    fn to_f64_lossless(self) -> f64 {
        self as f64
    }
}
