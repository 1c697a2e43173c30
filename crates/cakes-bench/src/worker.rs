//! Parallel query execution for the efficiency pass.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use cpu_time::ThreadTime;

use crate::aggregator::MetaAnalysis;
use crate::distance::DistanceValue;
use crate::index::Index;
use crate::query::{Query, QueryFactory};

/// Efficiency totals for one method across one worker's share of one query set.
///
/// Distinct from what gets pushed into the shared [`MetaAnalysis`]: `add_query_time` and
/// `add_dist_comp` are called per query against the aggregator directly (serialized by its own
/// mutex, matching the concurrency model's "acquire the aggregator mutex; record; release" per
/// query), while this struct tracks the result-size bookkeeping the aggregator doesn't, and a
/// running total of distance computations the caller needs once, after joining, to compute
/// `impr_dist_comp`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerTotals {
    /// Sum of per-query wall-clock search time, in seconds.
    pub search_wall_time: f64,
    /// Sum of per-query CPU search time, in seconds.
    pub search_cpu_time: f64,
    /// Sum of per-query distance-function invocation counts.
    pub dist_comp_qty: u64,
    /// Largest result size seen by this worker.
    pub max_result_size: u32,
    /// Sum of per-query result sizes, for later averaging by the caller.
    pub result_size_sum: u64,
    /// Number of queries this worker processed.
    pub queries_processed: u64,
}

impl WorkerTotals {
    /// Folds in one query's measurements. Takes the already-extracted counters rather than a
    /// generic `Query<D>` reference, since `D` appears nowhere in this method's signature and
    /// would otherwise be unable to be inferred at call sites.
    fn record(&mut self, wall_time: f64, cpu_time: f64, dist_comps: u64, result_size: u32) {
        self.search_wall_time += wall_time;
        self.search_cpu_time += cpu_time;
        self.dist_comp_qty += dist_comps;
        self.max_result_size = self.max_result_size.max(result_size);
        self.result_size_sum += u64::from(result_size);
        self.queries_processed += 1;
    }
}

/// Runs one worker's modulo-partitioned share of `query_objects` against `method`, returning this
/// worker's local totals.
///
/// `worker_index` and `worker_count` implement the partition: this worker processes query `q`
/// exactly when `q % worker_count == worker_index`. Per-query wall time and distance-computation
/// count are pushed into `agg` directly as each query finishes, matching the "acquire the
/// aggregator mutex; record; release" protocol; callers still combine the returned
/// [`WorkerTotals`] across workers after joining, for the result-size bookkeeping and running
/// distance-comp total the aggregator doesn't track.
#[allow(clippy::too_many_arguments)]
pub fn run_worker<O, D, Q>(
    worker_index: u64,
    worker_count: u64,
    test_set_id: usize,
    query_objects: &[O],
    factory: &(impl QueryFactory<O, D, Q> + ?Sized),
    method: &(impl Index<Q> + ?Sized),
    agg: &MetaAnalysis,
) -> WorkerTotals
where
    D: DistanceValue,
    Q: Query<D>,
{
    let mut totals = WorkerTotals::default();

    for (q, query_object) in query_objects.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        if (q as u64) % worker_count != worker_index {
            continue;
        }

        let mut query = factory.create(query_object);

        let wall_start = Instant::now();
        let cpu_start = ThreadTime::now();
        method.search(&mut query);
        let wall_time = wall_start.elapsed().as_secs_f64();
        let cpu_time = cpu_start.elapsed().as_secs_f64();

        let dist_comps = query.distance_computations();
        agg.add_query_time(test_set_id, wall_time);
        agg.add_dist_comp(test_set_id, dist_comps);

        totals.record(wall_time, cpu_time, dist_comps, query.result_size());
    }

    totals
}

/// A lock-free running counter of distance computations, usable when a caller wants live progress
/// without waiting for every worker to join.
///
/// Not part of the per-query accounting protocol in [`crate::aggregator::MetaAnalysis`]; this is
/// an optional convenience for callers that want a cheap "are we making progress" signal during a
/// long Pass 1 run.
#[derive(Debug, Default)]
pub struct ProgressCounter(AtomicU64);

impl ProgressCounter {
    /// Creates a zeroed counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `n` to the counter. Safe to call from any number of worker threads concurrently.
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    /// Reads the current total.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
