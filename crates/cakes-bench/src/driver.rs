//! The two-pass experiment orchestrator: efficiency, then effectiveness.

use mt_logger::{mt_log, Level};

use crate::aggregator::MetaAnalysis;
use crate::distance::DistanceValue;
use crate::error::{BenchError, BenchResult};
use crate::eval_results::EvalResults;
use crate::gold_standard::GoldStandard;
use crate::index::Index;
use crate::object::Identified;
use crate::query::{KnnQueryResult, NewKnnQuery, NewRangeQuery, QueryFactory, RangeQueryResult};
use crate::space::Space;
use crate::worker::run_worker;

/// The collaborator contract a caller's experiment configuration must satisfy.
///
/// This is the only configuration surface the benchmark core knows about: object loading, CLI
/// parsing, and config-file I/O are the caller's concern.
pub trait ExperimentConfig<O, D: DistanceValue>: Sync {
    /// The distance space every query and every method under test is evaluated against.
    fn space(&self) -> &dyn Space<O, D>;

    /// The indexed data set.
    fn data_objects(&self) -> &[O];

    /// The query workload.
    fn query_objects(&self) -> &[O];

    /// Radii to run range queries at; empty to skip range testing entirely.
    fn ranges(&self) -> &[D];

    /// `k` values to run k-NN queries at; empty to skip k-NN testing entirely.
    fn knn_ks(&self) -> &[usize];

    /// The slack parameter passed through to every k-NN query.
    fn eps(&self) -> f32;

    /// Emits a description of this configuration via the embedding application's logger. Called
    /// only when `log_info` is `true`.
    fn print_info(&self);
}

/// Validates the parts of a configuration the driver itself depends on: an empty data set or
/// query set cannot produce a meaningful gold standard.
fn validate<O, D: DistanceValue>(config: &impl ExperimentConfig<O, D>) -> BenchResult<()> {
    if config.data_objects().is_empty() {
        return Err(BenchError::Configuration("data set is empty".to_string()));
    }
    if config.query_objects().is_empty() {
        return Err(BenchError::Configuration("query set is empty".to_string()));
    }
    Ok(())
}

/// A query factory that closes over a space reference and a fixed radius.
///
/// The generic counterpart of the teacher source's `RangeCreator`: rather than being specialized
/// to one concrete range-query type, it builds any `Q` satisfying [`NewRangeQuery`].
pub struct RangeCreator<'s, O, D: DistanceValue> {
    space: &'s dyn Space<O, D>,
    radius: D,
}

impl<'s, O, D: DistanceValue> RangeCreator<'s, O, D> {
    /// Builds a factory for range queries of the given radius against `space`.
    #[must_use]
    pub fn new(space: &'s dyn Space<O, D>, radius: D) -> Self {
        Self { space, radius }
    }
}

impl<'s, O, D: DistanceValue, Q: NewRangeQuery<O, D>> QueryFactory<O, D, Q> for RangeCreator<'s, O, D> {
    fn create(&self, query_object: &O) -> Q {
        Q::new(self.space, query_object, self.radius)
    }

    fn params_for_print(&self) -> String {
        format!("Radius = {}", self.radius)
    }
}

/// A query factory that closes over a space reference and fixed `(k, eps)` parameters.
///
/// The generic counterpart of the teacher source's `KNNCreator`.
pub struct KnnCreator<'s, O, D: DistanceValue> {
    space: &'s dyn Space<O, D>,
    k: usize,
    eps: f32,
}

impl<'s, O, D: DistanceValue> KnnCreator<'s, O, D> {
    /// Builds a factory for k-NN queries of the given `k` and `eps` against `space`.
    #[must_use]
    pub fn new(space: &'s dyn Space<O, D>, k: usize, eps: f32) -> Self {
        Self { space, k, eps }
    }
}

impl<'s, O, D: DistanceValue, Q: NewKnnQuery<O, D>> QueryFactory<O, D, Q> for KnnCreator<'s, O, D> {
    fn create(&self, query_object: &O) -> Q {
        Q::new(self.space, query_object, self.k, self.eps)
    }

    fn params_for_print(&self) -> String {
        format!("K = {} Epsilon = {}", self.k, self.eps)
    }
}

/// Runs the two-pass protocol for one query parameter (one radius, or one `k`) across every
/// method in `indexes`, recording into the matching slot of `agg` (one [`MetaAnalysis`] per
/// method, same order as `indexes`).
///
/// Shared by the range and k-NN entry points below; the only difference between them is how
/// `EvalResults` extracts the exact and approximate result sets, which is threaded through via
/// the `eval` closure.
#[allow(clippy::too_many_arguments)]
fn execute<O, D, Q, F>(
    log_info: bool,
    thread_qty: u64,
    test_set_id: usize,
    agg: &[MetaAnalysis],
    config: &impl ExperimentConfig<O, D>,
    factory: &F,
    indexes: &[Box<dyn Index<Q>>],
    eval: impl Fn(&GoldStandard<'_, O, D>, &mut Q) -> EvalResults,
) -> BenchResult<()>
where
    O: Identified + Sync,
    D: DistanceValue,
    Q: crate::query::Query<D>,
    F: QueryFactory<O, D, Q>,
{
    validate(config)?;
    assert_eq!(agg.len(), indexes.len(), "one aggregator per method under test");

    let thread_qty = thread_qty.max(1);
    let data_objects = config.data_objects();
    let query_objects = config.query_objects();
    let num_queries = query_objects.len();

    if log_info {
        mt_log!(Level::Info, ">>>> query params = {}", factory.params_for_print());
        mt_log!(Level::Info, ">>>> Computing efficiency metrics");
    }

    config.space().set_query_phase();

    let mut method_search_times = vec![0.0_f64; indexes.len()];

    for (method_num, method) in indexes.iter().enumerate() {
        if log_info {
            mt_log!(Level::Info, ">>>> Efficiency test for: {}", method.name());
        }

        let totals = if thread_qty == 1 {
            run_worker(0, 1, test_set_id, query_objects, factory, method.as_ref(), &agg[method_num])
        } else {
            std::thread::scope(|scope| {
                let handles = (0..thread_qty)
                    .map(|w| {
                        scope.spawn(move || {
                            run_worker(w, thread_qty, test_set_id, query_objects, factory, method.as_ref(), &agg[method_num])
                        })
                    })
                    .collect::<Vec<_>>();
                handles
                    .into_iter()
                    .map(|h| h.join().expect("worker thread panicked"))
                    .fold(crate::worker::WorkerTotals::default(), |mut acc, t| {
                        acc.search_wall_time += t.search_wall_time;
                        acc.search_cpu_time += t.search_cpu_time;
                        acc.dist_comp_qty += t.dist_comp_qty;
                        acc.max_result_size = acc.max_result_size.max(t.max_result_size);
                        acc.result_size_sum += t.result_size_sum;
                        acc.queries_processed += t.queries_processed;
                        acc
                    })
            })
        };

        #[allow(clippy::cast_precision_loss)]
        let avg_num_dist_comp = totals.dist_comp_qty as f64 / num_queries as f64;
        #[allow(clippy::cast_precision_loss)]
        let impr_dist_comp = data_objects.len() as f64 / avg_num_dist_comp;
        agg[method_num].set_impr_dist_comp(test_set_id, impr_dist_comp);

        if log_info {
            #[allow(clippy::cast_precision_loss)]
            let avg_result_size = totals.result_size_sum as f64 / num_queries as f64;
            mt_log!(Level::Info, ">>>> max # results = {}", totals.max_result_size);
            mt_log!(Level::Info, ">>>> avg # results = {}", avg_result_size);
            mt_log!(Level::Info, ">>>> # of distance computations = {}", avg_num_dist_comp);
            mt_log!(Level::Info, ">>>> Impr in # of dist comp: {}", impr_dist_comp);
            mt_log!(Level::Info, ">>>> Time elapsed: {} sec", totals.search_wall_time);
        }

        // Stashed here so Pass 2 can compute `impr_efficiency` without re-deriving it from the
        // aggregator; the method's own search time is this pass's only product we still need.
        method_search_times[method_num] = totals.search_wall_time;
    }

    config.space().set_index_phase();

    if log_info {
        mt_log!(Level::Info, ">>>> Computing effectiveness metrics");
    }

    let mut seq_search_time = 0.0;
    for query_object in query_objects {
        let gold = GoldStandard::new(config.space(), data_objects, query_object);
        seq_search_time += gold.seq_search_wall_time().as_secs_f64();

        for (method_num, method) in indexes.iter().enumerate() {
            let mut query = factory.create(query_object);
            method.search(&mut query);

            let result = eval(&gold, &mut query);
            agg[method_num].add_recall(test_set_id, result.recall());
            agg[method_num].add_log_rel_pos_error(test_set_id, result.log_rel_pos_error());
            agg[method_num].add_num_closer(test_set_id, result.number_closer());
            agg[method_num].add_precision_of_approx(test_set_id, result.precision_of_approx());
        }
    }

    for method_num in 0..indexes.len() {
        let impr_efficiency = seq_search_time / method_search_times[method_num];
        agg[method_num].set_impr_efficiency(test_set_id, impr_efficiency);

        if log_info {
            mt_log!(Level::Info, ">>>> Impr. in Efficiency = {}", impr_efficiency);
            mt_log!(Level::Info, ">>>> Recall = {}", agg[method_num].mean_recall());
        }
    }

    Ok(())
}

/// Runs one range-query configuration (one radius) against every method in `indexes`.
pub fn execute_range<O, D, Q>(
    log_info: bool,
    thread_qty: u64,
    test_set_id: usize,
    agg: &[MetaAnalysis],
    config: &impl ExperimentConfig<O, D>,
    radius: D,
    indexes: &[Box<dyn Index<Q>>],
) -> BenchResult<()>
where
    O: Identified + Sync,
    D: DistanceValue,
    Q: RangeQueryResult<D> + NewRangeQuery<O, D>,
{
    let factory = RangeCreator::new(config.space(), radius);
    execute(log_info, thread_qty, test_set_id, agg, config, &factory, indexes, |gold, query: &mut Q| EvalResults::from_range(gold, query))
}

/// Runs one k-NN configuration (one `k`) against every method in `indexes`.
pub fn execute_knn<O, D, Q>(
    log_info: bool,
    thread_qty: u64,
    test_set_id: usize,
    agg: &[MetaAnalysis],
    config: &impl ExperimentConfig<O, D>,
    k: usize,
    indexes: &[Box<dyn Index<Q>>],
) -> BenchResult<()>
where
    O: Identified + Sync,
    D: DistanceValue,
    Q: KnnQueryResult<D> + NewKnnQuery<O, D>,
{
    let factory = KnnCreator::new(config.space(), k, config.eps());
    execute(log_info, thread_qty, test_set_id, agg, config, &factory, indexes, |gold, query: &mut Q| EvalResults::from_knn(gold, query))
}

/// The full entry point: runs every configured radius and every configured `k` against the given
/// methods, logging a run header and footer when `log_info` is set.
///
/// `range_indexes` and `knn_indexes` are parallel to each other (method `i` is the same
/// underlying method viewed through its `Index<RQ>` and `Index<KQ>` trait-object forms) and to
/// `range_agg_matrix[*]` / `knn_agg_matrix[*]` (one [`MetaAnalysis`] per method per configured
/// parameter value).
#[allow(clippy::too_many_arguments)]
pub fn run_all<O, D, RQ, KQ>(
    log_info: bool,
    thread_qty: u64,
    test_set_id: usize,
    range_agg_matrix: &[Vec<MetaAnalysis>],
    knn_agg_matrix: &[Vec<MetaAnalysis>],
    config: &impl ExperimentConfig<O, D>,
    range_indexes: &[Box<dyn Index<RQ>>],
    knn_indexes: &[Box<dyn Index<KQ>>],
) -> BenchResult<()>
where
    O: Identified + Sync,
    D: DistanceValue,
    RQ: RangeQueryResult<D> + NewRangeQuery<O, D>,
    KQ: KnnQueryResult<D> + NewKnnQuery<O, D>,
{
    validate(config)?;

    if log_info {
        mt_log!(Level::Info, ">>>> TestSetId: {test_set_id}");
        mt_log!(Level::Info, ">>>> Will use: {thread_qty} threads in efficiency testing");
        config.print_info();
    }

    assert_eq!(range_agg_matrix.len(), config.ranges().len(), "one aggregator row per configured radius");
    for (radius, agg) in config.ranges().iter().zip(range_agg_matrix) {
        execute_range(log_info, thread_qty, test_set_id, agg, config, *radius, range_indexes)?;
    }

    assert_eq!(knn_agg_matrix.len(), config.knn_ks().len(), "one aggregator row per configured k");
    for (&k, agg) in config.knn_ks().iter().zip(knn_agg_matrix) {
        execute_knn(log_info, thread_qty, test_set_id, agg, config, k, knn_indexes)?;
    }

    if log_info {
        mt_log!(Level::Info, "experiment done");
    }

    Ok(())
}
