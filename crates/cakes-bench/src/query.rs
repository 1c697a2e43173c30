//! The query contracts consumed by the evaluation core.
//!
//! A query is constructed fresh per (query object, method) pair, handed to [`crate::index::Index::search`],
//! and then drained for its results. It is never reused across methods, because the query object
//! itself accumulates result state during `search`.

use crate::distance::DistanceValue;
use crate::object::ObjectId;

/// Behavior shared by both query kinds.
pub trait Query<D: DistanceValue>: Send {
    /// The number of times the method under test invoked the distance function while answering
    /// this query.
    fn distance_computations(&self) -> u64;

    /// The number of objects in the result.
    fn result_size(&self) -> u32;
}

/// A range (radius-bounded) query, after `search` has populated its result.
pub trait RangeQueryResult<D: DistanceValue>: Query<D> {
    /// The radius this query was constructed with.
    fn radius(&self) -> D;

    /// The ids of the returned objects, in the same order as [`RangeQueryResult::result_distances`].
    fn result_objects(&self) -> &[ObjectId];

    /// The distances of the returned objects, in the same order as [`RangeQueryResult::result_objects`].
    ///
    /// Not assumed to be sorted or de-duplicated by this crate; extraction in `eval_results.rs`
    /// does both.
    fn result_distances(&self) -> &[D];
}

/// A k-NN query, after `search` has populated its result.
pub trait KnnQueryResult<D: DistanceValue>: Query<D> {
    /// The number of neighbors requested.
    fn k(&self) -> usize;

    /// The slack parameter passed through to the method under test.
    ///
    /// This crate accepts `eps` only to pass it along when constructing a query; it does not
    /// itself interpret the value when computing metrics.
    fn eps(&self) -> f32;

    /// Drains the result priority queue, worst-first (the order in which a bounded
    /// max-at-the-top priority queue yields its contents when popped repeatedly).
    ///
    /// Draining worst-first is what lets extraction produce an ascending list by prepending,
    /// rather than needing a separate sort.
    fn drain_result_queue(&mut self) -> Vec<(D, ObjectId)>;
}

/// Builds a fresh query for a given query object.
///
/// Implementations close over whatever the concrete [`crate::space::Space`] and query parameters
/// (radius, or k and eps) require; the evaluation core only ever calls `create`. The generic
/// [`crate::driver::RangeCreator`] and [`crate::driver::KnnCreator`] factories in this crate cover
/// the common case of closing over a space reference plus one parameter; a caller with a more
/// exotic query type is free to implement this trait directly instead.
pub trait QueryFactory<O, D: DistanceValue, Q: Query<D>>: Sync {
    /// Constructs a new, unsearched query for `query_object`.
    fn create(&self, query_object: &O) -> Q;

    /// A human-readable rendering of this factory's parameters, for logging.
    fn params_for_print(&self) -> String;
}

/// The construction contract for a range (radius-bounded) query.
///
/// A concrete range query type is an external collaborator, but its constructor's *shape* —
/// `(space, query_object, radius)` — is itself part of the contract this crate consumes, so that
/// [`crate::driver::RangeCreator`] can build one generically.
pub trait NewRangeQuery<O, D: DistanceValue>: RangeQueryResult<D> + Sized {
    /// Constructs a fresh, unsearched range query of the given radius.
    fn new<S: crate::space::Space<O, D> + ?Sized>(space: &S, query_object: &O, radius: D) -> Self;
}

/// The construction contract for a k-NN query.
///
/// Mirrors [`NewRangeQuery`] for the k-NN case: `(space, query_object, k, eps)`.
pub trait NewKnnQuery<O, D: DistanceValue>: KnnQueryResult<D> + Sized {
    /// Constructs a fresh, unsearched k-NN query for `k` neighbors with slack `eps`.
    fn new<S: crate::space::Space<O, D> + ?Sized>(space: &S, query_object: &O, k: usize, eps: f32) -> Self;
}
