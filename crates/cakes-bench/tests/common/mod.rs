#![allow(dead_code)]

//! In-memory test doubles: a 1-D point space, range/k-NN query types, a linear-scan method, and
//! an [`ExperimentConfig`] wiring them together. Used by every integration test in this crate.

use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::HashSet;

use cakes_bench::{
    ExperimentConfig, Identified, Index, KnnQueryResult, NewKnnQuery, NewRangeQuery, ObjectId, Phase, Query,
    RangeQueryResult, Space,
};

/// A point on the real line, identified by an integer id.
#[derive(Debug, Clone, Copy)]
pub struct Point {
    pub id: ObjectId,
    pub value: f64,
}

impl Identified for Point {
    fn object_id(&self) -> ObjectId {
        self.id
    }
}

/// Builds `n` points at positions `0.0, 1.0, ..., (n - 1) as f64`.
#[allow(clippy::cast_precision_loss)]
pub fn line_points(n: u64) -> Vec<Point> {
    (0..n).map(|id| Point { id, value: id as f64 }).collect()
}

/// Absolute difference between two points' positions. Carries a phase toggle for the driver's
/// index/query-phase state machine, even though this test double has no asymmetric
/// query-time optimization to switch between.
#[derive(Debug)]
pub struct LineSpace {
    phase: Cell<Phase>,
}

impl Default for LineSpace {
    fn default() -> Self {
        Self { phase: Cell::new(Phase::Index) }
    }
}

impl LineSpace {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Space<Point, f64> for LineSpace {
    fn index_time_distance(&self, a: &Point, query: &Point) -> f64 {
        (a.value - query.value).abs()
    }

    fn set_index_phase(&self) {
        self.phase.set(Phase::Index);
    }

    fn set_query_phase(&self) {
        self.phase.set(Phase::Query);
    }

    fn phase(&self) -> Phase {
        self.phase.get()
    }
}

/// A range query, answered by whichever method it is handed to.
pub struct LineRangeQuery {
    query_value: f64,
    radius: f64,
    result_objects: Vec<ObjectId>,
    result_distances: Vec<f64>,
    distance_computations: u64,
}

impl Query<f64> for LineRangeQuery {
    fn distance_computations(&self) -> u64 {
        self.distance_computations
    }

    fn result_size(&self) -> u32 {
        u32::try_from(self.result_objects.len()).unwrap_or(u32::MAX)
    }
}

impl RangeQueryResult<f64> for LineRangeQuery {
    fn radius(&self) -> f64 {
        self.radius
    }

    fn result_objects(&self) -> &[ObjectId] {
        &self.result_objects
    }

    fn result_distances(&self) -> &[f64] {
        &self.result_distances
    }
}

impl NewRangeQuery<Point, f64> for LineRangeQuery {
    fn new<S: Space<Point, f64> + ?Sized>(_space: &S, query_object: &Point, radius: f64) -> Self {
        Self { query_value: query_object.value, radius, result_objects: Vec::new(), result_distances: Vec::new(), distance_computations: 0 }
    }
}

impl LineRangeQuery {
    /// Builds an already-searched range query, for tests that want to hand-pick a method's
    /// reported result rather than run an actual method.
    pub fn with_result(radius: f64, result_objects: Vec<ObjectId>, result_distances: Vec<f64>) -> Self {
        Self { query_value: 0.0, radius, result_objects, result_distances, distance_computations: 0 }
    }
}

/// A k-NN query, answered by whichever method it is handed to.
pub struct LineKnnQuery {
    query_value: f64,
    k: usize,
    eps: f32,
    queue: Vec<(f64, ObjectId)>,
    distance_computations: u64,
}

impl Query<f64> for LineKnnQuery {
    fn distance_computations(&self) -> u64 {
        self.distance_computations
    }

    fn result_size(&self) -> u32 {
        u32::try_from(self.queue.len()).unwrap_or(u32::MAX)
    }
}

impl KnnQueryResult<f64> for LineKnnQuery {
    fn k(&self) -> usize {
        self.k
    }

    fn eps(&self) -> f32 {
        self.eps
    }

    fn drain_result_queue(&mut self) -> Vec<(f64, ObjectId)> {
        std::mem::take(&mut self.queue)
    }
}

impl NewKnnQuery<Point, f64> for LineKnnQuery {
    fn new<S: Space<Point, f64> + ?Sized>(_space: &S, query_object: &Point, k: usize, eps: f32) -> Self {
        Self { query_value: query_object.value, k, eps, queue: Vec::new(), distance_computations: 0 }
    }
}

impl LineKnnQuery {
    /// Builds an already-searched k-NN query from a hand-picked worst-first queue, for tests that
    /// want to hand-pick a method's reported result rather than run an actual method.
    pub fn with_queue(k: usize, queue: Vec<(f64, ObjectId)>) -> Self {
        Self { query_value: 0.0, k, eps: 0.0, queue, distance_computations: 0 }
    }

    /// Builds a fresh, unsearched k-NN query against `query_value`, for tests that drive a real
    /// [`Index::search`] call directly rather than faking a result.
    pub fn blank(k: usize, query_value: f64) -> Self {
        Self { query_value, k, eps: 0.0, queue: Vec::new(), distance_computations: 0 }
    }

    /// Drains the result queue and reverses it into ascending order, for tests checking sortedness
    /// directly rather than going through [`cakes_bench::EvalResults`].
    pub fn drain_result_queue_sorted(&mut self) -> Vec<(f64, ObjectId)> {
        let mut drained = std::mem::take(&mut self.queue);
        drained.reverse();
        drained
    }
}

/// A brute-force method: correct by construction, used as the method under test in integration
/// tests that exercise the driver end to end without needing a real indexing structure. Owns a
/// clone of the data set, the way a real indexing method would.
pub struct LinearScan {
    data: Vec<Point>,
}

impl LinearScan {
    pub fn new(data: &[Point]) -> Self {
        Self { data: data.to_vec() }
    }
}

impl Index<LineRangeQuery> for LinearScan {
    fn name(&self) -> String {
        "linear-scan".to_string()
    }

    fn search(&self, query: &mut LineRangeQuery) {
        for point in &self.data {
            let dist = (point.value - query.query_value).abs();
            query.distance_computations += 1;
            if dist <= query.radius {
                query.result_objects.push(point.id);
                query.result_distances.push(dist);
            }
        }
    }
}

impl Index<LineKnnQuery> for LinearScan {
    fn name(&self) -> String {
        "linear-scan".to_string()
    }

    fn search(&self, query: &mut LineKnnQuery) {
        let mut dists = self
            .data
            .iter()
            .map(|point| {
                query.distance_computations += 1;
                ((point.value - query.query_value).abs(), point.id)
            })
            .collect::<Vec<_>>();
        dists.sort_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(Ordering::Greater));
        dists.truncate(query.k);
        dists.reverse();
        query.queue = dists;
    }
}

/// An in-memory [`ExperimentConfig`] over a [`LineSpace`] and a fixed set of data/query points.
pub struct LineConfig {
    pub space: LineSpace,
    pub data: Vec<Point>,
    pub queries: Vec<Point>,
    pub ranges: Vec<f64>,
    pub knn_ks: Vec<usize>,
    pub eps: f32,
}

impl ExperimentConfig<Point, f64> for LineConfig {
    fn space(&self) -> &dyn Space<Point, f64> {
        &self.space
    }

    fn data_objects(&self) -> &[Point] {
        &self.data
    }

    fn query_objects(&self) -> &[Point] {
        &self.queries
    }

    fn ranges(&self) -> &[f64] {
        &self.ranges
    }

    fn knn_ks(&self) -> &[usize] {
        &self.knn_ks
    }

    fn eps(&self) -> f32 {
        self.eps
    }

    fn print_info(&self) {}
}

/// Every object id in `ids`, deduplicated, for membership assertions.
pub fn id_set(ids: &[ObjectId]) -> HashSet<ObjectId> {
    ids.iter().copied().collect()
}
