//! Effectiveness metrics for one (query, method) pair against its gold standard.

use std::collections::HashSet;

use crate::distance::{approx_equal, cmp_dist, DistanceValue};
use crate::gold_standard::GoldStandard;
use crate::object::{Identified, ObjectId};
use crate::query::{KnnQueryResult, RangeQueryResult};

/// Effectiveness metrics for one approximate result against the exact gold standard.
///
/// For every returned rank `k` (0-based), `pos(k)` denotes that result's true position in the
/// exact list of neighbors — i.e. a `pos(k) = p` means the `k`-th object a method returned is, in
/// truth, the `p`-th nearest neighbor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalResults {
    recall: f64,
    number_closer: f64,
    log_rel_pos_error: f64,
    precision_of_approx: f64,
}

impl EvalResults {
    /// Fraction of the exact k-neighborhood (or exact range result) that the method returned.
    ///
    /// `1.0` by convention when the exact result set is empty and the method returned something;
    /// see [`EvalResults::empty_approx`] for the case where the method returned nothing at all.
    pub fn recall(&self) -> f64 {
        self.recall
    }

    /// Count of exact neighbors strictly nearer than the method's nearest returned object.
    ///
    /// Most meaningful for 1-NN search, where it is exactly `pos(0)`.
    pub fn number_closer(&self) -> f64 {
        self.number_closer
    }

    /// Average, in log space, of `pos(k) / (k + 1)` over every returned rank `k`.
    ///
    /// Exponentiate to recover a geometric mean of relative position errors.
    pub fn log_rel_pos_error(&self) -> f64 {
        self.log_rel_pos_error
    }

    /// Average over every returned rank `k` of `(k + 1) / (pos(k) + 1)`.
    pub fn precision_of_approx(&self) -> f64 {
        self.precision_of_approx
    }

    /// Builds metrics for a k-NN query's result against its gold standard.
    ///
    /// `k` is the number requested (not the possibly-larger size of the tied exact
    /// k-neighborhood); `drained_queue` is whatever [`KnnQueryResult::drain_result_queue`]
    /// returned, worst-first.
    pub fn from_knn<O: Identified, D: DistanceValue>(gold: &GoldStandard<'_, O, D>, query: &mut impl KnnQueryResult<D>) -> Self {
        let k = query.k();
        let exact_result_set = gold.knn_exact_result_set(k);

        let mut approx_result_set = HashSet::new();
        let mut approx_distances = Vec::new();
        for (dist, id) in query.drain_result_queue() {
            // A method can return duplicate records; duplicates are ignored during evaluation
            // rather than treated as an error, unlike the range path below.
            if approx_result_set.insert(id) {
                approx_distances.insert(0, dist);
            }
        }

        Self::compute(gold.exact_dists(), &exact_result_set, k, &approx_distances, &approx_result_set)
    }

    /// Builds metrics for a range query's result against its gold standard.
    pub fn from_range<O: Identified, D: DistanceValue>(gold: &GoldStandard<'_, O, D>, query: &impl RangeQueryResult<D>) -> Self {
        let exact_result_set = gold.range_exact_result_set(query.radius());

        let ids = query.result_objects();
        let dists = query.result_distances();
        assert_eq!(ids.len(), dists.len(), "range query returned {} ids but {} distances", ids.len(), dists.len());

        let mut approx_result_set = HashSet::new();
        let mut approx_distances = Vec::new();
        for (&id, &dist) in ids.iter().zip(dists.iter()) {
            assert!(approx_result_set.insert(id), "range query returned duplicate object id {id}");
            approx_distances.push(dist);
        }
        approx_distances.sort_by(cmp_dist);

        let e = exact_result_set.len();
        Self::compute(gold.exact_dists(), &exact_result_set, e, &approx_distances, &approx_result_set)
    }

    /// The metric computation shared by both query kinds.
    ///
    /// `e` is the normalization constant for recall: the requested `k` for k-NN (even when the
    /// exact result set is larger due to ties), or the exact range result's size for range
    /// queries.
    fn compute<O, D: DistanceValue>(
        exact_dists: &[(D, &O)],
        exact_result_set: &HashSet<ObjectId>,
        e: usize,
        approx_distances: &[D],
        approx_result_set: &HashSet<ObjectId>,
    ) -> Self {
        if approx_distances.is_empty() {
            return if exact_result_set.is_empty() {
                Self { recall: 0.0, number_closer: 0.0, log_rel_pos_error: 0.0, precision_of_approx: 0.0 }
            } else {
                Self { recall: 0.0, number_closer: e.to_f64_lossless(), log_rel_pos_error: e.to_f64_lossless().ln(), precision_of_approx: 0.0 }
            };
        }

        let recall = if exact_result_set.is_empty() {
            1.0
        } else {
            let hits = approx_result_set.iter().filter(|id| exact_result_set.contains(*id)).count();
            hits.to_f64_lossless() / e.to_f64_lossless()
        };

        let number_closer = number_closer(exact_dists, approx_distances[0]);
        let (precision_of_approx, log_rel_pos_error) = position_metrics(exact_dists, approx_distances);

        Self { recall, number_closer, log_rel_pos_error, precision_of_approx }
    }
}

/// Counts exact neighbors strictly closer than the method's nearest returned object.
fn number_closer<O, D: DistanceValue>(exact_dists: &[(D, &O)], nearest_approx: D) -> f64 {
    let mut count = 0.0;
    for &(dist, _) in exact_dists {
        if !(dist < nearest_approx) {
            break;
        }
        count += 1.0;
    }
    count
}

/// Computes precision-of-approximation and the log relative position error by walking a cursor
/// across `exact_dists` in lockstep with `approx_distances`.
///
/// Panics if an approximate distance is closer than the cursor's exact distance by more than
/// floating-point tolerance (a correctness bug in the method under test), or if the cursor
/// invariant `p >= k` is violated (a bug in this computation or in non-deterministic distances).
fn position_metrics<O, D: DistanceValue>(exact_dists: &[(D, &O)], approx_distances: &[D]) -> (f64, f64) {
    let mut precision_of_approx = 0.0;
    let mut log_rel_pos_error = 0.0;
    let mut p = 0usize;

    for (k, &a_k) in approx_distances.iter().enumerate() {
        if let Some(&(e_p, _)) = exact_dists.get(p) {
            if a_k < e_p && !approx_equal(a_k, e_p) {
                let dump = diagnostic_dump(exact_dists, approx_distances);
                panic!(
                    "approximate result is closer to the query than the exact gold standard allows: approx={a_k:?} exact={e_p:?} at rank {k}\n{dump}"
                );
            }
        }

        let mut last_equal_p = p;
        if exact_dists.get(p).is_some_and(|&(e_p, _)| approx_equal(e_p, a_k)) {
            last_equal_p = p;
            p += 1;
        } else {
            while exact_dists.get(p).is_some_and(|&(e_p, _)| e_p < a_k) {
                p += 1;
                last_equal_p += 1;
            }
        }

        if p < k {
            let dump = diagnostic_dump(exact_dists, approx_distances);
            panic!("cursor invariant violated: p={p} < k={k}\n{dump}");
        }

        precision_of_approx += (k + 1).to_f64_lossless() / (last_equal_p + 1).to_f64_lossless();
        log_rel_pos_error += ((last_equal_p + 1).to_f64_lossless() / (k + 1).to_f64_lossless()).ln();
    }

    let n = approx_distances.len().to_f64_lossless();
    (precision_of_approx / n, log_rel_pos_error / n)
}

/// Renders the exact-vs-approximate distance lists, up to the smaller of the two sizes, for a
/// panic diagnostic.
fn diagnostic_dump<O, D: DistanceValue>(exact_dists: &[(D, &O)], approx_distances: &[D]) -> String {
    let n = exact_dists.len().min(approx_distances.len());
    let mut out = String::from("exact -> approx:\n");
    for i in 0..n {
        out.push_str(&format!("  {:?} -> {:?}\n", exact_dists[i].0, approx_distances[i]));
    }
    out
}

/// A tiny local helper so `usize` literals read as `f64` without sprinkling `as` casts (which
/// clippy's `cast_lossless` lint flags) through the metric formulas above.
trait ToF64Lossless {
    fn to_f64_lossless(self) -> f64;
}

impl ToF64Lossless for usize {
    #[allow(clippy::cast_precision_loss)]
    fn to_f64_lossless(self) -> f64 {
        self as f64
    }
}
