//! The distance-space contract consumed by the evaluation core.
//!
//! Concrete distance spaces (sparse cosine, dense Euclidean, and so on) are external
//! collaborators; this crate only consumes the two things it needs from one.

use crate::distance::DistanceValue;

/// Which phase a [`Space`] is currently optimized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Expensive precomputation paths used while building an index and while computing the gold
    /// standard.
    Index,
    /// Fast runtime paths used while methods under test answer queries.
    Query,
}

/// A distance space over objects of type `O`, yielding distances of type `D`.
///
/// Some spaces implement asymmetric query-time optimizations; `index_time_distance` is the
/// oracle used for the gold standard precisely because it is independent of that optimization.
/// The phase toggles are called only by the experiment driver, and only when no worker threads
/// are running, so an implementation may use simple interior mutability (a `Cell`, an atomic) to
/// support them through `&self`.
pub trait Space<O, D: DistanceValue>: Sync {
    /// Computes the index-time distance between two objects, with the query conventionally on
    /// the right-hand side.
    fn index_time_distance(&self, a: &O, query: &O) -> D;

    /// Switches to the expensive, precomputation-friendly phase used for gold-standard
    /// computation.
    fn set_index_phase(&self);

    /// Switches to the fast runtime phase used while methods under test answer queries.
    fn set_query_phase(&self);

    /// Returns the current phase, mostly useful for logging and tests.
    fn phase(&self) -> Phase;
}
