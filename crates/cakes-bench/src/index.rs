//! The indexing-method contract consumed by the evaluation core.
//!
//! Concrete index implementations (vantage-point trees, bbtrees, projection variants, ...) are
//! external collaborators; only their `search` behavior is consumed here. An index is assumed to
//! be internally thread-safe for concurrent `search` calls from distinct threads on the same
//! instance, since the efficiency pass drives it from several worker threads at once.

/// A single indexing method under test, specialized to the query type `Q` it answers.
pub trait Index<Q>: Send + Sync {
    /// A name for this method, used for logging and diagnostics. Ideally includes the method's
    /// parameters.
    fn name(&self) -> String;

    /// Answers `query` in place, populating whatever result state `Q` exposes.
    fn search(&self, query: &mut Q);
}
