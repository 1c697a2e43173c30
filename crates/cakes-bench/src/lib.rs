//! Efficiency and effectiveness benchmarking core for nearest-neighbor search methods.
//!
//! This crate hosts none of the indexing methods or distance spaces it benchmarks — those are
//! external collaborators, consumed only through the [`space::Space`], [`index::Index`], and
//! [`query`] contracts. What lives here is the part that is hard to get right regardless of which
//! method or space a caller plugs in: an exhaustive [`gold_standard::GoldStandard`] to check
//! against, the [`eval_results::EvalResults`] that turn one query's approximate answer into
//! recall/position/precision metrics (enforcing the "approximate never beats exact" invariant
//! along the way), a [`worker`] that drives queries across OS threads for efficiency
//! measurement, an [`aggregator::MetaAnalysis`] that folds per-query statistics across
//! resampled test sets, and the [`driver`] that runs the two-pass efficiency-then-effectiveness
//! protocol end to end.
//!
//! Entry point: [`driver::run_all`].

pub mod aggregator;
pub mod distance;
pub mod driver;
pub mod error;
pub mod eval_results;
pub mod gold_standard;
pub mod index;
pub mod object;
pub mod query;
pub mod space;
pub mod worker;

pub use aggregator::MetaAnalysis;
pub use distance::DistanceValue;
pub use driver::{run_all, ExperimentConfig};
pub use error::{BenchError, BenchResult};
pub use eval_results::EvalResults;
pub use gold_standard::GoldStandard;
pub use index::Index;
pub use object::{Identified, ObjectId};
pub use query::{KnnQueryResult, NewKnnQuery, NewRangeQuery, Query, QueryFactory, RangeQueryResult};
pub use space::{Phase, Space};
