//! Errors a caller can recover from.
//!
//! Only configuration problems detected before any timed region starts are modeled as catchable
//! errors here. Precondition and correctness violations discovered while folding a query's
//! results into metrics are bugs in the method under test (or in this crate), not things a caller
//! can meaningfully recover from, so those abort via `panic!` with a diagnostic instead; see
//! `eval_results.rs`.

use core::fmt;

/// A recoverable error raised while setting up an experiment.
#[derive(Debug)]
pub enum BenchError {
    /// The experiment configuration is malformed: an empty data set, an empty query set, or a
    /// query parameter (radius or k) that cannot be honored by any method under test.
    Configuration(String),
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "invalid experiment configuration: {msg}"),
        }
    }
}

impl std::error::Error for BenchError {}

/// A `Result` whose error type is always [`BenchError`].
pub type BenchResult<T> = Result<T, BenchError>;
