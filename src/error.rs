//! Errors raised by the benchmark harness. The lock core itself never fails.

use std::fmt;

/// Error type for benchmark configuration and runs.
#[derive(Debug, PartialEq, Eq)]
pub enum BenchError {
    /// Configuration values that cannot produce a meaningful run
    InvalidConfig(&'static str),
    /// Command-line argument that could not be parsed
    InvalidArgument(String),
    /// Number of worker threads that panicked during a run
    WorkerPanicked(usize),
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            BenchError::InvalidArgument(arg) => write!(f, "invalid argument: {}", arg),
            BenchError::WorkerPanicked(n) => write!(f, "{} worker thread(s) panicked", n),
        }
    }
}

impl std::error::Error for BenchError {}
