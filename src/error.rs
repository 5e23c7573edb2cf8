
use thiserror::Error;

use crate::fact::Fact;
use crate::solver::Phase;

#[derive(Error, Debug)]
pub enum FixpointError {
    #[error("Invalid thread count: {0} (at least one worker is required)")]
    InvalidThreadCount(i64),
    #[error("Invalid fact index: {0}")]
    InvalidIndex(i64),
    #[error("Invalid state: cannot {operation} while {phase}")]
    InvalidState { operation: &'static str, phase: Phase },
    #[error("Derivation failed in worker {worker} on fact {fact}: {message}")]
    Derivation { worker: usize, fact: Fact, message: String },
    #[error("{} workers failed: {}", .0.len(), summarize(.0))]
    Aggregate(Vec<FixpointError>),
    /// A worker thread died outside of any rule.
    #[error("Worker {worker} failed: {message}")]
    Worker { worker: usize, message: String },
    #[error("Failed to spawn worker {worker}: {message}")]
    Spawn { worker: usize, message: String },
    #[error("Computation cancelled")]
    Cancelled,
    #[error("Rule error: {0}")]
    Rule(String),
    #[error("Codec error: {0}")]
    Codec(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Output error: {0}")]
    Output(String),
}

pub type Result<T> = std::result::Result<T, FixpointError>;

impl FixpointError {
    /// Shorthand for rules that hit an unexpected condition.
    pub fn rule(message: impl Into<String>) -> Self {
        Self::Rule(message.into())
    }
}

fn summarize(errors: &[FixpointError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

// Helper conversions
impl From<config::ConfigError> for FixpointError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<std::io::Error> for FixpointError {
    fn from(e: std::io::Error) -> Self { Self::Output(e.to_string()) }
}
impl From<serde_json::Error> for FixpointError {
    fn from(e: serde_json::Error) -> Self { Self::Output(e.to_string()) }
}
