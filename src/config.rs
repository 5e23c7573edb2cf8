//! Settings for the solver and the `fixpoint` binary.
//!
//! Sources are layered with the `config` crate, later ones overriding
//! earlier ones:
//! 1. built-in defaults ([`Settings::default`]),
//! 2. an optional TOML file (`fixpoint.toml`, or the path in `FIXPOINT_CONFIG`),
//! 3. environment variables such as `FIXPOINT_SOLVER__THREADS=4`.
//!
//! The binary's positional thread-count argument is applied on top of that.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FixpointError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "fixpoint.toml";
pub const CONFIG_PATH_VAR: &str = "FIXPOINT_CONFIG";

/// How work queues are laid out over the workers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    /// One queue per worker; idle workers steal from their siblings.
    #[default]
    PerWorker,
    /// A single queue shared by every worker.
    Shared,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub threads: usize,
    pub queue_mode: QueueMode,
    /// Upper bound on how long an idle worker sleeps before looking for work again.
    pub idle_wait_ms: u64,
    pub timeout_ms: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            queue_mode: QueueMode::PerWorker,
            idle_wait_ms: 2,
            timeout_ms: None,
        }
    }
}

impl SolverConfig {
    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms.max(1))
    }
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// The built-in program the binary runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgramSpec {
    /// Seeds, and `x -> x + 1` while below `bound`.
    Successor { seeds: Vec<u64>, bound: u64 },
    /// Transitive closure of a directed graph.
    Closure { edges: Vec<(u64, u64)> },
}

impl Default for ProgramSpec {
    fn default() -> Self {
        Self::Successor { seeds: vec![1, 2], bound: 10 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub solver: SolverConfig,
    pub program: ProgramSpec,
    pub output: OutputFormat,
}

impl Settings {
    /// Loads settings from the file at `path` (if it exists) and the environment.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("FIXPOINT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
    /// Like [`load`](Self::load), with the path taken from `FIXPOINT_CONFIG`
    /// or defaulting to `fixpoint.toml`.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| String::from(DEFAULT_CONFIG_FILE));
        Self::load(&path)
    }
}

/// Parses the thread-count command line argument.
pub fn parse_thread_count(arg: &str) -> Result<usize> {
    let n: i64 = arg
        .trim()
        .parse()
        .map_err(|_| FixpointError::Config(format!("thread count must be an integer, got '{arg}'")))?;
    if n < 1 {
        return Err(FixpointError::InvalidThreadCount(n));
    }
    usize::try_from(n).map_err(|_| FixpointError::InvalidThreadCount(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_count_argument() {
        assert_eq!(parse_thread_count("4").unwrap(), 4);
        assert_eq!(parse_thread_count(" 1 ").unwrap(), 1);
        assert!(matches!(parse_thread_count("0"), Err(FixpointError::InvalidThreadCount(0))));
        assert!(matches!(parse_thread_count("-3"), Err(FixpointError::InvalidThreadCount(-3))));
        assert!(matches!(parse_thread_count("four"), Err(FixpointError::Config(_))));
    }

    #[test]
    fn file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("fixpoint_config_{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "output = \"json\"\n\n[solver]\nthreads = 3\nqueue_mode = \"shared\"\n\n[program]\nkind = \"closure\"\nedges = [[1, 2], [2, 3]]\n",
        )
        .unwrap();
        let settings = Settings::load(path.to_str().unwrap()).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(settings.output, OutputFormat::Json);
        assert_eq!(settings.solver.threads, 3);
        assert_eq!(settings.solver.queue_mode, QueueMode::Shared);
        assert_eq!(settings.solver.idle_wait_ms, 2);
        assert_eq!(settings.program, ProgramSpec::Closure { edges: vec![(1, 2), (2, 3)] });
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = Settings::load("definitely_not_here.toml").unwrap();
        assert_eq!(settings.solver, SolverConfig::default());
        assert_eq!(settings.program, ProgramSpec::default());
    }
}
