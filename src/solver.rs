use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use roaring::RoaringTreemap;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::SolverConfig;
use crate::error::{FixpointError, Result};
use crate::fact::Fact;
use crate::pool::{self, CancelToken, PoolOptions, WorkerStats};
use crate::rule::Program;
use crate::store::FactStore;

// ------------- Phase -------------
/// Lifecycle of a [`Solver`]:
/// `Uninitialized -> Initialized -> Running -> Quiescent -> Ended`, with
/// `Failed` reachable from `Running` when a compute does not complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Phase {
    Uninitialized,
    Initialized,
    Running,
    Quiescent,
    Failed,
    Ended,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Initialized => "initialized",
            Phase::Running => "running",
            Phase::Quiescent => "quiescent",
            Phase::Failed => "failed",
            Phase::Ended => "ended",
        };
        f.write_str(name)
    }
}

// ------------- ComputeStats -------------
#[derive(Clone, Debug, Default, Serialize)]
pub struct ComputeStats {
    pub threads: usize,
    pub strata: usize,
    pub processed: u64,
    pub derived: u64,
    pub duplicates: u64,
    pub steals: u64,
    pub elapsed_ms: f64,
}

// ------------- FixedPoint -------------
/// The fact database handed out by [`Solver::end`].
#[derive(Clone, Debug)]
pub struct FixedPoint {
    facts: RoaringTreemap,
    complete: bool,
}

impl FixedPoint {
    pub fn len(&self) -> u64 {
        self.facts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
    pub fn contains(&self, fact: Fact) -> bool {
        self.facts.contains(fact.id())
    }
    /// Facts in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Fact> + '_ {
        self.facts.iter().map(Fact::new)
    }
    pub fn to_vec(&self) -> Vec<Fact> {
        self.iter().collect()
    }
    /// False when the last compute failed, was cancelled, or never ran;
    /// the facts are then only a lower bound of the fixed point.
    pub fn is_complete(&self) -> bool {
        self.complete
    }
    /// blake3 over the sorted facts; equal for equal contents regardless of
    /// the order they were discovered in.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for id in self.facts.iter() {
            hasher.update(&id.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

// ------------- Solver -------------
/// Owns the program, the shared fact store and the worker pool
/// configuration. Nothing is global, so independent solvers can coexist.
pub struct Solver {
    program: Program,
    config: SolverConfig,
    phase: Phase,
    store: Option<Arc<FactStore>>,
    threads: usize,
    cancel: CancelToken,
}

impl Solver {
    pub fn new(program: Program) -> Self {
        Self::with_config(program, SolverConfig::default())
    }
    /// `config.threads` is ignored here; the worker count is given to [`init`](Self::init).
    pub fn with_config(program: Program, config: SolverConfig) -> Self {
        Self {
            program,
            config,
            phase: Phase::Uninitialized,
            store: None,
            threads: 0,
            cancel: CancelToken::new(),
        }
    }
    pub fn phase(&self) -> Phase {
        self.phase
    }
    pub fn threads(&self) -> usize {
        self.threads
    }
    /// Token that cancels a running (or the next) compute from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn require(&self, operation: &'static str, allowed: &[Phase]) -> Result<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(FixpointError::InvalidState { operation, phase: self.phase })
        }
    }
    fn store(&self, operation: &'static str) -> Result<&Arc<FactStore>> {
        self.store
            .as_ref()
            .ok_or(FixpointError::InvalidState { operation, phase: self.phase })
    }

    /// Allocates the fact store for `threads` workers and seeds the
    /// program's initial facts.
    pub fn init(&mut self, threads: usize) -> Result<()> {
        self.require("init", &[Phase::Uninitialized])?;
        if threads == 0 {
            return Err(FixpointError::InvalidThreadCount(0));
        }
        let store = FactStore::new(threads, self.config.queue_mode);
        let seeded = self
            .program
            .initial_facts()
            .iter()
            .filter(|&&fact| store.seed(fact))
            .count();
        info!(
            threads,
            queues = store.queue_count(),
            seeds = seeded,
            strata = self.program.strata().len(),
            "solver initialized"
        );
        self.threads = threads;
        self.store = Some(store);
        self.phase = Phase::Initialized;
        Ok(())
    }

    /// Adds a fact from outside. After a completed compute this reopens the
    /// solver, so the next compute extends the fixed point.
    pub fn insert(&mut self, fact: Fact) -> Result<bool> {
        self.require("insert", &[Phase::Initialized, Phase::Quiescent])?;
        let fresh = self.store("insert")?.seed(fact);
        if fresh {
            self.phase = Phase::Initialized;
        }
        Ok(fresh)
    }

    /// Membership query against the facts known so far.
    pub fn contains(&self, fact: Fact) -> Result<bool> {
        self.require("query", &[Phase::Initialized, Phase::Quiescent, Phase::Failed])?;
        Ok(self.store("query")?.seen().contains(fact))
    }

    /// Number of facts known so far.
    pub fn known(&self) -> Result<u64> {
        self.require("query", &[Phase::Initialized, Phase::Quiescent, Phase::Failed])?;
        Ok(self.store("query")?.seen().len())
    }

    /// Runs every stratum to quiescence on the worker pool. Blocks until all
    /// workers have stopped; worker failures are returned from here.
    pub fn compute(&mut self) -> Result<ComputeStats> {
        self.require("compute", &[Phase::Initialized, Phase::Quiescent])?;
        let store = Arc::clone(self.store("compute")?);
        self.phase = Phase::Running;
        let started = Instant::now();
        let options = PoolOptions {
            threads: self.threads,
            idle_wait: self.config.idle_wait(),
            deadline: self.config.timeout().map(|timeout| started + timeout),
            cancel: self.cancel.clone(),
        };
        info!(threads = self.threads, pending = store.pending(), "compute started");

        let mut totals = WorkerStats::default();
        for (index, stratum) in self.program.strata().iter().enumerate() {
            if index > 0 {
                store.requeue_known();
            }
            let stratum = Arc::new(stratum.clone());
            match pool::run(&store, &stratum, &options) {
                Ok(worker_stats) => totals += worker_stats,
                Err(e) => {
                    warn!(stratum = stratum.name(), error = %e, "compute failed");
                    store.clear_pending();
                    self.phase = Phase::Failed;
                    return Err(e);
                }
            }
        }
        // a program without strata leaves its seeds unprocessed
        store.clear_pending();

        let stats = ComputeStats {
            threads: self.threads,
            strata: self.program.strata().len(),
            processed: totals.processed,
            derived: totals.derived,
            duplicates: totals.duplicates,
            steals: totals.steals,
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        info!(
            ms = stats.elapsed_ms,
            facts = store.seen().len(),
            derived = stats.derived,
            steals = stats.steals,
            "compute complete"
        );
        self.phase = Phase::Quiescent;
        Ok(stats)
    }

    /// Releases the fact store and hands out what it holds. Terminal.
    pub fn end(&mut self) -> Result<FixedPoint> {
        self.require("end", &[Phase::Initialized, Phase::Quiescent, Phase::Failed])?;
        let store = self.store.take().ok_or(FixpointError::InvalidState {
            operation: "end",
            phase: self.phase,
        })?;
        let fixed_point = FixedPoint {
            facts: store.seen().snapshot(),
            complete: self.phase == Phase::Quiescent,
        };
        info!(facts = fixed_point.len(), complete = fixed_point.complete, "solver ended");
        self.phase = Phase::Ended;
        Ok(fixed_point)
    }
}
