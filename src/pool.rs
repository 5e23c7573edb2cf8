//! The worker pool that drives one stratum to quiescence.
//!
//! Each worker loops: take a fact (own queue first, then steal), apply the
//! stratum's rules, and record every candidate through the seen-set. A
//! worker that finds no work goes idle under the coordinator lock. The
//! computation is finished when, under that same lock, every worker is idle
//! and no queue holds a fact: idle workers never push, so nothing can
//! appear afterwards.
//!
//! Failures are cooperative. A failing rule (or a panicking one) records
//! its error, raises the stop flag and wakes the idle workers; everyone
//! leaves at the top of their next iteration and the errors are returned
//! once all threads are joined.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{FixpointError, Result};
use crate::rule::Stratum;
use crate::store::FactStore;

/// Cancellation token shared with the worker threads.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }
    /// Request cancellation. Workers observe it at their next loop iteration.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters of one worker, summed over the pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    /// Facts taken off a queue and run through the rules.
    pub processed: u64,
    /// Candidates that were new and got enqueued.
    pub derived: u64,
    /// Candidates that were already known.
    pub duplicates: u64,
    /// Facts taken from a sibling's queue.
    pub steals: u64,
}

impl std::ops::AddAssign for WorkerStats {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.derived += other.derived;
        self.duplicates += other.duplicates;
        self.steals += other.steals;
    }
}

#[derive(Debug, Default)]
struct Idle {
    count: usize,
    done: bool,
}

// Per-run coordination state.
struct Coordinator {
    threads: usize,
    idle: Mutex<Idle>,
    sleepers: AtomicUsize, // mirrors idle.count so pushers can skip the lock
    wakeup: Condvar,
    idle_wait: Duration,
    stop: AtomicBool,
    cancel: CancelToken,
    deadline: Option<Instant>,
    failures: Mutex<Vec<FixpointError>>,
}

impl Coordinator {
    fn lock_idle(&self) -> MutexGuard<'_, Idle> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire)
            || self.cancel.is_cancelled()
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
    fn fail(&self, error: FixpointError) {
        warn!(error = %error, "worker failed, cancelling the pool");
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error);
        self.stop.store(true, Ordering::Release);
        let _idle = self.lock_idle();
        self.wakeup.notify_all();
    }
    // Called after a push. Taking the lock orders the push before any idle
    // worker's next look at the queues, so the wakeup cannot be lost.
    fn notify(&self) {
        if self.sleepers.load(Ordering::Acquire) > 0 {
            let _idle = self.lock_idle();
            self.wakeup.notify_one();
        }
    }
    /// Parks an idle worker. Returns true when there may be work to take,
    /// false when the worker should exit.
    fn wait_for_work(&self, store: &FactStore) -> bool {
        let mut idle = self.lock_idle();
        idle.count += 1;
        self.sleepers.store(idle.count, Ordering::Release);
        let resume = loop {
            if idle.done || self.should_stop() {
                break false;
            }
            if store.has_pending() {
                break true;
            }
            if idle.count == self.threads {
                idle.done = true;
                self.wakeup.notify_all();
                break false;
            }
            idle = self
                .wakeup
                .wait_timeout(idle, self.idle_wait)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        };
        idle.count -= 1;
        self.sleepers.store(idle.count, Ordering::Release);
        resume
    }
    fn quiescent(&self) -> bool {
        self.lock_idle().done
    }
}

/// Options for one pool run.
#[derive(Clone, Debug)]
pub struct PoolOptions {
    pub threads: usize,
    pub idle_wait: Duration,
    pub deadline: Option<Instant>,
    pub cancel: CancelToken,
}

/// Runs `stratum` on `threads` workers until no queue in `store` holds work.
pub fn run(store: &Arc<FactStore>, stratum: &Arc<Stratum>, options: &PoolOptions) -> Result<WorkerStats> {
    let coordinator = Arc::new(Coordinator {
        threads: options.threads,
        idle: Mutex::new(Idle::default()),
        sleepers: AtomicUsize::new(0),
        wakeup: Condvar::new(),
        idle_wait: options.idle_wait,
        stop: AtomicBool::new(false),
        cancel: options.cancel.clone(),
        deadline: options.deadline,
        failures: Mutex::new(Vec::new()),
    });

    let mut handles = Vec::with_capacity(options.threads);
    for worker in 0..options.threads {
        let store = Arc::clone(store);
        let stratum = Arc::clone(stratum);
        let coord = Arc::clone(&coordinator);
        let spawned = thread::Builder::new()
            .name(format!("fixpoint-worker-{worker}"))
            .spawn(move || work(worker, &store, &stratum, &coord));
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                coordinator.fail(FixpointError::Spawn { worker, message: e.to_string() });
                break;
            }
        }
    }

    let mut totals = WorkerStats::default();
    for (worker, handle) in handles.into_iter().enumerate() {
        match joined(worker, handle.join()) {
            Ok(stats) => totals += stats,
            Err(e) => coordinator.fail(e),
        }
    }

    let mut failures = std::mem::take(
        &mut *coordinator
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner),
    );
    match failures.len() {
        0 if coordinator.quiescent() => Ok(totals),
        0 => Err(FixpointError::Cancelled),
        1 => Err(failures.remove(0)),
        _ => Err(FixpointError::Aggregate(failures)),
    }
}

fn work(worker: usize, store: &FactStore, stratum: &Stratum, coord: &Coordinator) -> WorkerStats {
    let home = store.home(worker);
    let mut stats = WorkerStats::default();
    let mut candidates = Vec::new();
    debug!(worker, home, stratum = stratum.name(), "worker started");
    loop {
        if coord.should_stop() {
            break;
        }
        let Some((fact, stolen)) = store.take(home) else {
            if coord.wait_for_work(store) {
                continue;
            }
            break;
        };
        if stolen {
            stats.steals += 1;
        }
        stats.processed += 1;
        candidates.clear();
        let applied = panic::catch_unwind(AssertUnwindSafe(|| stratum.apply(fact, &mut candidates)));
        let failure = match applied {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(format!("rule {}", panic_message(payload.as_ref()))),
        };
        if let Some(message) = failure {
            coord.fail(FixpointError::Derivation { worker, fact, message });
            break;
        }
        for &candidate in &candidates {
            if store.discover(candidate, home) {
                stats.derived += 1;
                coord.notify();
            } else {
                stats.duplicates += 1;
            }
        }
    }
    debug!(
        worker,
        processed = stats.processed,
        derived = stats.derived,
        steals = stats.steals,
        "worker finished"
    );
    stats
}

// A panic that escaped the rule guard belongs to the worker, not to a fact.
fn joined(worker: usize, outcome: thread::Result<WorkerStats>) -> Result<WorkerStats> {
    outcome.map_err(|payload| FixpointError::Worker {
        worker,
        message: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        String::from("panicked")
    }
}
