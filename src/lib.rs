//! Fixpoint – a multi-threaded kernel for Datalog-style fixed-point evaluation.
//!
//! A *fact* is a non-negative integer: an index into an implicit universe of
//! possible facts, or an encoded tuple (see [`fact::TupleCodec`]). Starting
//! from a set of seed facts, workers repeatedly take a fact off a queue,
//! apply the derivation rules to it, and enqueue every derived fact that was
//! not known before. The computation stops at the *fixed point*: the state
//! where no worker can derive anything new.
//!
//! ## Modules
//! * [`locked`] – [`locked::LockedBitSet`] (the seen-set) and
//!   [`locked::LockedFactQueue`] (a work queue). Both hide their lock and
//!   expose composed operations only, such as `test_and_set` and `try_pop`.
//! * [`store`] – the seen-set and the work queues of one solver, plus the
//!   test-and-set-then-enqueue step and work stealing between queues.
//! * [`pool`] – the worker threads, idle handling, termination detection and
//!   cooperative cancellation.
//! * [`solver`] – the [`solver::Solver`] lifecycle: `init`, `compute`, `end`.
//! * [`rule`] – the [`rule::Rule`] trait, strata and programs.
//! * [`builtin`] – ready-made programs (successor chain, transitive closure).
//! * [`config`] – layered settings for the solver and the binary.
//!
//! ## Correctness
//! The only ordering guarantee between workers is that a fact is enqueued
//! at most once, by whoever wins the `test_and_set` on the seen-set. Since
//! rules are monotone and depend only on the fact they are applied to, the
//! final set of facts does not depend on scheduling or on the thread count.
//!
//! ## Quick Start
//! ```
//! use fixpoint::{builtin, fact::Fact, solver::Solver};
//! let mut solver = Solver::new(builtin::successor(&[1, 2], 10));
//! solver.init(4).unwrap();
//! solver.compute().unwrap();
//! let fixed_point = solver.end().unwrap();
//! assert_eq!(fixed_point.to_vec(), (1..10).map(Fact::new).collect::<Vec<_>>());
//! ```

pub mod builtin;
pub mod config;
pub mod error;
pub mod fact;
pub mod locked;
pub mod pool;
pub mod rule;
pub mod solver;
pub mod store;

pub use error::{FixpointError, Result};
