//! Lock-guarded containers shared by the workers.
//!
//! Both containers keep their lock private and expose only composed
//! operations, so every critical section is a single method call and the
//! guard is released on every exit path. Neither structure is ever left in
//! a torn state by a panicking holder (the seen-set only grows, the queue
//! only pushes or pops one element), so a poisoned lock is simply recovered.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

// since every fact is an index we can use a bitset to mark the known ones,
// and the treemap variant covers the full u64 range
use roaring::RoaringTreemap;

use crate::error::Result;
use crate::fact::Fact;

fn guard<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

// ------------- LockedBitSet -------------
/// Thread-safe, grow-only set of fact indices.
#[derive(Debug, Default)]
pub struct LockedBitSet {
    bits: Mutex<RoaringTreemap>,
}

impl LockedBitSet {
    pub fn new() -> Self {
        Self::default()
    }
    /// Marks `fact` as known. Returns true iff this call was the one that
    /// added it. Check and set happen under one acquisition of the lock.
    pub fn test_and_set(&self, fact: Fact) -> bool {
        guard(&self.bits).insert(fact.id())
    }
    /// Like [`test_and_set`](Self::test_and_set) for a raw signed index,
    /// which fails with `InvalidIndex` when negative.
    pub fn test_and_set_index(&self, index: i64) -> Result<bool> {
        let fact = Fact::try_from(index)?;
        Ok(self.test_and_set(fact))
    }
    /// Membership snapshot. May be stale by the time the caller acts on it;
    /// use `test_and_set` when the answer decides whether to enqueue.
    pub fn contains(&self, fact: Fact) -> bool {
        guard(&self.bits).contains(fact.id())
    }
    pub fn len(&self) -> u64 {
        guard(&self.bits).len()
    }
    pub fn is_empty(&self) -> bool {
        guard(&self.bits).is_empty()
    }
    /// Copy of the current contents, taken under the lock.
    pub fn snapshot(&self) -> RoaringTreemap {
        guard(&self.bits).clone()
    }
}

// ------------- LockedFactQueue -------------
/// Thread-safe FIFO of facts awaiting processing.
#[derive(Debug, Default)]
pub struct LockedFactQueue {
    facts: Mutex<VecDeque<Fact>>,
}

impl LockedFactQueue {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&self, fact: Fact) {
        guard(&self.facts).push_back(fact);
    }
    /// Appends all of `facts` under a single acquisition of the lock.
    pub fn extend<I: IntoIterator<Item = Fact>>(&self, facts: I) {
        guard(&self.facts).extend(facts);
    }
    /// Removes the head, or returns `None` if the queue is empty right now.
    /// Never blocks waiting for work.
    pub fn try_pop(&self) -> Option<Fact> {
        guard(&self.facts).pop_front()
    }
    pub fn len(&self) -> usize {
        guard(&self.facts).len()
    }
    pub fn is_empty(&self) -> bool {
        guard(&self.facts).is_empty()
    }
    pub fn clear(&self) {
        guard(&self.facts).clear();
    }
}
