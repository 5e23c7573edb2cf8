use std::sync::Arc;

use crate::config::QueueMode;
use crate::fact::Fact;
use crate::locked::{LockedBitSet, LockedFactQueue};

// ------------- FactStore -------------
// The shared mutable state of a solver: the seen-set and the work queues.
// Workers only ever touch it through the methods below, which pair the
// test-and-set on the seen-set with the push onto a queue.
#[derive(Debug)]
pub struct FactStore {
    seen: LockedBitSet,
    queues: Vec<LockedFactQueue>,
}

impl FactStore {
    pub fn new(threads: usize, mode: QueueMode) -> Arc<Self> {
        let count = match mode {
            QueueMode::PerWorker => threads.max(1),
            QueueMode::Shared => 1,
        };
        Arc::new(Self {
            seen: LockedBitSet::new(),
            queues: (0..count).map(|_| LockedFactQueue::new()).collect(),
        })
    }
    pub fn seen(&self) -> &LockedBitSet {
        &self.seen
    }
    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }
    /// The queue a worker pushes to and pops from first.
    pub fn home(&self, worker: usize) -> usize {
        worker % self.queues.len()
    }
    fn spread(&self, fact: Fact) -> usize {
        (seahash::hash(&fact.id().to_le_bytes()) % self.queues.len() as u64) as usize
    }
    /// Records a fact given from outside the fixed point computation and
    /// enqueues it if it was not known. Returns whether it was new.
    pub fn seed(&self, fact: Fact) -> bool {
        let fresh = self.seen.test_and_set(fact);
        if fresh {
            self.queues[self.spread(fact)].push(fact);
        }
        fresh
    }
    /// Records a derived fact on behalf of the worker owning queue `home`.
    pub fn discover(&self, fact: Fact, home: usize) -> bool {
        let fresh = self.seen.test_and_set(fact);
        if fresh {
            self.queues[home].push(fact);
        }
        fresh
    }
    /// Pops from `home`, falling back to the other queues in round-robin
    /// order. The flag tells whether the fact was stolen from a sibling.
    pub fn take(&self, home: usize) -> Option<(Fact, bool)> {
        if let Some(fact) = self.queues[home].try_pop() {
            return Some((fact, false));
        }
        let count = self.queues.len();
        (1..count)
            .map(|offset| (home + offset) % count)
            .find_map(|victim| self.queues[victim].try_pop())
            .map(|fact| (fact, true))
    }
    pub fn pending(&self) -> usize {
        self.queues.iter().map(LockedFactQueue::len).sum()
    }
    pub fn has_pending(&self) -> bool {
        self.queues.iter().any(|queue| !queue.is_empty())
    }
    /// Puts every known fact back on the queues, in ascending order.
    pub fn requeue_known(&self) -> u64 {
        let known = self.seen.snapshot();
        let mut batches: Vec<Vec<Fact>> = vec![Vec::new(); self.queues.len()];
        for id in known.iter() {
            let fact = Fact::new(id);
            batches[self.spread(fact)].push(fact);
        }
        for (queue, batch) in self.queues.iter().zip(batches) {
            queue.extend(batch);
        }
        known.len()
    }
    pub fn clear_pending(&self) {
        for queue in &self.queues {
            queue.clear();
        }
    }
}
