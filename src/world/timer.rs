use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

/// Milliseconds of session time since the session was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Millis(pub u64);

impl Millis {
    pub fn saturating_since(self, earlier: Millis) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Session clock, advanced explicitly by the embedder. Nothing in the
/// crate reads wall-clock time, so every timing path is deterministic.
#[derive(Debug, Clone)]
pub struct SessionClock {
    now: Millis,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionClock {
    pub fn new() -> Self {
        Self { now: Millis(0) }
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn advance(&mut self, duration: Duration) -> Millis {
        let ms = duration.as_millis().min(u64::MAX as u128) as u64;
        self.now = Millis(self.now.0.saturating_add(ms));
        self.now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimerEntry {
    due: Millis,
    id: TimerId,
}

/// Min-heap by due time (BinaryHeap is a max-heap, so the ordering is
/// reversed), ties broken by id so firing order is stable.
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.id.0.cmp(&self.id.0))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One-shot timer queue with cancellation. Cancelled entries stay in the
/// heap until they surface and are discarded; the live index is the
/// source of truth.
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<TimerEntry>,
    live: HashMap<TimerId, T>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn schedule(&mut self, now: Millis, delay_ms: u64, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let due = Millis(now.0.saturating_add(delay_ms));
        self.heap.push(TimerEntry { due, id });
        self.live.insert(id, task);
        id
    }

    /// Idempotent: cancelling an unknown or already-fired timer is a no-op.
    pub fn cancel(&mut self, id: TimerId) {
        self.live.remove(&id);
    }

    /// Pop the earliest timer that is due at `now`, skipping cancelled
    /// entries.
    pub fn pop_due(&mut self, now: Millis) -> Option<(TimerId, T)> {
        loop {
            let entry = *self.heap.peek()?;
            if !self.live.contains_key(&entry.id) {
                self.heap.pop();
                continue;
            }
            if entry.due > now {
                return None;
            }
            self.heap.pop();
            let task = self.live.remove(&entry.id)?;
            return Some((entry.id, task));
        }
    }

    /// Earliest pending due time, pruning dead heap entries on the way.
    pub fn next_due(&mut self) -> Option<Millis> {
        loop {
            let entry = *self.heap.peek()?;
            if !self.live.contains_key(&entry.id) {
                self.heap.pop();
                continue;
            }
            return Some(entry.due);
        }
    }

    pub fn pending(&self) -> usize {
        self.live.len()
    }
}
