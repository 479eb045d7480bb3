//! Sleeping threads, ordered by wakeup deadline.
//!
//! Entries are keyed by `(deadline, insertion sequence)`, so equal
//! deadlines wake in the order the threads went to sleep. A tid appears at
//! most once; sleeping and blocked are independent, so an entry may belong
//! to a thread that is also blocked.

use std::collections::BTreeMap;

use crate::thread::Tid;

/// A sleeping thread and the microsecond wall-clock time at which it wakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeUp {
    pub tid: Tid,
    pub wake_at_us: i64,
}

pub struct SleepingThreadsList {
    entries: BTreeMap<(i64, u64), Tid>,
    next_seq: u64,
}

impl SleepingThreadsList {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub fn add(&mut self, tid: Tid, wake_at_us: i64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((wake_at_us, seq), tid);
    }

    /// The earliest wakeup, if any thread sleeps.
    pub fn peek(&self) -> Option<WakeUp> {
        self.entries
            .iter()
            .next()
            .map(|(&(wake_at_us, _), &tid)| WakeUp { tid, wake_at_us })
    }

    /// Remove and return the earliest wakeup.
    pub fn pop(&mut self) -> Option<WakeUp> {
        self.entries
            .pop_first()
            .map(|((wake_at_us, _), tid)| WakeUp { tid, wake_at_us })
    }

    /// Drop `tid`'s entry, wherever its deadline sits.
    pub fn remove(&mut self, tid: Tid) {
        self.entries.retain(|_, &mut sleeper| sleeper != tid);
    }
}
