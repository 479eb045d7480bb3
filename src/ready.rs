//! Round-robin ready queue.
//!
//! The queue holds every runnable tid in FIFO order; the front element is
//! the running thread. The queue is never empty: tid 0 cannot block, sleep,
//! or be terminated without ending the process, so it is always either
//! running or waiting somewhere behind.

use std::collections::VecDeque;

use crate::thread::Tid;

pub struct ReadyScheduler {
    queue: VecDeque<Tid>,
}

impl ReadyScheduler {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Append a runnable tid. Callers guarantee it is not already queued.
    pub fn add_thread(&mut self, tid: Tid) {
        self.queue.push_back(tid);
    }

    /// The running thread: the front of the queue.
    pub fn get_running(&self) -> Tid {
        self.queue.front().copied().unwrap_or(0)
    }

    /// Quantum expiry: rotate the front to the back, return the new front.
    pub fn whos_next_on_timeout(&mut self) -> Tid {
        if let Some(front) = self.queue.pop_front() {
            self.queue.push_back(front);
        }
        self.get_running()
    }

    /// A thread was blocked. If it was running, the front falls to the next
    /// in line; otherwise the queue only loses the blocked tid.
    pub fn whos_next_on_block(&mut self, tid: Tid) -> Tid {
        self.drop_and_pick(tid)
    }

    /// The running thread went to sleep: pop it, return the new front.
    pub fn whos_next_on_sleep(&mut self) -> Tid {
        self.queue.pop_front();
        self.get_running()
    }

    /// A thread was terminated. Same queue discipline as blocking.
    pub fn whos_next_on_terminate(&mut self, tid: Tid) -> Tid {
        self.drop_and_pick(tid)
    }

    /// Remove a tid from wherever it sits, front included.
    pub fn remove(&mut self, tid: Tid) {
        self.queue.retain(|&queued| queued != tid);
    }

    fn drop_and_pick(&mut self, tid: Tid) -> Tid {
        if self.queue.front() == Some(&tid) {
            self.queue.pop_front();
        } else {
            self.queue.retain(|&queued| queued != tid);
        }
        self.get_running()
    }

    #[cfg(test)]
    fn snapshot(&self) -> Vec<Tid> {
        self.queue.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_of(tids: &[Tid]) -> ReadyScheduler {
        let mut ready = ReadyScheduler::new();
        for &tid in tids {
            ready.add_thread(tid);
        }
        ready
    }

    #[test]
    fn timeout_rotates_round_robin() {
        let mut ready = queue_of(&[0, 1, 2]);
        assert_eq!(ready.get_running(), 0);
        assert_eq!(ready.whos_next_on_timeout(), 1);
        assert_eq!(ready.whos_next_on_timeout(), 2);
        assert_eq!(ready.whos_next_on_timeout(), 0);
        assert_eq!(ready.snapshot(), vec![0, 1, 2]);
    }

    #[test]
    fn blocking_the_running_thread_promotes_the_next() {
        let mut ready = queue_of(&[1, 2, 0]);
        assert_eq!(ready.whos_next_on_block(1), 2);
        assert_eq!(ready.snapshot(), vec![2, 0]);
    }

    #[test]
    fn blocking_a_waiting_thread_keeps_the_front() {
        let mut ready = queue_of(&[0, 1, 2]);
        assert_eq!(ready.whos_next_on_block(2), 0);
        assert_eq!(ready.snapshot(), vec![0, 1]);
    }

    #[test]
    fn sleep_discards_the_front() {
        let mut ready = queue_of(&[2, 0]);
        assert_eq!(ready.whos_next_on_sleep(), 0);
        assert_eq!(ready.snapshot(), vec![0]);
    }

    #[test]
    fn terminate_follows_block_discipline() {
        let mut ready = queue_of(&[1, 2, 0]);
        assert_eq!(ready.whos_next_on_terminate(2), 1);
        assert_eq!(ready.whos_next_on_terminate(1), 0);
        assert_eq!(ready.snapshot(), vec![0]);
    }

    #[test]
    fn removal_composes_with_the_pick_operations() {
        // The manager strips a killed tid first; the subsequent pick then
        // sees an untouched front.
        let mut ready = queue_of(&[0, 1, 2]);
        ready.remove(1);
        assert_eq!(ready.whos_next_on_terminate(1), 0);
        assert_eq!(ready.snapshot(), vec![0, 2]);
    }
}
