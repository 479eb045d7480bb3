//! Thread table ownership and context-switch bookkeeping.
//!
//! The manager owns every [`Tcb`] and the notion of "currently running".
//! Records are boxed, so a saved context keeps its address for as long as
//! the thread lives, however the table rebalances around it.

use std::collections::BTreeMap;

use crate::context::Trampoline;
use crate::diag;
use crate::error::{Error, Result};
use crate::ready::ReadyScheduler;
use crate::sleep::SleepingThreadsList;
use crate::thread::{Tcb, Tid};

/// Outcome of [`ThreadManager::wake`]: the sleep handler must tell a live
/// thread apart from one that was terminated while it slept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeStatus {
    Woken,
    Vanished,
}

/// How the jump is performed once the runtime lock is released. The raw
/// pointers stay valid because boxed records are pinned until removal and
/// the masked critical section keeps the table frozen until the jump.
pub enum SwitchPlan {
    /// Save the outgoing context, then enter the incoming one.
    SaveAndEnter {
        save: *mut libc::ucontext_t,
        enter: *const libc::ucontext_t,
    },
    /// The outgoing record is gone (self-termination): enter directly,
    /// saving nowhere.
    EnterOnly { enter: *const libc::ucontext_t },
}

pub struct ThreadManager {
    table: BTreeMap<Tid, Box<Tcb>>,
    running: Tid,
    max_threads: usize,
    stack_size: usize,
    trampoline: Trampoline,
}

impl ThreadManager {
    pub fn new(max_threads: usize, stack_size: usize, trampoline: Trampoline) -> Self {
        Self {
            table: BTreeMap::new(),
            running: 0,
            max_threads,
            stack_size,
            trampoline,
        }
    }

    /// Create the main thread's record and charge it its first quantum.
    pub fn setup(&mut self) {
        let mut main = Tcb::new_main();
        main.increment_quants();
        self.table.insert(0, main);
        self.running = 0;
    }

    pub fn running(&self) -> Tid {
        self.running
    }

    pub fn contains(&self, tid: Tid) -> bool {
        self.table.contains_key(&tid)
    }

    /// Allocate the smallest free tid and build its record. Stack or
    /// context setup failure is fatal; a full table is the caller's error.
    pub fn create_thread(&mut self, entry: fn()) -> Result<Tid> {
        if self.table.len() >= self.max_threads {
            return Err(Error::TooManyThreads(self.max_threads));
        }
        let tid = match (0..self.max_threads).find(|tid| !self.table.contains_key(tid)) {
            Some(tid) => tid,
            None => return Err(Error::TooManyThreads(self.max_threads)),
        };
        let tcb = match Tcb::new(tid, entry, self.stack_size, self.trampoline) {
            Ok(tcb) => tcb,
            Err(err) => diag::die(&format!("failed to set up a thread context: {err}")),
        };
        self.table.insert(tid, tcb);
        Ok(tid)
    }

    /// Remove `tid` from the table and both queues, releasing its stack.
    /// If `tid` was running, the caller initiates the switch afterwards;
    /// the save step will find no record and skip itself.
    pub fn kill_thread(
        &mut self,
        tid: Tid,
        ready: &mut ReadyScheduler,
        sleepers: &mut SleepingThreadsList,
    ) -> Result<()> {
        let tcb = match self.table.remove(&tid) {
            Some(tcb) => tcb,
            None => return Err(Error::NoSuchThread(tid as i64)),
        };
        ready.remove(tid);
        sleepers.remove(tid);
        log::trace!("releasing thread {} and its stack", tcb.tid());
        drop(tcb);
        Ok(())
    }

    /// Mark `tid` blocked and strip it from the ready queue. Idempotent on
    /// an already-blocked thread.
    pub fn block_thread(&mut self, tid: Tid, ready: &mut ReadyScheduler) -> Result<()> {
        let tcb = self
            .table
            .get_mut(&tid)
            .ok_or(Error::NoSuchThread(tid as i64))?;
        tcb.set_blocked(true);
        ready.remove(tid);
        Ok(())
    }

    /// Clear the blocked flag. Requeueing is the caller's decision: a
    /// thread that is still sleeping stays off the ready queue.
    pub fn unblock_thread(&mut self, tid: Tid) -> Result<()> {
        let tcb = self
            .table
            .get_mut(&tid)
            .ok_or(Error::NoSuchThread(tid as i64))?;
        tcb.set_blocked(false);
        Ok(())
    }

    pub fn is_blocked(&self, tid: Tid) -> bool {
        self.table.get(&tid).map_or(false, |tcb| tcb.is_blocked())
    }

    pub fn is_sleeping(&self, tid: Tid) -> bool {
        self.table.get(&tid).map_or(false, |tcb| tcb.is_sleeping())
    }

    pub fn put_to_sleep(&mut self, tid: Tid) {
        if let Some(tcb) = self.table.get_mut(&tid) {
            tcb.set_sleeping(true);
        }
    }

    /// Clear the sleeping flag, reporting whether the thread still exists.
    pub fn wake(&mut self, tid: Tid) -> WakeStatus {
        match self.table.get_mut(&tid) {
            Some(tcb) => {
                tcb.set_sleeping(false);
                WakeStatus::Woken
            }
            None => WakeStatus::Vanished,
        }
    }

    pub fn get_quants(&self, tid: Tid) -> Result<i32> {
        self.table
            .get(&tid)
            .map(|tcb| tcb.quants())
            .ok_or(Error::NoSuchThread(tid as i64))
    }

    pub fn entry_of(&self, tid: Tid) -> Option<fn()> {
        self.table.get(&tid).and_then(|tcb| tcb.entry())
    }

    /// Book the switch from `out` to `into`: mark `into` running, charge it
    /// the quantum that now begins, and hand back the contexts to jump
    /// between. `out` having no record means it terminated itself and its
    /// context must not be saved.
    pub fn prepare_switch(&mut self, out: Tid, into: Tid) -> SwitchPlan {
        let enter = match self.table.get_mut(&into) {
            Some(tcb) => {
                tcb.increment_quants();
                tcb.context_mut_ptr() as *const libc::ucontext_t
            }
            None => diag::die("the scheduler picked a thread that does not exist"),
        };
        self.running = into;
        match self.table.get_mut(&out) {
            Some(tcb) => SwitchPlan::SaveAndEnter {
                save: tcb.context_mut_ptr(),
                enter,
            },
            None => SwitchPlan::EnterOnly { enter },
        }
    }
}
