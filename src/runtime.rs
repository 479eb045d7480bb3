//! The global library runtime: lifecycle, entry-point logic, and the two
//! signal handlers.
//!
//! A single [`Runtime`] value owns every table and timer. The library runs
//! on one OS thread, and every path that touches the runtime first masks
//! both timer signals, so the signal mask is the real mutual exclusion; the
//! spin mutex exists to give the static a safe initialization story and is
//! never contended.
//!
//! A lock guard must never live across a context switch (the switched-out
//! thread would carry it away), so entry points compute a [`SwitchPlan`]
//! under the lock, release it, and only then jump. The masked signals keep
//! anything from observing the gap.

use core::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use spin::Mutex;

use crate::context;
use crate::diag;
use crate::error::{Error, Result};
use crate::manager::{SwitchPlan, ThreadManager, WakeStatus};
use crate::ready::ReadyScheduler;
use crate::signals::{self, MaskGuard};
use crate::sleep::SleepingThreadsList;
use crate::thread::Tid;
use crate::timers::{self, RealSleepTimer, VirtualQuantumTimer};
use crate::{MAX_THREAD_NUM, STACK_SIZE};

use libc::c_int;

static RUNTIME: Mutex<Option<Runtime>> = Mutex::new(None);

/// Quanta since init, the current one included. Starts a new count at 1 on
/// every init so the pure getter needs no lock.
static TOTAL_QUANTUMS: AtomicI64 = AtomicI64::new(0);

/// Mirror of the manager's running tid for the lock-free getter: a handler
/// may interrupt an unmasked reader, so the reader must not hold the lock.
static CURRENT_TID: AtomicUsize = AtomicUsize::new(0);

struct Runtime {
    manager: ThreadManager,
    ready: ReadyScheduler,
    sleepers: SleepingThreadsList,
    vtimer: VirtualQuantumTimer,
    rtimer: RealSleepTimer,
}

/// Initialize tables, create tid 0, install both handlers, and start the
/// first quantum.
pub(crate) fn init(quantum_usecs: i64) -> Result<()> {
    if quantum_usecs <= 0 {
        return Err(Error::NonPositiveQuantum);
    }
    let _mask = MaskGuard::new();
    let mut slot = RUNTIME.lock();
    if slot.is_some() {
        return Err(Error::AlreadyInitialized);
    }

    let mut rt = Runtime {
        manager: ThreadManager::new(MAX_THREAD_NUM, STACK_SIZE, thread_trampoline),
        ready: ReadyScheduler::new(),
        sleepers: SleepingThreadsList::new(),
        vtimer: VirtualQuantumTimer::new(quantum_usecs),
        rtimer: RealSleepTimer::new(),
    };
    rt.manager.setup();
    rt.ready.add_thread(0);
    CURRENT_TID.store(0, Ordering::Release);

    if signals::install_handler(libc::SIGVTALRM, handle_quantum_timeout).is_err() {
        diag::die("failed to install the quantum signal handler");
    }
    if signals::install_handler(libc::SIGALRM, handle_sleep_timeout).is_err() {
        diag::die("failed to install the sleep signal handler");
    }
    if rt.vtimer.start().is_err() {
        diag::die("failed to arm the quantum timer");
    }
    TOTAL_QUANTUMS.store(1, Ordering::Release);

    *slot = Some(rt);
    log::debug!("thread library initialized, quantum = {quantum_usecs} us");
    Ok(())
}

/// Create a thread running `entry` and append it to the ready queue.
pub(crate) fn spawn(entry: fn()) -> Result<Tid> {
    let _mask = MaskGuard::new();
    let mut slot = RUNTIME.lock();
    let rt = slot.as_mut().ok_or(Error::NotInitialized)?;

    let tid = rt.manager.create_thread(entry)?;
    rt.ready.add_thread(tid);
    log::debug!("spawned thread {tid}");
    Ok(tid)
}

/// Terminate `tid`. Tid 0 ends the process; terminating the running thread
/// starts a fresh quantum in whichever thread the scheduler picks next.
pub(crate) fn terminate(tid: Tid) -> Result<()> {
    let _mask = MaskGuard::new();
    let mut slot = RUNTIME.lock();

    if tid == 0 {
        // Terminating the main thread ends the whole process, releasing
        // every stack and table the library owns first.
        let runtime = slot.take().ok_or(Error::NotInitialized)?;
        drop(slot);
        drop(runtime);
        log::debug!("main thread terminated, exiting");
        std::process::exit(0);
    }

    let rt = slot.as_mut().ok_or(Error::NotInitialized)?;
    let cur = rt.manager.running();
    rt.manager
        .kill_thread(tid, &mut rt.ready, &mut rt.sleepers)?;
    let next = rt.ready.whos_next_on_terminate(tid);
    log::debug!("terminated thread {tid}");

    if cur == tid {
        // Self-termination: the stack above us is already released, so the
        // switch saves nothing and never comes back here.
        if rt.vtimer.start().is_err() {
            diag::die("failed to arm the quantum timer");
        }
        TOTAL_QUANTUMS.fetch_add(1, Ordering::AcqRel);
        let plan = rt.manager.prepare_switch(cur, next);
        CURRENT_TID.store(next, Ordering::Release);
        drop(slot);
        unsafe { perform(plan) };
    }
    Ok(())
}

/// Mark `tid` blocked; if it was running, hand the CPU to the next thread.
pub(crate) fn block(tid: Tid) -> Result<()> {
    if tid == 0 {
        return Err(Error::BlockMain);
    }
    let _mask = MaskGuard::new();
    let mut slot = RUNTIME.lock();
    let rt = slot.as_mut().ok_or(Error::NotInitialized)?;

    let cur = rt.ready.get_running();
    rt.manager.block_thread(tid, &mut rt.ready)?;
    let next = rt.ready.whos_next_on_block(tid);
    log::trace!("blocked thread {tid}");

    if next != cur {
        if rt.vtimer.start().is_err() {
            diag::die("failed to arm the quantum timer");
        }
        TOTAL_QUANTUMS.fetch_add(1, Ordering::AcqRel);
        let plan = rt.manager.prepare_switch(cur, next);
        CURRENT_TID.store(next, Ordering::Release);
        drop(slot);
        unsafe { perform(plan) };
        // Resumed: someone called resume on us and we rotated back in.
    }
    Ok(())
}

/// Clear `tid`'s blocked flag, requeueing it unless it is still sleeping.
/// Never preempts. Resuming a non-blocked thread is a no-op.
pub(crate) fn resume(tid: Tid) -> Result<()> {
    let _mask = MaskGuard::new();
    let mut slot = RUNTIME.lock();
    let rt = slot.as_mut().ok_or(Error::NotInitialized)?;

    let was_blocked = rt.manager.is_blocked(tid);
    rt.manager.unblock_thread(tid)?;
    if was_blocked && !rt.manager.is_sleeping(tid) {
        rt.ready.add_thread(tid);
    }
    log::trace!("resumed thread {tid}");
    Ok(())
}

/// Put the running thread to sleep for `usecs` of wall-clock time, then
/// hand the CPU onward.
pub(crate) fn sleep(usecs: i64) -> Result<()> {
    let _mask = MaskGuard::new();
    let mut slot = RUNTIME.lock();
    let rt = slot.as_mut().ok_or(Error::NotInitialized)?;

    let cur = rt.ready.get_running();
    if cur == 0 {
        return Err(Error::SleepMain);
    }

    let old_head = rt.sleepers.peek();
    let wake_at_us = timers::now_micros() + usecs.max(0);
    rt.sleepers.add(cur, wake_at_us);

    // Re-arm only when the earliest deadline changed; otherwise the shot
    // already in flight is the right one.
    let head_changed = match old_head {
        None => true,
        Some(old) => rt.sleepers.peek().map(|head| head.tid) != Some(old.tid),
    };
    if head_changed && rt.rtimer.start(usecs.max(1)).is_err() {
        diag::die("failed to arm the sleep timer");
    }

    rt.manager.put_to_sleep(cur);
    let next = rt.ready.whos_next_on_sleep();
    log::trace!("thread {cur} sleeping for {usecs} us");

    if rt.vtimer.start().is_err() {
        diag::die("failed to arm the quantum timer");
    }
    TOTAL_QUANTUMS.fetch_add(1, Ordering::AcqRel);
    let plan = rt.manager.prepare_switch(cur, next);
    CURRENT_TID.store(next, Ordering::Release);
    drop(slot);
    unsafe { perform(plan) };
    // Resumed: the sleep timer expired and rotation brought us back.
    Ok(())
}

/// The running tid. Lock-free so it is safe against handler interleaving.
pub(crate) fn current_tid() -> Tid {
    CURRENT_TID.load(Ordering::Acquire)
}

/// Quanta since init, the current one included. Lock-free.
pub(crate) fn total_quantums() -> i64 {
    TOTAL_QUANTUMS.load(Ordering::Acquire)
}

/// Quanta during which `tid` has been the running thread.
pub(crate) fn quantums_of(tid: Tid) -> Result<i32> {
    let _mask = MaskGuard::new();
    let slot = RUNTIME.lock();
    let rt = slot.as_ref().ok_or(Error::NotInitialized)?;
    rt.manager.get_quants(tid)
}

/// Best-effort teardown on the fatal path. `try_lock` because the failure
/// may have happened inside a locked section; the process is exiting
/// either way.
pub(crate) fn release() {
    if let Some(mut slot) = RUNTIME.try_lock() {
        *slot = None;
    }
}

/// First frame of every spawned thread: run the entry function and
/// terminate the thread when it returns.
extern "C" fn thread_trampoline() {
    let tid = current_tid();
    let entry = {
        let _mask = MaskGuard::new();
        let slot = RUNTIME.lock();
        slot.as_ref().and_then(|rt| rt.manager.entry_of(tid))
    };
    if let Some(entry) = entry {
        entry();
    }
    // Self-termination does not return.
    let _ = terminate(tid);
}

/// Quantum expiry: start the next quantum and rotate the ready queue.
extern "C" fn handle_quantum_timeout(_sig: c_int) {
    // Runs with both timer signals masked (handler mask), so the runtime
    // lock is free by construction.
    let mut slot = RUNTIME.lock();
    let rt = match slot.as_mut() {
        Some(rt) => rt,
        None => return,
    };

    if rt.vtimer.start().is_err() {
        diag::die("failed to arm the quantum timer");
    }
    TOTAL_QUANTUMS.fetch_add(1, Ordering::AcqRel);

    let cur = rt.ready.get_running();
    let next = rt.ready.whos_next_on_timeout();
    let plan = rt.manager.prepare_switch(cur, next);
    CURRENT_TID.store(next, Ordering::Release);
    drop(slot);
    unsafe { perform(plan) };
    // The preempted thread resumes here and returns through the handler's
    // own signal frame, still intact on its stack.
}

/// Sleep expiry: drain every sleeper whose deadline has passed, then arm
/// the shot for the new earliest deadline.
extern "C" fn handle_sleep_timeout(_sig: c_int) {
    let mut slot = RUNTIME.lock();
    let rt = match slot.as_mut() {
        Some(rt) => rt,
        None => return,
    };

    loop {
        let head = match rt.sleepers.peek() {
            Some(head) => head,
            None => return,
        };
        let remaining = head.wake_at_us - timers::now_micros();
        if remaining > 0 {
            // The due entry was terminated before its deadline; push the
            // shot out to the surviving head.
            if rt.rtimer.start(remaining).is_err() {
                diag::die("failed to arm the sleep timer");
            }
            return;
        }
        rt.sleepers.pop();
        // A tid terminated while sleeping is gone; a still-blocked one
        // wakes but waits for resume before rejoining the queue.
        if rt.manager.wake(head.tid) == WakeStatus::Woken && !rt.manager.is_blocked(head.tid) {
            rt.ready.add_thread(head.tid);
        }
    }
}

/// Execute a prepared switch. With a save target this returns when the
/// saved thread is eventually resumed; without one it never returns.
unsafe fn perform(plan: SwitchPlan) {
    match plan {
        SwitchPlan::SaveAndEnter { save, enter } => context::swap(save, enter),
        SwitchPlan::EnterOnly { enter } => context::enter(enter),
    }
}
