//! Self-block hands the CPU to the next thread in queue order, resume
//! requeues without preempting, and the blocked thread picks up exactly
//! where it stopped.
//!
//! Queue walkthrough: after init and two spawns the queue is [0, 1, 2].
//! The first preemption rotates it to [1, 2, 0], so when thread 1 blocks
//! itself the front falls to thread 2 — not to main.

use std::sync::atomic::{AtomicUsize, Ordering};

use uthreads::{block, get_quantums, get_tid, init, resume, spawn, terminate};

static STAGE: AtomicUsize = AtomicUsize::new(0);

fn blocker() {
    assert_eq!(get_tid(), 1);
    assert_eq!(block(1), 0);
    // Only reached after thread 2 resumed us and we were rescheduled.
    assert_eq!(get_tid(), 1);
    assert_eq!(STAGE.load(Ordering::SeqCst), 1);
    STAGE.store(2, Ordering::SeqCst);
    terminate(1);
}

fn resumer() {
    assert_eq!(get_tid(), 2);
    // Thread 1's self-block scheduled us directly; main never ran between.
    assert_eq!(STAGE.load(Ordering::SeqCst), 0);
    assert_eq!(resume(1), 0);
    // Resume puts thread 1 back in the queue but does not preempt us.
    assert_eq!(get_tid(), 2);
    // Resuming a thread that is no longer blocked changes nothing.
    assert_eq!(resume(1), 0);
    STAGE.store(1, Ordering::SeqCst);
    terminate(2);
}

fn main() {
    env_logger::init();

    assert_eq!(init(50_000), 0);
    assert_eq!(block(0), -1);
    assert_eq!(spawn(blocker), 1);
    assert_eq!(spawn(resumer), 2);

    while STAGE.load(Ordering::SeqCst) < 2 {
        std::hint::spin_loop();
    }

    assert_eq!(get_tid(), 0);
    assert!(get_quantums(0) >= 2);
    terminate(0);
    unreachable!("terminating the main thread ends the process");
}
