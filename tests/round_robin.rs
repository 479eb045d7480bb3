//! Two-thread round-robin: preemption hands the CPU to the spawned thread,
//! self-termination hands it back and frees the tid for reuse.

use std::sync::atomic::{AtomicUsize, Ordering};

use uthreads::{get_quantums, get_tid, get_total_quantums, init, spawn, terminate};

static STAGE: AtomicUsize = AtomicUsize::new(0);

fn worker() {
    assert_eq!(get_tid(), 1);
    assert!(get_quantums(1) >= 1);
    STAGE.store(1, Ordering::SeqCst);
    terminate(get_tid());
    unreachable!("self-termination does not return");
}

fn main() {
    env_logger::init();

    assert_eq!(init(100_000), 0);
    assert_eq!(spawn(worker), 1);
    assert_eq!(get_total_quantums(), 1);
    assert_eq!(get_quantums(1), 0);

    // Burn virtual time until the quantum expires and the worker runs.
    while STAGE.load(Ordering::SeqCst) == 0 {
        std::hint::spin_loop();
    }

    // The worker terminated itself; we were the only runnable thread left.
    assert_eq!(get_tid(), 0);
    // At least: init, the preemption into the worker, the switch back.
    assert!(get_total_quantums() >= 3);
    assert!(get_quantums(0) >= 2);
    // The worker is gone...
    assert_eq!(get_quantums(1), -1);
    // ...and its tid is the smallest free one again.
    assert_eq!(spawn(worker), 1);

    terminate(0);
    unreachable!("terminating the main thread ends the process");
}
