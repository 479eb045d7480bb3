//! Entry-point contract checks that never leave the main thread.
//!
//! The quantum is made enormous so no preemption fires while the
//! assertions run; every call below happens inside tid 0's first quantum.

use uthreads::{
    block, get_quantums, get_tid, get_total_quantums, init, resume, sleep, spawn, terminate,
    MAX_THREAD_NUM,
};

fn parked() {
    // Spawned but never scheduled before the process exits.
    loop {
        std::hint::spin_loop();
    }
}

fn main() {
    env_logger::init();

    // Argument validation, before the library exists.
    assert_eq!(init(0), -1);
    assert_eq!(init(-5), -1);
    assert_eq!(spawn(parked), -1);
    assert_eq!(block(1), -1);
    assert_eq!(resume(1), -1);
    assert_eq!(terminate(1), -1);
    assert_eq!(get_quantums(0), -1);

    // Minutes of virtual time: no preemption during this test.
    assert_eq!(init(1_000_000_000), 0);
    assert_eq!(init(100_000), -1);

    assert_eq!(get_tid(), 0);
    assert_eq!(get_total_quantums(), 1);
    assert_eq!(get_quantums(0), 1);

    // Forbidden operations on the main thread.
    assert_eq!(block(0), -1);
    assert_eq!(sleep(1_000), -1);

    // Unknown tids.
    assert_eq!(resume(42), -1);
    assert_eq!(terminate(42), -1);
    assert_eq!(block(42), -1);
    assert_eq!(get_quantums(42), -1);
    assert_eq!(block(-3), -1);

    // Fill the table: tids count up from 1, main occupies slot 0.
    for expected in 1..MAX_THREAD_NUM {
        assert_eq!(spawn(parked), expected as i32);
    }
    assert_eq!(spawn(parked), -1);

    // Killing a thread frees the smallest slot for reuse.
    assert_eq!(terminate(7), 0);
    assert_eq!(spawn(parked), 7);

    // A spawned thread has not run yet.
    assert_eq!(get_quantums(7), 0);

    // Blocking is idempotent; resume of a READY thread is a no-op.
    assert_eq!(resume(3), 0);
    assert_eq!(block(3), 0);
    assert_eq!(block(3), 0);
    assert_eq!(resume(3), 0);
    assert_eq!(resume(3), 0);

    // None of the above started a new quantum.
    assert_eq!(get_total_quantums(), 1);
    assert_eq!(get_tid(), 0);

    // Exits the whole process with code 0.
    terminate(0);
    unreachable!("terminating the main thread ends the process");
}
