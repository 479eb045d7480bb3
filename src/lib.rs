//! User-level cooperative-preemptive threads on a single OS thread.
//!
//! Many logical threads are multiplexed onto the thread that calls
//! [`init`]. Each gets a fixed quantum of the process's virtual CPU time;
//! when it expires, a signal-driven preemption rotates the round-robin
//! ready queue and switches contexts. Threads can also block and be
//! resumed, sleep on the wall clock, and terminate themselves or others.
//!
//! The entry points follow a numeric contract: `0` on success, `-1` on a
//! recoverable error (reported on stderr as `thread library error: ...`).
//! Host failures — installing a handler, arming a timer, building a stack —
//! are not recoverable: the library releases its memory, prints
//! `system error: ...`, and exits the process with code 1.
//!
//! The library owns `SIGVTALRM` and `SIGALRM` and both interval timers;
//! user code must leave them alone.
//!
//! ```no_run
//! fn worker() {
//!     println!("hello from thread {}", uthreads::get_tid());
//!     uthreads::terminate(uthreads::get_tid());
//! }
//!
//! uthreads::init(100_000);
//! uthreads::spawn(worker);
//! // The quantum timer will hand `worker` the CPU.
//! ```

mod context;
mod diag;
mod error;
mod manager;
mod ready;
mod runtime;
mod signals;
mod sleep;
mod thread;
mod timers;

pub use error::Error;
pub use thread::Tid;

/// Most threads that may exist at once, the main thread included.
pub const MAX_THREAD_NUM: usize = 100;

/// Stack size of every spawned thread, in bytes. The stacks are plain heap
/// buffers with no guard page, and a preemption signal delivered to a
/// thread pushes its frame (extended CPU state included) onto that stack,
/// so the size leaves ample headroom beyond user code.
pub const STACK_SIZE: usize = 32_768;

/// Initialize the library with a quantum of `quantum_usecs` microseconds
/// of virtual time. Must be called once, before anything else; the calling
/// thread becomes tid 0.
///
/// Returns 0, or -1 if `quantum_usecs` is not positive or the library is
/// already initialized.
pub fn init(quantum_usecs: i32) -> i32 {
    report(runtime::init(quantum_usecs as i64))
}

/// Spawn a thread running `entry` and append it to the ready queue.
///
/// Returns the new tid (the smallest unused one), or -1 when
/// [`MAX_THREAD_NUM`] threads already exist.
pub fn spawn(entry: fn()) -> i32 {
    match runtime::spawn(entry) {
        Ok(tid) => tid as i32,
        Err(err) => fail(err),
    }
}

/// Terminate thread `tid` and release everything it owns. Terminating
/// tid 0 releases the whole library and exits the process with code 0;
/// a thread terminating itself does not return.
///
/// Returns 0, or -1 if no such thread exists.
pub fn terminate(tid: i32) -> i32 {
    match checked_tid(tid) {
        Ok(tid) => report(runtime::terminate(tid)),
        Err(err) => fail(err),
    }
}

/// Block thread `tid` until [`resume`]d. Blocking the running thread
/// schedules the next one immediately; blocking an already-blocked thread
/// is a no-op success.
///
/// Returns 0, or -1 for tid 0 or an unknown tid.
pub fn block(tid: i32) -> i32 {
    match checked_tid(tid) {
        Ok(tid) => report(runtime::block(tid)),
        Err(err) => fail(err),
    }
}

/// Clear `tid`'s blocked state. A thread that is not also sleeping goes
/// back on the ready queue; the running thread is never preempted by this.
/// Resuming a non-blocked thread is a no-op success.
///
/// Returns 0, or -1 for an unknown tid.
pub fn resume(tid: i32) -> i32 {
    match checked_tid(tid) {
        Ok(tid) => report(runtime::resume(tid)),
        Err(err) => fail(err),
    }
}

/// Put the running thread to sleep for `usecs` microseconds of wall-clock
/// time, scheduling the next thread immediately.
///
/// Returns 0, or -1 when called from the main thread.
pub fn sleep(usecs: i32) -> i32 {
    report(runtime::sleep(usecs as i64))
}

/// The tid of the calling thread.
pub fn get_tid() -> i32 {
    runtime::current_tid() as i32
}

/// Quanta started since [`init`], the current one included. The value is 1
/// right after [`init`] and grows by 1 on every preemption, block, sleep,
/// and self-termination.
pub fn get_total_quantums() -> i32 {
    runtime::total_quantums() as i32
}

/// Quanta during which thread `tid` was the running thread, the current
/// quantum included if it is running now. A thread's first run counts 1.
///
/// Returns the count, or -1 for an unknown tid.
pub fn get_quantums(tid: i32) -> i32 {
    match checked_tid(tid) {
        Ok(tid) => match runtime::quantums_of(tid) {
            Ok(quants) => quants,
            Err(err) => fail(err),
        },
        Err(err) => fail(err),
    }
}

fn checked_tid(tid: i32) -> error::Result<Tid> {
    usize::try_from(tid).map_err(|_| Error::NoSuchThread(tid as i64))
}

fn report(result: error::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => fail(err),
    }
}

fn fail(err: Error) -> i32 {
    diag::lib_error(&err);
    -1
}
