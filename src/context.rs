//! Execution-context snapshots over the host ucontext primitive.
//!
//! A [`Context`] holds everything needed to suspend a thread and enter it
//! again later: program counter, stack pointer, callee-saved registers, and
//! the signal mask. [`swap`] embodies the "save returns twice" contract:
//! the call returns immediately in the thread being entered, and returns a
//! second time, much later, when some other switch resumes the saved one.
//!
//! A `ucontext_t` is position-sensitive once written: `getcontext` stores a
//! pointer to floating-point state that lives inside the struct itself.
//! Contexts are therefore seeded in place, after their owning record has
//! reached its final heap address, and never move afterwards.

use std::io;
use std::mem;
use std::ptr;

/// Entry point seeded into a fresh context.
pub type Trampoline = extern "C" fn();

/// An opaque execution-context snapshot.
#[repr(transparent)]
pub struct Context(libc::ucontext_t);

// The whole library runs on one OS thread; contexts cross the `Send` bound
// only to sit inside the global runtime static.
unsafe impl Send for Context {}

impl Context {
    /// A not-yet-saved context. The main thread's is populated in place by
    /// its first outgoing [`swap`]; spawned threads get [`Context::seed`].
    pub fn empty() -> Self {
        Self(unsafe { mem::zeroed() })
    }

    /// Seed this context so that entering it runs `trampoline` on `stack`,
    /// with the timer signals deliverable.
    ///
    /// Spawning happens inside a masked critical section, but the thread's
    /// first quantum must start with preemption enabled, so the saved mask
    /// is cleared rather than inherited.
    pub fn seed(&mut self, stack: &mut [u8], trampoline: Trampoline) -> io::Result<()> {
        unsafe {
            if libc::getcontext(&mut self.0) < 0 {
                return Err(io::Error::last_os_error());
            }
            self.0.uc_stack.ss_sp = stack.as_mut_ptr().cast();
            self.0.uc_stack.ss_size = stack.len();
            self.0.uc_stack.ss_flags = 0;
            self.0.uc_link = ptr::null_mut();
            libc::sigemptyset(&mut self.0.uc_sigmask);
            libc::makecontext(&mut self.0, trampoline, 0);
        }
        Ok(())
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut libc::ucontext_t {
        &mut self.0
    }
}

/// Save the current context into `save`, then enter `resume`.
///
/// # Safety
///
/// Both pointers must refer to pinned, live contexts, and `resume` must
/// have been seeded or previously saved. The timer signals must be masked:
/// the save and the queue state it reflects have to change together.
pub unsafe fn swap(save: *mut libc::ucontext_t, resume: *const libc::ucontext_t) {
    if libc::swapcontext(save, resume) < 0 {
        crate::diag::die("failed to switch thread contexts");
    }
}

/// Enter `resume` without saving the current context. Does not return.
///
/// # Safety
///
/// As for [`swap`]. The caller's stack may already be released, so nothing
/// may execute after this call in the current context.
pub unsafe fn enter(resume: *const libc::ucontext_t) -> ! {
    libc::setcontext(resume);
    // setcontext comes back only when the host rejects the context.
    crate::diag::die("failed to enter a thread context");
}
