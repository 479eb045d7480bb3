//! Timer-signal masking and handler installation.
//!
//! Every public entry point runs with both timer signals masked, so the
//! queue mutations, timer re-arms, and the context switch inside it act as
//! one atomic step. The handlers are installed with the same mask, so they
//! never interleave with each other either.

use std::io;
use std::mem;
use std::ptr;

use libc::{c_int, SIGALRM, SIGVTALRM};

/// The signals the library owns: quantum expiry and sleep expiry.
pub const BLOCKED_SIGNALS: [c_int; 2] = [SIGVTALRM, SIGALRM];

fn blocked_set() -> libc::sigset_t {
    unsafe {
        let mut set = mem::zeroed();
        libc::sigemptyset(&mut set);
        for sig in BLOCKED_SIGNALS {
            libc::sigaddset(&mut set, sig);
        }
        set
    }
}

/// Masks the timer signals on construction and unmasks on drop, so every
/// exit path of an entry point restores delivery, the post-switch return
/// included.
pub struct MaskGuard(());

impl MaskGuard {
    pub fn new() -> Self {
        let set = blocked_set();
        if unsafe { libc::sigprocmask(libc::SIG_BLOCK, &set, ptr::null_mut()) } < 0 {
            crate::diag::die("failed to mask the timer signals");
        }
        Self(())
    }
}

impl Drop for MaskGuard {
    fn drop(&mut self) {
        let set = blocked_set();
        if unsafe { libc::sigprocmask(libc::SIG_UNBLOCK, &set, ptr::null_mut()) } < 0 {
            crate::diag::die("failed to unmask the timer signals");
        }
    }
}

/// Install `handler` for `signal`, with both timer signals masked for the
/// handler's duration.
pub fn install_handler(signal: c_int, handler: extern "C" fn(c_int)) -> io::Result<()> {
    let mut action: libc::sigaction = unsafe { mem::zeroed() };
    action.sa_sigaction = handler as usize;
    action.sa_mask = blocked_set();
    action.sa_flags = 0;
    if unsafe { libc::sigaction(signal, &action, ptr::null_mut()) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
