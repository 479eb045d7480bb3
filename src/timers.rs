//! The two host interval timers driving the library.
//!
//! The quantum timer counts the process's virtual CPU time and delivers
//! `SIGVTALRM`; the sleep timer counts wall-clock time and delivers
//! `SIGALRM`. All arithmetic is carried out in microseconds end to end.

use std::io;
use std::mem;
use std::ptr;

use libc::c_int;

const USECS_PER_SEC: i64 = 1_000_000;

/// Repeating virtual-time timer; expiry preempts the running thread.
pub struct VirtualQuantumTimer {
    quantum_usecs: i64,
}

impl VirtualQuantumTimer {
    pub fn new(quantum_usecs: i64) -> Self {
        Self { quantum_usecs }
    }

    /// Arm (or re-arm) the timer so the next expiry is one full quantum
    /// away. Every switch re-arms, so the thread entering the CPU always
    /// starts a fresh quantum.
    pub fn start(&self) -> io::Result<()> {
        arm(libc::ITIMER_VIRTUAL, self.quantum_usecs, self.quantum_usecs)
    }
}

/// One-shot real-time timer; expiry wakes the earliest sleeper. Re-arming
/// cancels the previous shot.
pub struct RealSleepTimer;

impl RealSleepTimer {
    pub fn new() -> Self {
        Self
    }

    pub fn start(&self, usecs_until_fire: i64) -> io::Result<()> {
        // A zero it_value would disarm the timer instead of firing at once.
        arm(libc::ITIMER_REAL, usecs_until_fire.max(1), 0)
    }
}

fn arm(which: c_int, value_us: i64, interval_us: i64) -> io::Result<()> {
    let timer = libc::itimerval {
        it_value: to_timeval(value_us),
        it_interval: to_timeval(interval_us),
    };
    if unsafe { libc::setitimer(which, &timer, ptr::null_mut()) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn to_timeval(us: i64) -> libc::timeval {
    libc::timeval {
        tv_sec: (us / USECS_PER_SEC) as libc::time_t,
        tv_usec: (us % USECS_PER_SEC) as libc::suseconds_t,
    }
}

/// Current wall-clock time in microseconds.
pub fn now_micros() -> i64 {
    let mut tv: libc::timeval = unsafe { mem::zeroed() };
    unsafe {
        libc::gettimeofday(&mut tv, ptr::null_mut());
    }
    tv.tv_sec as i64 * USECS_PER_SEC + tv.tv_usec as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeval_splits_seconds_and_remainder() {
        let tv = to_timeval(2_500_000);
        assert_eq!(tv.tv_sec, 2);
        assert_eq!(tv.tv_usec, 500_000);
    }

    #[test]
    fn timeval_of_a_sub_second_value() {
        let tv = to_timeval(999);
        assert_eq!(tv.tv_sec, 0);
        assert_eq!(tv.tv_usec, 999);
    }

    #[test]
    fn wall_clock_does_not_run_backwards() {
        let first = now_micros();
        let second = now_micros();
        assert!(first > 0);
        assert!(second >= first);
    }
}
