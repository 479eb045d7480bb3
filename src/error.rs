//! Recoverable library errors.
//!
//! Anything a caller can cause and recover from surfaces as an [`Error`];
//! the public entry points report it on the diagnostic stream and return
//! `-1`. Host failures (signal installation, timer arming, stack setup) are
//! not representable here: they are fatal and terminate the process.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// `init` was called with a zero or negative quantum length.
    #[error("quantum_usecs must be positive")]
    NonPositiveQuantum,

    /// An entry point other than `init` ran before the library was set up.
    #[error("the thread library is not initialized")]
    NotInitialized,

    /// `init` was called a second time.
    #[error("the thread library is already initialized")]
    AlreadyInitialized,

    /// The tid names no live thread.
    #[error("thread {0} does not exist")]
    NoSuchThread(i64),

    /// Spawning would exceed the thread table's capacity.
    #[error("cannot hold more than {0} concurrent threads")]
    TooManyThreads(usize),

    /// The main thread cannot be blocked.
    #[error("blocking the main thread is forbidden")]
    BlockMain,

    /// The main thread cannot sleep.
    #[error("the main thread cannot sleep")]
    SleepMain,
}

pub type Result<T> = std::result::Result<T, Error>;
