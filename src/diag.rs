//! Diagnostic stream and the fatal-error exit path.
//!
//! Recoverable errors are prefixed `thread library error: `; host failures
//! are prefixed `system error: ` and end the process with exit code 1 after
//! releasing everything the library owns.

use std::process;

use crate::error::Error;

const LIB_ERROR_PREFIX: &str = "thread library error: ";
const SYS_ERROR_PREFIX: &str = "system error: ";

/// Report a recoverable library error on the diagnostic stream.
pub(crate) fn lib_error(err: &Error) {
    eprintln!("{LIB_ERROR_PREFIX}{err}");
}

/// Report an unrecoverable host failure and terminate the process.
pub(crate) fn die(msg: &str) -> ! {
    crate::runtime::release();
    eprintln!("{SYS_ERROR_PREFIX}{msg}");
    process::exit(1);
}
