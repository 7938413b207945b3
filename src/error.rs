use thiserror::Error;

use crate::value::Value;

/// Errors that abandon evaluation of the current top-level form.
///
/// `Signal` is the user-level, recoverable tier: anything a user
/// program can cause. The payload is the `(symbol . data)` cons; the
/// driver renders it with `stringify` and clears the channel. Host
/// write failures are the only other recoverable case.
#[derive(Debug, Clone, Error)]
pub enum LispError {
    #[error("uncaught signal")]
    Signal(Value),

    #[error("I/O error: {0}")]
    Io(String),
}

pub type LispResult<T> = Result<T, LispError>;

/// Invariant violation that only buggy interpreter code can cause:
/// render to the error stream, then abort the host process.
pub fn fatal(msg: &str) -> ! {
    eprintln!("fatal: {}", msg);
    std::process::abort()
}
