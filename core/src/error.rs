//! Error type for the `mvkv` core crate.
//!
//! Follows the teacher's hand-rolled style (see `kv::encoding::EncodingError`):
//! a plain enum with manual `Display`/`Error` impls rather than `thiserror`.

use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// A malformed or out-of-sequence protocol exchange.
    Protocol(String),
    /// An I/O failure on a client connection.
    Io(std::io::Error),
    /// The calling transaction has already aborted; the operation has no effect.
    Aborted,
    /// An invariant was violated — a bug, not a client-facing condition.
    Internal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Aborted => write!(f, "transaction aborted"),
            Error::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type CResult<T> = Result<T, Error>;
