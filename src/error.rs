use std::{error::Error, fmt};

use backtrace::Backtrace;
use log::error;

/// The failure classes the storage core can report.
///
/// Callers are expected to branch on the kind: `TransactionAborted` means
/// "roll the transaction back and retry from scratch", `ResourceExhausted`
/// means "retry after another transaction completes", and `InvalidArgument`
/// is a caller bug and must not be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A lock could not be acquired within the deadlock timeout, or the
    /// transaction lost an upgrade race.
    TransactionAborted,

    /// The buffer pool is full and every resident page is dirty.
    ResourceExhausted,

    /// Out-of-range page number, schema mismatch, unknown table, etc.
    InvalidArgument,

    /// An underlying read/write failed. The cached state of the affected
    /// page is unchanged, so the operation is safe to retry.
    Io,
}

#[derive(Debug)]
pub struct SmallError {
    kind: ErrorKind,
    details: String,
}

impl SmallError {
    pub fn new(kind: ErrorKind, msg: &str) -> SmallError {
        SmallError {
            kind,
            details: msg.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn show_backtrace(&self) {
        let bt = Backtrace::new();
        error!("error: [{}], backtrace: {:?}", self, bt);
    }
}

impl fmt::Display for SmallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.details)
    }
}

impl Error for SmallError {}

impl From<std::io::Error> for SmallError {
    fn from(err: std::io::Error) -> Self {
        SmallError::new(ErrorKind::Io, &err.to_string())
    }
}
