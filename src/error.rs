use std::{fmt, io};

/// Error kinds raised by the lock manager, buffer pool and their
/// external collaborators.
#[derive(Debug)]
pub enum SmallError {
    /// The lock manager could not grant a lock before its timeout elapsed.
    /// Callers must abort the owning transaction.
    TransactionAborted,
    /// A storage-layer invariant was violated (e.g. every page in the
    /// cache is dirty and none can be evicted).
    DbException(String),
    /// An I/O failure surfaced by a `PageStore` implementation.
    IoException(io::Error),
}

impl SmallError {
    pub fn db(msg: impl Into<String>) -> Self {
        SmallError::DbException(msg.into())
    }
}

impl fmt::Display for SmallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SmallError::TransactionAborted => {
                write!(f, "transaction aborted: lock acquisition timed out")
            }
            SmallError::DbException(msg) => write!(f, "{}", msg),
            SmallError::IoException(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SmallError {}

impl From<io::Error> for SmallError {
    fn from(e: io::Error) -> Self {
        SmallError::IoException(e)
    }
}

pub type SmallResult<T> = Result<T, SmallError>;
