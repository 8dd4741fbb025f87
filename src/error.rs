use std::fmt;
use std::io;

use backtrace::Backtrace;

/// Symbolic error kinds surfaced by every public engine operation.
///
/// `IllegalState` additionally carries a captured backtrace, since it
/// signals a programmer error (a leaked fix, a rollback with a pinned
/// frame) rather than an expected runtime condition, and is the one
/// variant worth diagnosing after the fact.
#[derive(Debug)]
pub enum EngineError {
    InvalidArgument(String),
    OutOfBounds(String),
    CorruptedFile(String),
    IoError(String),
    IllegalState(String, Backtrace),
    RecordLocked(i64),
}

impl EngineError {
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        EngineError::IllegalState(msg.into(), Backtrace::new())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        EngineError::InvalidArgument(msg.into())
    }

    pub fn out_of_bounds(msg: impl Into<String>) -> Self {
        EngineError::OutOfBounds(msg.into())
    }

    pub fn corrupted_file(msg: impl Into<String>) -> Self {
        EngineError::CorruptedFile(msg.into())
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            EngineError::OutOfBounds(msg) => write!(f, "out of bounds: {}", msg),
            EngineError::CorruptedFile(msg) => write!(f, "corrupted file: {}", msg),
            EngineError::IoError(msg) => write!(f, "io error: {}", msg),
            EngineError::IllegalState(msg, bt) => {
                write!(f, "illegal state: {}\n{:?}", msg, bt)
            }
            EngineError::RecordLocked(record_id) => {
                write!(f, "record {} is locked by the current transaction", record_id)
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<io::Error> for EngineError {
    fn from(e: io::Error) -> Self {
        EngineError::IoError(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
