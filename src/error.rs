use rust_decimal::Decimal;
use thiserror::Error;

/// Broad categories callers (and the dispatch layer) branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ArgumentCount,
    NotFound,
    Validation,
    UnknownOperation,
    Conflict,
    Internal,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Incorrect number of arguments for {operation}. Expecting {expected}, got {actual}")]
    ArgumentCount {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Absent and undecodable keys are reported the same way.
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Insufficient {role} balance on {code}: available {available}, required {required}")]
    InsufficientFunds {
        role: &'static str,
        code: String,
        available: Decimal,
        required: Decimal,
    },
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Received unknown function {0} invocation")]
    UnknownOperation(String),
    #[error("Write conflict on key {0}: value changed since it was read")]
    Conflict(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] serde_yaml::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::ArgumentCount { .. } => ErrorKind::ArgumentCount,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::ValidationError(_)
            | LedgerError::InsufficientFunds { .. }
            | LedgerError::InvalidQuery(_) => ErrorKind::Validation,
            LedgerError::UnknownOperation(_) => ErrorKind::UnknownOperation,
            LedgerError::Conflict(_) => ErrorKind::Conflict,
            LedgerError::Serialization(_)
            | LedgerError::IoError(_)
            | LedgerError::CsvError(_)
            | LedgerError::ConfigError(_)
            | LedgerError::InternalError(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        LedgerError::InternalError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
