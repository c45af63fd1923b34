use datafusion::error::DataFusionError;
use thiserror::Error;

/// Unified error type for Floe crates.
///
/// Only structural problems are errors. A predicate that cannot become a
/// lookup key is not reported here; it simply stays in the residual condition.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Planning error: {0}")]
    Plan(String),
    #[error("Unsupported plan shape: {0}")]
    UnsupportedPlanShape(String),
    #[error("{what} index {index} is out of range for a row of {len} fields")]
    IndexOutOfRange { what: &'static str, index: usize, len: usize },
    #[error("Field count mismatch: expected {expected}, found {actual}")]
    FieldCountMismatch { expected: usize, actual: usize },
    #[error("Malformed expression: {0}")]
    MalformedExpression(String),
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("Column '{column}' not found in table '{table}'")]
    UnknownColumn { table: String, column: String },
    #[error("Table '{0}' does not support lookup access")]
    LookupNotSupported(String),
    #[error("Invalid lookup hint: {0}")]
    InvalidHint(String),
    #[error("Failed to load configuration")]
    Config(#[from] config::ConfigError),
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] DataFusionError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn plan(msg: impl Into<String>) -> Self {
        Error::Plan(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedExpression(msg.into())
    }
}
