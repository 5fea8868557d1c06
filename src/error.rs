use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Enum for the analyzer's boundary errors. The grouping engine itself is
/// total and never produces one of these.
#[derive(Debug, Clone, Error, Eq, PartialEq, Serialize, Deserialize)]
pub enum AnalyzerError {
    #[error("Invalid configuration. {0}")]
    InvalidConfiguration(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to execute query: {0}")]
    QueryExecutionError(String),

    #[error("Cannot deserialize. {0}")]
    CannotDeserialize(String),

    #[error("Failed to serve: {0}")]
    ServeError(String),

    #[error("{0}")]
    Generic(String),
}

impl From<regex::Error> for AnalyzerError {
    fn from(err: regex::Error) -> Self {
        AnalyzerError::InvalidPattern(err.to_string())
    }
}

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;
