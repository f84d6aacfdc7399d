use crate::LockLevel;

/// Unified error type for docket's topic model and database.
#[derive(Debug, thiserror::Error)]
pub enum DocketError {
    /// A topic handed to an operation is missing required fields or has fields
    /// set that must not be.
    #[error("{operation}: {}", problems.join(", "))]
    Validation {
        operation: &'static str,
        problems: Vec<String>,
    },

    #[error("{operation} requires lock level {required} but the accessor holds {held}")]
    LockViolation {
        operation: &'static str,
        required: LockLevel,
        held: LockLevel,
    },

    /// SQLite returned something outside the results expected for the step.
    #[error("{operation} Unexpected SQLite result (code {code:?}): {message}")]
    UnexpectedResult {
        operation: &'static str,
        code: Option<i32>,
        message: String,
    },

    #[error("Transaction error: {0}")]
    Transaction(&'static str),

    /// Every positive ID of the named kind is in use.
    #[error("No free {0} IDs left")]
    IdsExhausted(&'static str),

    #[error("Invalid access level: {0}")]
    InvalidAccessLevel(i64),

    #[error("Invalid number set: {0}")]
    InvalidNumberSet(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocketError {
    /// Shorthand for a validation failure with a single problem.
    pub fn validation(operation: &'static str, problem: impl Into<String>) -> Self {
        Self::Validation {
            operation,
            problems: vec![problem.into()],
        }
    }
}
