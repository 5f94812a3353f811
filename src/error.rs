use thiserror::Error;

/// Strict validation failures for a timeout expression
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("timeout expression must end with m, h, d or c (only 1c is allowed): {expr:?}")]
    InvalidUnit { expr: String },

    #[error("timeout value must be an integer: {expr:?}")]
    NotAnInteger { expr: String },

    #[error("timeout value must be greater than 0: {expr:?}")]
    NotPositive { expr: String },

    #[error("timeout value is too large: {expr:?}")]
    Overflow { expr: String },
}

/// Countdown errors
#[derive(Error, Debug)]
pub enum CountdownError {
    #[error("countdown must be started from within a tokio runtime")]
    NoRuntime,

    #[error("countdown needs a tokio runtime with the time driver enabled")]
    NoTimeDriver,

    #[error("unrecognized creation time: {input:?}")]
    InvalidCreationTime { input: String },
}

pub type Result<T> = std::result::Result<T, CountdownError>;
