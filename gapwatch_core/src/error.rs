use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GapwatchError {
    #[error("outcome {0} is outside 0..=36")]
    OutcomeOutOfRange(i64),

    #[error("unknown tracker: {0}")]
    UnknownTracker(String),

    #[error("tracker must contain at least one number")]
    EmptyTracker,

    #[error("threshold {0} must be finite and non-negative")]
    InvalidThreshold(f64),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("import rejected at index {index}: {value} is outside 0..=36")]
    Import { index: usize, value: i64 },
}

pub type Result<T> = std::result::Result<T, GapwatchError>;
