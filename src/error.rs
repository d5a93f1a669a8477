//! Errors raised by the sequencer before any work is scheduled.

pub type SequenceResult<T> = Result<T, SequenceError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl SequenceError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
