use thiserror::Error;

/// Failure modes of the indicator engine.
///
/// None of these are fatal: a rejected call leaves the caller's state exactly
/// as it was. Insufficient history and degenerate arithmetic are not errors
/// at all; they produce empty output.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid config: {name} - {reason}")]
    InvalidConfig { name: String, reason: String },

    #[error("Out-of-order input: bar open_time {got} is not after last seen {last}")]
    OutOfOrderInput { last: i64, got: i64 },

    #[error("Unknown indicator: {0}")]
    UnknownIndicator(String),

    #[error("State mismatch: {0}")]
    StateMismatch(String),

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl EngineError {
    pub fn invalid_config(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
