//! Errors raised while decoding a request.

use thiserror::Error;

/// The request payload does not describe exactly one runnable action.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to unpack request: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("request requires one of {expected}")]
    MissingAction { expected: String },
    #[error("request requires one of {expected}, not more than one")]
    MultipleActions { expected: String },
    #[error("`{field}` requires a non-empty `query`")]
    EmptyQuery { field: &'static str },
}
