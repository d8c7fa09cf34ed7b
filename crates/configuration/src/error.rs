//! Errors that can be thrown when processing configuration.

use thiserror::Error;

use crate::environment;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to unpack configuration: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("data source descriptor `dsn` must not be empty")]
    EmptyConnectionUri,
    #[error("unable to resolve `dsn`: {0}")]
    MissingEnvironmentVariable(#[from] environment::Error),
}
