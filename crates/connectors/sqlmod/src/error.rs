//! Errors reported back through the transport.

use thiserror::Error;

use query_engine_request::DecodeError;
use sqlmod_configuration::ConfigurationError;

/// The class of a request failure, as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself could not be understood.
    BadData,
    /// The request was understood but could not be carried out.
    Operation,
}

/// Applying a configuration failed. The previously configured pool, if any, stays in use.
#[derive(Debug, Error)]
pub enum ConfigureError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("unsupported data source scheme `{0}`; expected a sqlite URL")]
    UnsupportedDataSource(String),
    #[error("malformed data source: {0}")]
    MalformedDataSource(sqlx::Error),
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    BadData(#[from] DecodeError),
    #[error("database is not connected; please check the module configuration")]
    NotConnected,
    #[error(transparent)]
    Execution(#[from] query_engine_execution::Error),
}

impl RequestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestError::BadData(_) => ErrorKind::BadData,
            RequestError::NotConnected | RequestError::Execution(_) => ErrorKind::Operation,
        }
    }
}
