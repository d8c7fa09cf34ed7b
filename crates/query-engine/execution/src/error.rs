//! Errors for query execution.

use std::time::Duration;

use sqlx::error::BoxDynError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to acquire a connection: {0}")]
    Acquire(sqlx::Error),
    #[error("Failed to ping database: {0}")]
    Ping(sqlx::Error),
    #[error("Failed to prepare query: {0}")]
    Prepare(sqlx::Error),
    #[error("Query has failed: {0}")]
    Query(sqlx::Error),
    #[error("Failed to scan rows: {0}")]
    Scan(BoxDynError),
    #[error("Failed to start transaction: {0}")]
    Begin(Box<Error>),
    #[error("Failed to execute transaction: {0}")]
    Transaction(Box<Error>),
    #[error("Failed to commit transaction: {0}")]
    Commit(Box<Error>),
    #[error(transparent)]
    Database(sqlx::Error),
    #[error("deadline of {}s exceeded", .0.as_secs_f64())]
    DeadlineExceeded(Duration),
}

impl Error {
    pub fn is_deadline_exceeded(&self) -> bool {
        match self {
            Error::DeadlineExceeded(_) => true,
            Error::Begin(inner) | Error::Transaction(inner) | Error::Commit(inner) => {
                inner.is_deadline_exceeded()
            }
            _ => false,
        }
    }
}
