//! Run a statement chain inside a single serializable transaction.

use std::future::Future;

use sqlx::Connection;
use tracing::{info_span, Instrument};

use query_engine_request::Statement;

use crate::deadline::Deadline;
use crate::error::Error;
use crate::pool::ConnectionPool;
use crate::query;
use crate::response::ExecutionResult;

/// SQLite transactions are serializable unless shared-cache reads are allowed to be dirty.
const SERIALIZABLE: &str = "PRAGMA read_uncommitted = false";

/// Execute the chain atomically. Either every statement commits or none does.
pub async fn execute_in_transaction(
    pool: &ConnectionPool,
    statement: &Statement,
    deadline: &Deadline,
) -> Result<ExecutionResult, Error> {
    let mut connection = pool.acquire(deadline).await?;
    let result = run(&mut connection, statement, deadline)
        .instrument(info_span!("Transaction"))
        .await;
    pool.release(connection);
    result
}

async fn run(
    connection: &mut sqlx::SqliteConnection,
    statement: &Statement,
    deadline: &Deadline,
) -> Result<ExecutionResult, Error> {
    let mut tx = in_phase(deadline, connection.begin(), Error::Begin).await?;

    // The transaction is rolled back when `tx` is dropped without a commit.
    let outcome = async {
        deadline
            .bound(sqlx::query(SERIALIZABLE).execute(&mut *tx))
            .await?
            .map_err(|err| deadline.label(err, Error::Query))?;
        query::execute_chain(&mut tx, statement, deadline).await
    }
    .await;

    match outcome {
        Ok(result) => {
            in_phase(deadline, tx.commit(), Error::Commit).await?;
            Ok(result)
        }
        Err(err) => {
            // Past the deadline the statement has been interrupted and the rollback queued by
            // dropping `tx` runs next on the connection.
            if !err.is_deadline_exceeded() {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "failed to roll back transaction");
                }
            }
            Err(Error::Transaction(Box::new(err)))
        }
    }
}

/// Await a transaction control call, labelling its failure (deadline included) with `phase`.
async fn in_phase<T>(
    deadline: &Deadline,
    future: impl Future<Output = Result<T, sqlx::Error>>,
    phase: fn(Box<Error>) -> Error,
) -> Result<T, Error> {
    match deadline.bound(future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(phase(Box::new(deadline.label(err, Error::Database)))),
        Err(err) => Err(phase(Box::new(err))),
    }
}
