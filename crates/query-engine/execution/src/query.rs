//! Execute a statement chain against the database.

use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnection};
use sqlx::{Executor, Statement as _};
use tracing::{info_span, Instrument};

use query_engine_request::{Param, Statement, StatementKind};

use crate::deadline::Deadline;
use crate::error::Error;
use crate::pool::ConnectionPool;
use crate::response::ExecutionResult;
use crate::rows;

/// Execute a statement and its continuations on a single pooled connection, outside of any
/// transaction.
pub async fn execute(
    pool: &ConnectionPool,
    statement: &Statement,
    deadline: &Deadline,
) -> Result<ExecutionResult, Error> {
    let mut connection = pool.acquire(deadline).await?;
    let result = execute_chain(&mut connection, statement, deadline).await;
    pool.release(connection);
    result
}

/// Execute every statement of the chain in order, stopping at the first failure.
pub async fn execute_chain(
    connection: &mut SqliteConnection,
    statement: &Statement,
    deadline: &Deadline,
) -> Result<ExecutionResult, Error> {
    let mut results = Vec::new();
    for (position, step) in statement.chain().enumerate() {
        let result = execute_statement(connection, step, deadline)
            .instrument(info_span!(
                "Execute statement",
                kind = %step.kind,
                position,
            ))
            .await?;
        results.push(result);
    }
    Ok(ExecutionResult::from_chain(results))
}

async fn execute_statement(
    connection: &mut SqliteConnection,
    statement: &Statement,
    deadline: &Deadline,
) -> Result<ExecutionResult, Error> {
    let prepared = deadline
        .bound((&mut *connection).prepare(statement.query.as_str()))
        .await?
        .map_err(|err| deadline.label(err, Error::Prepare))?;
    let query = bind_params(prepared.query(), &statement.params);

    match statement.kind {
        StatementKind::QueryRows => {
            let rows = deadline
                .bound(query.fetch_all(&mut *connection))
                .await?
                .map_err(|err| deadline.label(err, Error::Query))?;
            tracing::debug!(rows = rows.len(), "fetched rows");
            Ok(ExecutionResult::Rows(rows::rows_to_maps(&rows)?))
        }
        StatementKind::InsertRows => {
            let done = deadline
                .bound(query.execute(&mut *connection))
                .await?
                .map_err(|err| deadline.label(err, Error::Query))?;
            Ok(ExecutionResult::inserted(
                done.rows_affected(),
                done.last_insert_rowid(),
            ))
        }
        StatementKind::AffectedRows => {
            let done = deadline
                .bound(query.execute(&mut *connection))
                .await?
                .map_err(|err| deadline.label(err, Error::Query))?;
            Ok(ExecutionResult::affected(done.rows_affected()))
        }
    }
}

/// Bind parameters to a prepared query, in order.
fn bind_params<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[Param],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    params.iter().fold(query, |query, param| match param {
        Param::Null => query.bind(None::<String>),
        Param::Bool(value) => query.bind(*value),
        Param::Integer(value) => query.bind(*value),
        Param::Float(value) => query.bind(*value),
        Param::String(value) => query.bind(value.clone()),
        Param::Bytes(value) => query.bind(value.clone()),
    })
}
