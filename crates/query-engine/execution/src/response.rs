//! The uniform result of a request.

use serde::Serialize;

use crate::pool::PoolStats;
use crate::rows::RowMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExecutionResult {
    /// Outcome of an insert or a mutation.
    Message(String),
    /// Rows returned by a query.
    Rows(Vec<RowMap>),
    /// Pool statistics.
    Stats(PoolStats),
    /// One result per statement, in chain order.
    Chain(Vec<ExecutionResult>),
}

impl ExecutionResult {
    /// A single statement yields its own result; a longer chain yields the sequence.
    pub fn from_chain(mut results: Vec<ExecutionResult>) -> Self {
        if results.len() == 1 {
            if let Some(result) = results.pop() {
                return result;
            }
        }
        ExecutionResult::Chain(results)
    }

    pub fn inserted(rows_affected: u64, last_insert_id: i64) -> Self {
        ExecutionResult::Message(format!(
            "{} inserted, last inserted ID: {last_insert_id}",
            row_count(rows_affected)
        ))
    }

    pub fn affected(rows_affected: u64) -> Self {
        ExecutionResult::Message(format!("{} affected", row_count(rows_affected)))
    }
}

fn row_count(count: u64) -> String {
    if count == 1 {
        format!("{count} row")
    } else {
        format!("{count} rows")
    }
}
