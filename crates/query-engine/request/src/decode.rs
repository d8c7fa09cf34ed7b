//! Decoding of the request payload.
//!
//! The payload names its action through mutually exclusive fields. They are resolved here, once,
//! into an `Action`; the same selection logic applies to the top level and to every
//! continuation in the chain.

use std::time::Duration;

use serde::Deserialize;

use crate::action::{Action, ActionRequest, Param, Statement, StatementKind, DEFAULT_TIMEOUT};
use crate::error::DecodeError;

const POOL_STATS_FIELD: &str = "get_db_stats";

const STATEMENT_KINDS: [StatementKind; 3] = [
    StatementKind::QueryRows,
    StatementKind::InsertRows,
    StatementKind::AffectedRows,
];

#[derive(Debug, Deserialize)]
struct RawRequest {
    #[serde(flatten)]
    selection: RawSelection,
    #[serde(default)]
    get_db_stats: bool,
    #[serde(default)]
    transaction: bool,
    #[serde(default)]
    timeout: u64,
}

#[derive(Debug, Default, Deserialize)]
struct RawSelection {
    #[serde(default)]
    query_rows: Option<RawStatement>,
    #[serde(default)]
    insert_rows: Option<RawStatement>,
    #[serde(default)]
    affected_rows: Option<RawStatement>,
}

#[derive(Debug, Deserialize)]
struct RawStatement {
    #[serde(default)]
    query: String,
    #[serde(default)]
    params: Vec<Param>,
    #[serde(default)]
    next: Option<Box<RawSelection>>,
}

enum Selected {
    Statement(StatementKind, RawStatement),
    PoolStats,
}

/// Decode and validate a request payload.
pub fn decode_request(raw: &[u8]) -> Result<ActionRequest, DecodeError> {
    let request: RawRequest = serde_json::from_slice(raw)?;

    let mut populated: Vec<Selected> = request
        .selection
        .populated()
        .map(|(kind, statement)| Selected::Statement(kind, statement))
        .collect();
    if request.get_db_stats {
        populated.push(Selected::PoolStats);
    }

    let field_names: Vec<&str> = STATEMENT_KINDS
        .iter()
        .map(|kind| kind.field_name())
        .chain([POOL_STATS_FIELD])
        .collect();

    let action = match exactly_one(populated, &field_names)? {
        Selected::Statement(kind, statement) => Action::Statement(statement.resolve(kind)?),
        Selected::PoolStats => Action::PoolStats,
    };

    let timeout = match request.timeout {
        0 => DEFAULT_TIMEOUT,
        seconds => Duration::from_secs(seconds),
    };

    Ok(ActionRequest {
        action,
        transaction: request.transaction,
        timeout,
    })
}

impl RawSelection {
    fn populated(self) -> impl Iterator<Item = (StatementKind, RawStatement)> {
        [
            (StatementKind::QueryRows, self.query_rows),
            (StatementKind::InsertRows, self.insert_rows),
            (StatementKind::AffectedRows, self.affected_rows),
        ]
        .into_iter()
        .filter_map(|(kind, statement)| statement.map(|statement| (kind, statement)))
    }

    fn resolve(self) -> Result<Statement, DecodeError> {
        let field_names: Vec<&str> = STATEMENT_KINDS
            .iter()
            .map(|kind| kind.field_name())
            .collect();
        let (kind, statement) = exactly_one(self.populated().collect(), &field_names)?;
        statement.resolve(kind)
    }
}

impl RawStatement {
    fn resolve(self, kind: StatementKind) -> Result<Statement, DecodeError> {
        if self.query.trim().is_empty() {
            return Err(DecodeError::EmptyQuery {
                field: kind.field_name(),
            });
        }
        let next = match self.next {
            Some(selection) => Some(Box::new(selection.resolve()?)),
            None => None,
        };
        Ok(Statement {
            kind,
            query: self.query,
            params: self.params,
            next,
        })
    }
}

fn exactly_one<T>(populated: Vec<T>, field_names: &[&str]) -> Result<T, DecodeError> {
    let mut populated = populated.into_iter();
    match (populated.next(), populated.next()) {
        (Some(selected), None) => Ok(selected),
        (None, _) => Err(DecodeError::MissingAction {
            expected: describe(field_names),
        }),
        (Some(_), Some(_)) => Err(DecodeError::MultipleActions {
            expected: describe(field_names),
        }),
    }
}

/// "`a`, `b` or `c`"
fn describe(field_names: &[&str]) -> String {
    let quoted: Vec<String> = field_names.iter().map(|name| format!("`{name}`")).collect();
    match quoted.split_last() {
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} or {last}", rest.join(", ")),
        None => String::new(),
    }
}
