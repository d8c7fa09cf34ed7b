//! What a request asks the engine to do.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeout applied when a request does not carry one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A fully validated request.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub action: Action,
    /// Run the statement chain inside a single transaction.
    pub transaction: bool,
    /// How long the database work for this request may take.
    pub timeout: Duration,
}

/// The single operation selected by a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Run a statement and every continuation chained to it.
    Statement(Statement),
    /// Report connection pool statistics. Never chained.
    PoolStats,
}

/// How a statement is executed and how its outcome is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Read rows and return them as column name to value maps.
    QueryRows,
    /// Write and report the affected row count and last inserted id.
    InsertRows,
    /// Write and report the affected row count.
    AffectedRows,
}

impl StatementKind {
    /// The request field this kind is selected with.
    pub fn field_name(self) -> &'static str {
        match self {
            StatementKind::QueryRows => "query_rows",
            StatementKind::InsertRows => "insert_rows",
            StatementKind::AffectedRows => "affected_rows",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// One statement of a chain, with the statement that follows it (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub query: String,
    pub params: Vec<Param>,
    pub next: Option<Box<Statement>>,
}

impl Statement {
    pub fn new(kind: StatementKind, query: impl Into<String>) -> Self {
        Self {
            kind,
            query: query.into(),
            params: Vec::new(),
            next: None,
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params = params.into_iter().collect();
        self
    }

    /// Append `next` to the end of this chain.
    #[must_use]
    pub fn then(mut self, next: Statement) -> Self {
        let tail = match self.next.take() {
            Some(current) => (*current).then(next),
            None => next,
        };
        self.next = Some(Box::new(tail));
        self
    }

    /// This statement followed by its continuations, in execution order.
    pub fn chain(&self) -> impl Iterator<Item = &Statement> {
        std::iter::successors(Some(self), |statement| statement.next.as_deref())
    }
}

/// A bind parameter.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Param {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Integer(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::String(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::String(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_is_in_order() {
        let statement = Statement::new(StatementKind::InsertRows, "INSERT 1")
            .then(Statement::new(StatementKind::AffectedRows, "UPDATE 2"))
            .then(Statement::new(StatementKind::QueryRows, "SELECT 3"));

        let queries: Vec<&str> = statement.chain().map(|s| s.query.as_str()).collect();
        assert_eq!(queries, vec!["INSERT 1", "UPDATE 2", "SELECT 3"]);
    }

    #[test]
    fn params_from_json_scalars() {
        let params: Vec<Param> =
            serde_json::from_str(r#"[null, true, 4, 2.5, "Lily", [1, 2]]"#).unwrap();
        assert_eq!(
            params,
            vec![
                Param::Null,
                Param::Bool(true),
                Param::Integer(4),
                Param::Float(2.5),
                Param::String("Lily".into()),
                Param::Bytes(vec![1, 2]),
            ]
        );
    }
}
