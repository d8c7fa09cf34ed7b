//! Statement execution against a SQLite connection pool.
//!
//! A request's statement chain runs either on a single pooled connection or inside one
//! serializable transaction. Every suspension point is bounded by the request's `Deadline`.

pub mod deadline;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod query;
pub mod response;
pub mod rows;
pub mod transaction;

pub use deadline::Deadline;
pub use error::Error;
pub use pool::{ConnectionPool, PoolStats};
pub use response::ExecutionResult;
