//! An SQL module: applies connection pool configuration and answers database requests delivered
//! by a host transport.

pub mod connector;
pub mod error;
pub mod health;
pub mod state;

pub use connector::{RequestId, SqlModule, Transport};
pub use error::{ConfigureError, ErrorKind, RequestError};
