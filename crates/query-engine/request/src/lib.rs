//! The request model: which database operation to run, with what parameters, and what follows it.

pub mod action;
pub mod decode;
pub mod error;

pub use action::{Action, ActionRequest, Param, Statement, StatementKind, DEFAULT_TIMEOUT};
pub use decode::decode_request;
pub use error::DecodeError;
