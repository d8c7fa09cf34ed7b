//! Common functions used across test cases.

pub mod database;

pub use database::TestDatabase;

/// Route `tracing` output through `env_logger` so `RUST_LOG` shows it in test runs.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
