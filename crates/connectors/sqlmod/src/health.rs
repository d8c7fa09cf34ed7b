//! Liveness check run before every request.

use query_engine_execution::{ConnectionPool, Deadline, Error};

/// Check that the configured database can be reached.
///
/// This opens a connection if the pool holds none, so it is also where an unreachable data source
/// is first noticed.
pub async fn check_connection(pool: &ConnectionPool, deadline: &Deadline) -> Result<(), Error> {
    pool.ping(deadline).await
}
