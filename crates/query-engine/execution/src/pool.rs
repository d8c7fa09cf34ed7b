//! The connection pool used to run requests, and its statistics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool};
use sqlx::Connection;

use crate::deadline::Deadline;
use crate::error::Error;

/// Virtual machine instructions SQLite runs between deadline checks.
const DEADLINE_CHECK_INTERVAL: i32 = 1000;

/// A snapshot of the pool's occupancy and wait metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub max_open_connections: u32,
    pub open_connections: u32,
    pub in_use: u32,
    pub idle: u32,
    pub wait_count: u64,
    pub wait_duration_ms: u64,
    /// Connections closed because the idle limit was already reached.
    pub max_idle_closed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    wait_count: AtomicU64,
    wait_micros: AtomicU64,
    max_idle_closed: AtomicU64,
}

impl Counters {
    fn record_wait(&self, waited: Duration) {
        let micros = u64::try_from(waited.as_micros()).unwrap_or(u64::MAX);
        self.wait_count.fetch_add(1, Ordering::Relaxed);
        self.wait_micros.fetch_add(micros, Ordering::Relaxed);
    }
}

/// A sqlx pool together with the limits sqlx does not enforce itself.
///
/// Cloning is cheap; clones share the same connections and statistics.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    pool: SqlitePool,
    max_idle_connections: Option<u32>,
    counters: Arc<Counters>,
}

impl ConnectionPool {
    pub fn new(pool: SqlitePool, max_idle_connections: Option<u32>) -> Self {
        Self {
            pool,
            max_idle_connections,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn inner(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check a connection out of the pool. Hand it back with `release`.
    ///
    /// Any statement run on the connection is interrupted by SQLite once `deadline` passes, so a
    /// request that times out does not leave its connection busy or its transaction open.
    pub async fn acquire(&self, deadline: &Deadline) -> Result<PoolConnection<Sqlite>, Error> {
        let saturated = self.pool.num_idle() == 0
            && self.pool.size() >= self.pool.options().get_max_connections();
        let started = Instant::now();

        let mut connection = deadline
            .bound(self.pool.acquire())
            .await?
            .map_err(Error::Acquire)?;

        if saturated {
            self.counters.record_wait(started.elapsed());
        }

        deadline
            .bound(interrupt_after(&mut connection, deadline))
            .await?
            .map_err(Error::Acquire)?;
        Ok(connection)
    }

    /// Return a connection. If the pool already keeps as many idle connections as allowed, the
    /// connection is closed instead.
    pub fn release(&self, connection: PoolConnection<Sqlite>) {
        match self.max_idle_connections {
            Some(max_idle) if self.pool.num_idle() >= max_idle as usize => {
                let connection = connection.detach();
                self.counters.max_idle_closed.fetch_add(1, Ordering::Relaxed);
                tokio::spawn(async move {
                    if let Err(err) = connection.close().await {
                        tracing::warn!(error = %err, "failed to close surplus idle connection");
                    }
                });
            }
            _ => drop(connection),
        }
    }

    /// Check that the database can be reached.
    pub async fn ping(&self, deadline: &Deadline) -> Result<(), Error> {
        let mut connection = self.acquire(deadline).await?;
        let result = deadline.bound(connection.ping()).await;
        self.release(connection);
        result?.map_err(Error::Ping)
    }

    pub fn stats(&self) -> PoolStats {
        let open_connections = self.pool.size();
        let idle = u32::try_from(self.pool.num_idle()).unwrap_or(u32::MAX);
        let wait_micros = self.counters.wait_micros.load(Ordering::Relaxed);
        PoolStats {
            max_open_connections: self.pool.options().get_max_connections(),
            open_connections,
            in_use: open_connections.saturating_sub(idle),
            idle,
            wait_count: self.counters.wait_count.load(Ordering::Relaxed),
            wait_duration_ms: wait_micros / 1000,
            max_idle_closed: self.counters.max_idle_closed.load(Ordering::Relaxed),
        }
    }

    /// Close every connection. Waits for checked out connections to come back.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// Install a progress handler that aborts the running statement once the deadline has passed.
///
/// The handler replaces whatever an earlier request left on the connection.
async fn interrupt_after(
    connection: &mut SqliteConnection,
    deadline: &Deadline,
) -> Result<(), sqlx::Error> {
    let expires_at = deadline.expires_at();
    let mut handle = connection.lock_handle().await?;
    handle.set_progress_handler(DEADLINE_CHECK_INTERVAL, move || {
        Instant::now() < expires_at
    });
    Ok(())
}
