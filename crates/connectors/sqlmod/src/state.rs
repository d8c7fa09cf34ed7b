//! Transient state used by the module.
//!
//! This is initialized on startup. The pool itself only exists once a configuration has been
//! applied, and is replaced wholesale by every later configuration.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info_span;

use query_engine_execution::metrics::Metrics;
use query_engine_execution::ConnectionPool;
use sqlmod_configuration::PoolSettings;

use crate::error::ConfigureError;

const SQLITE_SCHEME: &str = "sqlite";

/// State for our module.
#[derive(Debug)]
pub struct State {
    pub pools: PoolManager,
    pub metrics: Metrics,
}

/// Register metrics and start without a pool.
pub fn create_state(metrics_registry: &mut prometheus::Registry) -> Result<State, InitializationError> {
    let metrics = info_span!("Setup metrics")
        .in_scope(|| Metrics::initialize(metrics_registry))
        .map_err(InitializationError::MetricsError)?;

    Ok(State {
        pools: PoolManager::default(),
        metrics,
    })
}

/// State initialization error.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("error initializing metrics: {0}")]
    MetricsError(prometheus::Error),
}

/// Owns the current pool.
///
/// The lock is only held to read or swap the handle, never while the pool is in use.
#[derive(Debug, Default)]
pub struct PoolManager {
    current: RwLock<Option<ConnectionPool>>,
}

impl PoolManager {
    /// Replace the current pool with one built from `settings`.
    ///
    /// The new pool is built before the lock is taken, so a bad descriptor leaves the current pool
    /// untouched. The replaced pool is closed in the background once its connections come back.
    pub async fn configure(&self, settings: &PoolSettings) -> Result<(), ConfigureError> {
        let pool = create_pool(settings)?;
        let previous = self.current.write().await.replace(pool);

        if let Some(previous) = previous {
            tokio::spawn(async move {
                previous.close().await;
                tracing::debug!("closed replaced connection pool");
            });
        }
        Ok(())
    }

    /// The pool to use for one request, if one is configured.
    pub async fn snapshot(&self) -> Option<ConnectionPool> {
        self.current.read().await.clone()
    }

    /// Drop the current pool and close its connections.
    pub async fn close(&self) {
        let current = self.current.write().await.take();
        if let Some(pool) = current {
            pool.close().await;
        }
    }
}

/// Open a pool lazily. No connection is made until the first acquire.
pub fn create_pool(settings: &PoolSettings) -> Result<ConnectionPool, ConfigureError> {
    let scheme = settings
        .connection_uri
        .split_once(':')
        .map_or("", |(scheme, _)| scheme);
    if scheme != SQLITE_SCHEME {
        return Err(ConfigureError::UnsupportedDataSource(scheme.to_string()));
    }

    let connect_options = SqliteConnectOptions::from_str(&settings.connection_uri)
        .map_err(ConfigureError::MalformedDataSource)?;

    let mut pool_options = SqlitePoolOptions::new();
    if let Some(max_connections) = settings.max_connections {
        pool_options = pool_options.max_connections(max_connections);
    }
    if let Some(max_lifetime) = settings.max_lifetime {
        pool_options = pool_options.max_lifetime(max_lifetime);
    }
    if let Some(idle_timeout) = settings.idle_timeout {
        pool_options = pool_options.idle_timeout(idle_timeout);
    }

    Ok(ConnectionPool::new(
        pool_options.connect_lazy_with(connect_options),
        settings.max_idle_connections,
    ))
}
