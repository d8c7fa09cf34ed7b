//! The module's entry points, driven by a host transport.
//!
//! The transport delivers configuration and request payloads and carries exactly one answer back
//! for each of them.

use std::sync::Arc;

use tracing::{info_span, Instrument};

use query_engine_execution::{query, transaction, Deadline, ExecutionResult};
use query_engine_request::{decode_request, Action};
use sqlmod_configuration::environment::Environment;
use sqlmod_configuration::{make_runtime_configuration, parse_configuration};

use crate::error::{ConfigureError, ErrorKind, RequestError};
use crate::health;
use crate::state::{self, InitializationError, State};

/// Identifies a request so its answer can be matched to it.
pub type RequestId = u64;

/// Outbound half of the host protocol.
pub trait Transport: Send + Sync + 'static {
    fn send_result(&self, id: RequestId, result: ExecutionResult);
    fn send_error(&self, id: RequestId, kind: ErrorKind, message: String);
    fn send_config_ok(&self);
    fn send_config_err(&self, message: String);
}

pub struct SqlModule<T, Env> {
    transport: Arc<T>,
    environment: Arc<Env>,
    state: Arc<State>,
}

impl<T, Env> Clone for SqlModule<T, Env> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            environment: Arc::clone(&self.environment),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Transport, Env: Environment + Send + Sync + 'static> SqlModule<T, Env> {
    /// Set up the module's state and register its metrics. No pool exists until the first
    /// configuration arrives.
    pub fn new(
        transport: T,
        environment: Env,
        metrics_registry: &mut prometheus::Registry,
    ) -> Result<Self, InitializationError> {
        let state = state::create_state(metrics_registry).map_err(|err| {
            tracing::error!(
                meta.signal_type = "log",
                event.domain = "sqlmod",
                event.name = "Initialization error",
                name = "Initialization error",
                body = %err,
                error = true,
            );
            err
        })?;

        Ok(Self {
            transport: Arc::new(transport),
            environment: Arc::new(environment),
            state: Arc::new(state),
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Apply a configuration payload and acknowledge it.
    pub async fn on_config(&self, raw: &[u8]) {
        match self.configure(raw).instrument(info_span!("Configure")).await {
            Ok(()) => self.transport.send_config_ok(),
            Err(err) => {
                tracing::error!(
                    meta.signal_type = "log",
                    event.domain = "sqlmod",
                    event.name = "Configuration error",
                    name = "Configuration error",
                    body = %err,
                    error = true,
                );
                self.transport.send_config_err(err.to_string());
            }
        }
    }

    async fn configure(&self, raw: &[u8]) -> Result<(), ConfigureError> {
        let config = parse_configuration(raw)?;
        let settings = make_runtime_configuration(&config, self.environment.as_ref())?;
        self.state.pools.configure(&settings).await?;
        tracing::info!(
            max_connections = ?settings.max_connections,
            max_idle_connections = ?settings.max_idle_connections,
            "connection pool configured"
        );
        Ok(())
    }

    /// Handle a request payload and send its answer.
    pub async fn on_request(&self, id: RequestId, raw: &[u8]) {
        let outcome = self
            .handle(raw)
            .instrument(info_span!("Handle request", request_id = id))
            .await;

        match outcome {
            Ok(result) => {
                self.state.metrics.record_success();
                self.transport.send_result(id, result);
            }
            Err(err) => {
                self.state.metrics.record_failure();
                tracing::error!(
                    meta.signal_type = "log",
                    event.domain = "sqlmod",
                    event.name = "Request error",
                    name = "Request error",
                    request_id = id,
                    body = %err,
                    error = true,
                );
                self.transport.send_error(id, err.kind(), err.to_string());
            }
        }
    }

    /// Handle a request on its own task, so that several requests can use the pool at once.
    pub fn spawn_request(&self, id: RequestId, raw: Vec<u8>) -> tokio::task::JoinHandle<()> {
        let module = self.clone();
        tokio::spawn(async move { module.on_request(id, &raw).await })
    }

    /// Decode, validate and execute a request.
    ///
    /// Nothing touches the database until the request has been fully validated.
    pub async fn handle(&self, raw: &[u8]) -> Result<ExecutionResult, RequestError> {
        let request = decode_request(raw)?;
        let deadline = Deadline::after(request.timeout);

        let pool = self
            .state
            .pools
            .snapshot()
            .await
            .ok_or(RequestError::NotConnected)?;

        health::check_connection(&pool, &deadline)
            .await
            .map_err(|err| {
                if err.is_deadline_exceeded() {
                    RequestError::Execution(err)
                } else {
                    tracing::warn!(error = %err, "liveness check failed");
                    RequestError::NotConnected
                }
            })?;

        let result = match request.action {
            Action::PoolStats => {
                let stats = pool.stats();
                self.state.metrics.record_pool_stats(&stats);
                ExecutionResult::Stats(stats)
            }
            Action::Statement(statement) if request.transaction => {
                transaction::execute_in_transaction(&pool, &statement, &deadline).await?
            }
            Action::Statement(statement) => query::execute(&pool, &statement, &deadline).await?,
        };
        Ok(result)
    }

    /// Refresh the pool gauges from the current pool.
    pub async fn fetch_metrics(&self) {
        if let Some(pool) = self.state.pools.snapshot().await {
            self.state.metrics.record_pool_stats(&pool.stats());
        }
    }

    /// Close the current pool. Requests that arrive afterwards are answered as not connected.
    pub async fn shutdown(&self) {
        self.state
            .pools
            .close()
            .instrument(info_span!("Shutdown"))
            .await;
    }
}
