//! Metrics setup and update for request execution.

use prometheus::core::{AtomicI64, AtomicU64, GenericCounter, GenericGauge};

use crate::pool::PoolStats;

#[derive(Debug, Clone)]
pub struct Metrics {
    request_total: GenericCounter<AtomicU64>,
    request_error_total: GenericCounter<AtomicU64>,
    pool_open_connections: GenericGauge<AtomicI64>,
    pool_in_use_connections: GenericGauge<AtomicI64>,
    pool_idle_connections: GenericGauge<AtomicI64>,
    pool_wait_count: GenericGauge<AtomicI64>,
}

impl Metrics {
    /// Set up counters and gauges used to produce Prometheus metrics
    pub fn initialize(metrics_registry: &mut prometheus::Registry) -> Result<Self, prometheus::Error> {
        let request_total = add_int_counter_metric(
            metrics_registry,
            "sqlmod_request_total",
            "Total successful requests.",
        )?;

        let request_error_total = add_int_counter_metric(
            metrics_registry,
            "sqlmod_request_error_total",
            "Total requests answered with an error.",
        )?;

        let pool_open_connections = add_int_gauge_metric(
            metrics_registry,
            "sqlmod_pool_open_connections",
            "The number of established connections, both in use and idle.",
        )?;

        let pool_in_use_connections = add_int_gauge_metric(
            metrics_registry,
            "sqlmod_pool_in_use_connections",
            "The number of connections currently in use.",
        )?;

        let pool_idle_connections = add_int_gauge_metric(
            metrics_registry,
            "sqlmod_pool_idle_connections",
            "The number of idle connections.",
        )?;

        let pool_wait_count = add_int_gauge_metric(
            metrics_registry,
            "sqlmod_pool_wait_count",
            "The total number of connections waited for.",
        )?;

        Ok(Self {
            request_total,
            request_error_total,
            pool_open_connections,
            pool_in_use_connections,
            pool_idle_connections,
            pool_wait_count,
        })
    }

    pub fn record_success(&self) {
        self.request_total.inc();
    }

    pub fn record_failure(&self) {
        self.request_error_total.inc();
    }

    /// Copy a pool snapshot into the pool gauges.
    pub fn record_pool_stats(&self, stats: &PoolStats) {
        self.pool_open_connections
            .set(i64::from(stats.open_connections));
        self.pool_in_use_connections.set(i64::from(stats.in_use));
        self.pool_idle_connections.set(i64::from(stats.idle));
        self.pool_wait_count
            .set(i64::try_from(stats.wait_count).unwrap_or(i64::MAX));
    }
}

/// Create a new int counter metric and register it with the provided Prometheus Registry
fn add_int_counter_metric(
    metrics_registry: &mut prometheus::Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<GenericCounter<AtomicU64>, prometheus::Error> {
    let int_counter =
        prometheus::IntCounter::with_opts(prometheus::Opts::new(metric_name, metric_description))?;
    metrics_registry.register(Box::new(int_counter.clone()))?;
    Ok(int_counter)
}

/// Create a new int gauge metric and register it with the provided Prometheus Registry
fn add_int_gauge_metric(
    metrics_registry: &mut prometheus::Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<GenericGauge<AtomicI64>, prometheus::Error> {
    let int_gauge =
        prometheus::IntGauge::with_opts(prometheus::Opts::new(metric_name, metric_description))?;
    metrics_registry.register(Box::new(int_gauge.clone()))?;
    Ok(int_gauge)
}
