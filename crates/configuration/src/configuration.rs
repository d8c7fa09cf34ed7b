//! Configuration for the connection pool.
//!
//! `ConnectionPoolConfig` is the shape the host sends on every configuration event. It is turned
//! into the runtime `PoolSettings` by `make_runtime_configuration`, which resolves the data source
//! and decides which pool limits are actually applied.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::error::ConfigurationError;
use crate::values::ConnectionUri;

const MINUTE: Duration = Duration::from_secs(60);

/// Connection pool configuration, as received from the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ConnectionPoolConfig {
    /// Data source descriptor for the database.
    pub dsn: ConnectionUri,
    /// Maximum lifetime of a connection, in minutes. 0 leaves the driver default.
    #[serde(default)]
    pub conn_max_lifetime: u64,
    /// Maximum number of open connections. 0 leaves the driver default.
    #[serde(default)]
    pub max_open_conn: u32,
    /// Maximum number of idle connections kept by the pool. 0 means no limit.
    #[serde(default)]
    pub max_idle_conn: u32,
    /// Maximum time a connection may sit idle, in minutes. 0 disables the limit.
    #[serde(default)]
    pub max_idle_time_conn: u64,
}

impl ConnectionPoolConfig {
    pub fn new(dsn: impl Into<ConnectionUri>) -> Self {
        Self {
            dsn: dsn.into(),
            conn_max_lifetime: 0,
            max_open_conn: 0,
            max_idle_conn: 0,
            max_idle_time_conn: 0,
        }
    }
}

/// The settings a pool is opened with. Every limit is independent of the others; `None` keeps the
/// driver's default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub connection_uri: String,
    pub max_lifetime: Option<Duration>,
    pub max_connections: Option<u32>,
    pub max_idle_connections: Option<u32>,
    pub idle_timeout: Option<Duration>,
}

/// Parse the raw configuration payload.
pub fn parse_configuration(raw: &[u8]) -> Result<ConnectionPoolConfig, ConfigurationError> {
    Ok(serde_json::from_slice(raw)?)
}

/// Resolve a parsed configuration into the settings used to open a pool.
pub fn make_runtime_configuration(
    config: &ConnectionPoolConfig,
    environment: impl Environment,
) -> Result<PoolSettings, ConfigurationError> {
    let connection_uri = config.dsn.0.resolve(environment)?;
    if connection_uri.trim().is_empty() {
        return Err(ConfigurationError::EmptyConnectionUri);
    }

    Ok(PoolSettings {
        connection_uri,
        max_lifetime: minutes(config.conn_max_lifetime),
        max_connections: non_zero(config.max_open_conn),
        max_idle_connections: non_zero(config.max_idle_conn),
        idle_timeout: minutes(config.max_idle_time_conn),
    })
}

fn minutes(value: u64) -> Option<Duration> {
    non_zero(value).map(|value| MINUTE.saturating_mul(u32::try_from(value).unwrap_or(u32::MAX)))
}

fn non_zero<T: Default + PartialEq>(value: T) -> Option<T> {
    (value != T::default()).then_some(value)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use similar_asserts::assert_eq;

    use super::*;
    use crate::environment::{EmptyEnvironment, FixedEnvironment};
    use crate::values::Secret;

    #[test]
    fn limits_default_to_zero() {
        let config = parse_configuration(br#"{"dsn": "sqlite://module.db"}"#).unwrap();
        assert_eq!(config, ConnectionPoolConfig::new("sqlite://module.db"));
    }

    #[test]
    fn zero_limits_are_left_to_the_driver() {
        let settings = make_runtime_configuration(
            &ConnectionPoolConfig::new("sqlite://module.db"),
            EmptyEnvironment,
        )
        .unwrap();
        assert_eq!(
            settings,
            PoolSettings {
                connection_uri: "sqlite://module.db".into(),
                max_lifetime: None,
                max_connections: None,
                max_idle_connections: None,
                idle_timeout: None,
            }
        );
    }

    #[test]
    fn limits_apply_independently_of_idle_time() {
        let config = ConnectionPoolConfig {
            conn_max_lifetime: 3,
            max_open_conn: 8,
            max_idle_conn: 2,
            ..ConnectionPoolConfig::new("sqlite://module.db")
        };
        let settings = make_runtime_configuration(&config, EmptyEnvironment).unwrap();
        assert_eq!(settings.max_lifetime, Some(Duration::from_secs(180)));
        assert_eq!(settings.max_connections, Some(8));
        assert_eq!(settings.max_idle_connections, Some(2));
        assert_eq!(settings.idle_timeout, None);
    }

    #[test]
    fn idle_time_is_in_minutes() {
        let config = ConnectionPoolConfig {
            max_idle_time_conn: 5,
            ..ConnectionPoolConfig::new("sqlite://module.db")
        };
        let settings = make_runtime_configuration(&config, EmptyEnvironment).unwrap();
        assert_eq!(settings.idle_timeout, Some(Duration::from_secs(300)));
    }

    #[test]
    fn dsn_from_environment() {
        let config = parse_configuration(br#"{"dsn": {"variable": "MODULE_DSN"}}"#).unwrap();
        assert_eq!(
            config.dsn,
            ConnectionUri(Secret::FromEnvironment {
                variable: "MODULE_DSN".into()
            })
        );

        let environment =
            FixedEnvironment::from([("MODULE_DSN".into(), "sqlite::memory:".into())]);
        let settings = make_runtime_configuration(&config, environment).unwrap();
        assert_eq!(settings.connection_uri, "sqlite::memory:");
    }

    #[test]
    fn missing_variable_is_an_error() {
        let config = parse_configuration(br#"{"dsn": {"variable": "MODULE_DSN"}}"#).unwrap();
        let err = make_runtime_configuration(&config, EmptyEnvironment).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MissingEnvironmentVariable(_)
        ));
    }

    #[test]
    fn empty_dsn_is_an_error() {
        let err = make_runtime_configuration(&ConnectionPoolConfig::new("  "), EmptyEnvironment)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "data source descriptor `dsn` must not be empty"
        );
    }

    #[test]
    fn malformed_payload_is_a_parse_error() {
        let err = parse_configuration(br#"{"max_open_conn": -1}"#).unwrap_err();
        assert!(matches!(err, ConfigurationError::ParseError(_)));
    }
}
