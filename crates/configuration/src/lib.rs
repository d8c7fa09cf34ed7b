pub mod configuration;
pub mod environment;
pub mod error;
pub mod values;

pub use configuration::{
    make_runtime_configuration, parse_configuration, ConnectionPoolConfig, PoolSettings,
};
pub use error::ConfigurationError;
pub use values::{ConnectionUri, Secret};

/// JSON schema of the configuration accepted by the module.
pub fn configuration_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(ConnectionPoolConfig)
}
