mod database;
mod env_provider;
pub mod errors;
mod logging;
mod secret_config;
mod secret_manager;
mod settings;

pub use database::{connect_database, migrate_database};
pub use env_provider::{EnvironmentProvider, SystemEnvironment};
#[cfg(test)]
pub use env_provider::MockEnvironment;
pub use errors::ConfigError;
pub use logging::{init_logging, LoggingConfig, LoggingError};
pub use secret_config::{SecretConfig, SecretType, WhenMissing};
pub use secret_manager::SecretManager;
pub use settings::{AuthSettings, PoolSettings, TokenSettings};
