use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::errors::ConfigError;
use crate::config::{EnvironmentProvider, SystemEnvironment};

/// Connection pool limits for the relational store
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Lifetimes and identifiers embedded in issued tokens
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSettings {
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub issuer: String,
    pub audience: String,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_ttl_secs: 24 * 60 * 60,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
            issuer: "docsync-auth".to_string(),
            audience: "docsync-api".to_string(),
        }
    }
}

/// Everything the auth service reads from its environment, secrets excepted
#[derive(Clone)]
pub struct AuthSettings {
    pub database_url: String,
    pub fallback_store_path: PathBuf,
    pub server_host: String,
    pub server_port: u16,
    pub pool: PoolSettings,
    pub tokens: TokenSettings,
    pub audit_retention_days: u32,
    pub default_admin_username: String,
    pub default_admin_password: Option<String>,
    pub expose_error_detail: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://auth.db?mode=rwc".to_string(),
            fallback_store_path: PathBuf::from("data/users.json"),
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            pool: PoolSettings::default(),
            tokens: TokenSettings::default(),
            audit_retention_days: 90,
            default_admin_username: "admin".to_string(),
            default_admin_password: None,
            expose_error_detail: false,
        }
    }
}

impl AuthSettings {
    /// Load settings, falling back to defaults for anything unset
    pub fn from_env_provider(
        env: Arc<dyn EnvironmentProvider + Send + Sync>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let database_url = string_or(env.as_ref(), "DATABASE_URL", &defaults.database_url)?;
        let fallback_store_path = env
            .get_non_empty("FALLBACK_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.fallback_store_path);
        let server_host = string_or(env.as_ref(), "HOST", &defaults.server_host)?;
        let server_port = parse_or(env.as_ref(), "PORT", defaults.server_port)?;
        if server_port == 0 {
            return Err(ConfigError::invalid("PORT", "must be between 1 and 65535"));
        }

        let pool = PoolSettings {
            max_connections: positive(env.as_ref(), "DB_MAX_CONNECTIONS", defaults.pool.max_connections)?,
            acquire_timeout: seconds(env.as_ref(), "DB_ACQUIRE_TIMEOUT_SECS", defaults.pool.acquire_timeout)?,
            idle_timeout: seconds(env.as_ref(), "DB_IDLE_TIMEOUT_SECS", defaults.pool.idle_timeout)?,
            connect_timeout: seconds(env.as_ref(), "DB_CONNECT_TIMEOUT_SECS", defaults.pool.connect_timeout)?,
        };

        let tokens = TokenSettings {
            access_ttl_secs: positive(env.as_ref(), "ACCESS_TOKEN_TTL_SECS", defaults.tokens.access_ttl_secs)?,
            refresh_ttl_secs: positive(env.as_ref(), "REFRESH_TOKEN_TTL_SECS", defaults.tokens.refresh_ttl_secs)?,
            issuer: string_or(env.as_ref(), "TOKEN_ISSUER", &defaults.tokens.issuer)?,
            audience: string_or(env.as_ref(), "TOKEN_AUDIENCE", &defaults.tokens.audience)?,
        };

        let audit_retention_days =
            positive(env.as_ref(), "AUDIT_RETENTION_DAYS", defaults.audit_retention_days)?;
        let default_admin_username =
            string_or(env.as_ref(), "DEFAULT_ADMIN_USERNAME", &defaults.default_admin_username)?;
        let default_admin_password = env.get_non_empty("DEFAULT_ADMIN_PASSWORD");
        let expose_error_detail = parse_or(env.as_ref(), "EXPOSE_ERROR_DETAIL", false)?;

        Ok(Self {
            database_url,
            fallback_store_path,
            server_host,
            server_port,
            pool,
            tokens,
            audit_retention_days,
            default_admin_username,
            default_admin_password,
            expose_error_detail,
        })
    }

    /// Convenience method that uses the system environment provider
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_provider(Arc::new(SystemEnvironment))
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn string_or(env: &dyn EnvironmentProvider, key: &str, default: &str) -> Result<String, ConfigError> {
    match env.get_var(key) {
        Some(value) if value.trim().is_empty() => {
            Err(ConfigError::invalid(key, "must be at least 1 characters long"))
        }
        Some(value) => Ok(value),
        None => Ok(default.to_string()),
    }
}

fn parse_or<T>(env: &dyn EnvironmentProvider, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env.get_var(key) {
        Some(value) => value.trim().parse().map_err(|e| ConfigError::parse(key, e)),
        None => Ok(default),
    }
}

fn positive<T>(env: &dyn EnvironmentProvider, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: fmt::Display,
{
    let value = parse_or(env, key, default)?;
    if value <= T::default() {
        return Err(ConfigError::invalid(key, "must be greater than zero"));
    }
    Ok(value)
}

fn seconds(env: &dyn EnvironmentProvider, key: &str, default: Duration) -> Result<Duration, ConfigError> {
    positive(env, key, default.as_secs()).map(Duration::from_secs)
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("database_url", &"<redacted>")
            .field("fallback_store_path", &self.fallback_store_path)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("pool", &self.pool)
            .field("tokens", &self.tokens)
            .field("audit_retention_days", &self.audit_retention_days)
            .field("default_admin_username", &self.default_admin_username)
            .field("default_admin_password", &self.default_admin_password.as_ref().map(|_| "<redacted>"))
            .field("expose_error_detail", &self.expose_error_detail)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MockEnvironment;

    #[test]
    fn test_settings_with_defaults() {
        let settings = AuthSettings::from_env_provider(Arc::new(MockEnvironment::empty())).unwrap();

        assert_eq!(settings.database_url, "sqlite://auth.db?mode=rwc");
        assert_eq!(settings.server_address(), "0.0.0.0:3000");
        assert_eq!(settings.tokens.access_ttl_secs, 86_400);
        assert_eq!(settings.tokens.refresh_ttl_secs, 604_800);
        assert_eq!(settings.audit_retention_days, 90);
        assert!(!settings.expose_error_detail);
        assert!(settings.default_admin_password.is_none());
    }

    #[test]
    fn test_settings_read_overrides() {
        let env = MockEnvironment::empty().with_vars(&[
            ("DATABASE_URL", "postgres://db/auth"),
            ("PORT", "8080"),
            ("ACCESS_TOKEN_TTL_SECS", "600"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("DB_ACQUIRE_TIMEOUT_SECS", "2"),
            ("EXPOSE_ERROR_DETAIL", "true"),
            ("DEFAULT_ADMIN_PASSWORD", "rotate-me-now"),
        ]);
        let settings = AuthSettings::from_env_provider(Arc::new(env)).unwrap();

        assert_eq!(settings.database_url, "postgres://db/auth");
        assert_eq!(settings.server_port, 8080);
        assert_eq!(settings.tokens.access_ttl_secs, 600);
        assert_eq!(settings.pool.max_connections, 4);
        assert_eq!(settings.pool.acquire_timeout, Duration::from_secs(2));
        assert!(settings.expose_error_detail);
        assert_eq!(settings.default_admin_password.as_deref(), Some("rotate-me-now"));
    }

    #[test]
    fn test_empty_database_url_fails_validation() {
        let env = MockEnvironment::empty().with_var("DATABASE_URL", "");

        match AuthSettings::from_env_provider(Arc::new(env)) {
            Err(ConfigError::InvalidSetting { setting_name, .. }) => {
                assert_eq!(setting_name, "DATABASE_URL");
            }
            other => panic!("Expected InvalidSetting, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_non_numeric_port_fails_parse() {
        let env = MockEnvironment::empty().with_var("PORT", "eighty");

        assert!(matches!(
            AuthSettings::from_env_provider(Arc::new(env)),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let env = MockEnvironment::empty().with_var("REFRESH_TOKEN_TTL_SECS", "0");

        assert!(AuthSettings::from_env_provider(Arc::new(env)).is_err());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let env = MockEnvironment::empty().with_var("DATABASE_URL", "postgres://user:hunter2@db/auth");
        let settings = AuthSettings::from_env_provider(Arc::new(env)).unwrap();

        assert!(!format!("{:?}", settings).contains("hunter2"));
    }
}
