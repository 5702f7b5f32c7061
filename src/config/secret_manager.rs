use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

use crate::config::errors::ConfigError;
use crate::config::secret_config::{SecretConfig, SecretType, WhenMissing};
use crate::config::{EnvironmentProvider, SystemEnvironment};

const MIN_SECRET_LENGTH: usize = 32;
const EPHEMERAL_SECRET_BYTES: usize = 48;

/// Outcome of loading one secret
enum Loaded {
    Configured(String),
    Ephemeral(String),
    Absent,
}

/// Centralized holder for signing keys and the password pepper
pub struct SecretManager {
    jwt_secret: String,
    refresh_token_secret: String,
    pepper: Option<String>,
    ephemeral: bool,
}

impl SecretManager {
    /// Load secrets from the process environment
    pub fn init() -> Result<Self, ConfigError> {
        Self::from_env_provider(Arc::new(SystemEnvironment))
    }

    /// Load and validate secrets from the given provider
    ///
    /// Missing signing secrets are replaced by random ones; a missing
    /// pepper disables peppering. Present-but-short secrets are rejected.
    pub fn from_env_provider(
        env: Arc<dyn EnvironmentProvider + Send + Sync>,
    ) -> Result<Self, ConfigError> {
        let mut ephemeral = false;

        let jwt_secret = match Self::load_secret(env.as_ref(), &Self::jwt_config())? {
            Loaded::Configured(value) => value,
            Loaded::Ephemeral(value) => {
                ephemeral = true;
                value
            }
            Loaded::Absent => return Err(ConfigError::invalid("JWT_SECRET", "is required")),
        };
        let refresh_token_secret =
            match Self::load_secret(env.as_ref(), &Self::refresh_config())? {
                Loaded::Configured(value) => value,
                Loaded::Ephemeral(value) => {
                    ephemeral = true;
                    value
                }
                Loaded::Absent => {
                    return Err(ConfigError::invalid("REFRESH_TOKEN_SECRET", "is required"));
                }
            };
        let pepper = match Self::load_secret(env.as_ref(), &Self::pepper_config())? {
            Loaded::Configured(value) => Some(value),
            _ => {
                tracing::warn!(
                    "PASSWORD_PEPPER is not set; password hashes will not be peppered"
                );
                None
            }
        };

        if ephemeral {
            tracing::warn!(
                "JWT_SECRET or REFRESH_TOKEN_SECRET is not set; using a randomly generated \
                 secret. All issued tokens become invalid when this process restarts."
            );
        }

        Ok(Self {
            jwt_secret,
            refresh_token_secret,
            pepper,
            ephemeral,
        })
    }

    /// Build directly from known values
    pub fn from_parts(
        jwt_secret: impl Into<String>,
        refresh_token_secret: impl Into<String>,
        pepper: Option<String>,
    ) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            refresh_token_secret: refresh_token_secret.into(),
            pepper,
            ephemeral: false,
        }
    }

    fn jwt_config() -> SecretConfig {
        SecretConfig::new(SecretType::env("JWT_SECRET"))
            .when_missing(WhenMissing::Ephemeral)
            .min_length(MIN_SECRET_LENGTH)
    }

    fn refresh_config() -> SecretConfig {
        SecretConfig::new(SecretType::env("REFRESH_TOKEN_SECRET"))
            .when_missing(WhenMissing::Ephemeral)
            .min_length(MIN_SECRET_LENGTH)
    }

    fn pepper_config() -> SecretConfig {
        SecretConfig::new(SecretType::env("PASSWORD_PEPPER"))
            .when_missing(WhenMissing::Disable)
            .min_length(MIN_SECRET_LENGTH)
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn refresh_token_secret(&self) -> &str {
        &self.refresh_token_secret
    }

    pub fn pepper(&self) -> Option<&str> {
        self.pepper.as_deref()
    }

    /// True when at least one signing secret was generated for this process
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    fn load_secret(
        env: &dyn EnvironmentProvider,
        config: &SecretConfig,
    ) -> Result<Loaded, ConfigError> {
        let name = config.secret_type.name();
        let value = match &config.secret_type {
            SecretType::EnvVar { name } => env.get_non_empty(name),
        };

        let Some(value) = value else {
            return Ok(match config.when_missing {
                WhenMissing::Ephemeral => Loaded::Ephemeral(generate_secret()),
                WhenMissing::Disable => Loaded::Absent,
            });
        };

        if let Some(min_len) = config.min_length {
            if value.len() < min_len {
                return Err(ConfigError::SecretTooShort {
                    secret_name: name.to_string(),
                    expected: min_len,
                    actual: value.len(),
                });
            }
        }

        Ok(Loaded::Configured(value))
    }
}

fn generate_secret() -> String {
    let mut bytes = [0u8; EPHEMERAL_SECRET_BYTES];
    rand::rng().fill(&mut bytes[..]);
    URL_SAFE_NO_PAD.encode(bytes)
}

impl fmt::Debug for SecretManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretManager")
            .field("jwt_secret", &"<redacted>")
            .field("refresh_token_secret", &"<redacted>")
            .field("pepper", &self.pepper.as_ref().map(|_| "<redacted>"))
            .field("ephemeral", &self.ephemeral)
            .finish()
    }
}

impl fmt::Display for SecretManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SecretManager {{ ephemeral: {}, peppered: {} }}",
            self.ephemeral,
            self.pepper.is_some()
        )
    }
}
