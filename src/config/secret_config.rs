/// Where a secret is loaded from
#[derive(Debug, Clone)]
pub enum SecretType {
    EnvVar { name: String },
}

impl SecretType {
    pub fn env(name: &str) -> Self {
        Self::EnvVar {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::EnvVar { name } => name,
        }
    }
}

/// What to do when a secret is not configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhenMissing {
    /// Generate a random value for this process only
    Ephemeral,
    /// Run without it
    Disable,
}

/// Loading rules for a single secret
#[derive(Debug, Clone)]
pub struct SecretConfig {
    pub secret_type: SecretType,
    pub when_missing: WhenMissing,
    /// Minimum length (None = no minimum)
    pub min_length: Option<usize>,
}

impl SecretConfig {
    pub fn new(secret_type: SecretType) -> Self {
        Self {
            secret_type,
            when_missing: WhenMissing::Ephemeral,
            min_length: None,
        }
    }

    pub fn when_missing(mut self, when_missing: WhenMissing) -> Self {
        self.when_missing = when_missing;
        self
    }

    pub fn min_length(mut self, length: usize) -> Self {
        self.min_length = Some(length);
        self
    }
}
