#[cfg(test)]
use std::collections::HashMap;

/// Source of configuration values.
///
/// Settings and secrets read through this trait instead of `std::env`
/// directly so tests can supply values without touching process-global
/// state.
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;

    /// Like `get_var`, but a blank value counts as unset.
    ///
    /// Deployment templates commonly leave `DEFAULT_ADMIN_PASSWORD=` or
    /// `PASSWORD_PEPPER=` empty; those mean "not configured", not "empty string".
    fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get_var(key).filter(|value| !value.trim().is_empty())
    }
}

/// Reads the process environment
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed set of variables for tests
#[cfg(test)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

#[cfg(test)]
impl MockEnvironment {
    pub fn empty() -> Self {
        Self { vars: HashMap::new() }
    }

    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_vars(self, vars: &[(&str, &str)]) -> Self {
        vars.iter()
            .fold(self, |env, (key, value)| env.with_var(key, value))
    }
}

#[cfg(test)]
impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}
