use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::internal::CredentialError;
use crate::types::internal::permission::PermissionSet;

const MAX_USERNAME_LEN: usize = 64;

/// Backend-independent user record.
///
/// `id` is opaque: a UUID under the relational store and the username
/// under the file store.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub permissions: PermissionSet,
    pub profile: serde_json::Value,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_login_at: Option<i64>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("permissions", &self.permissions)
            .field("is_active", &self.is_active)
            .finish()
    }
}

/// Input for creating a user
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    pub permissions: PermissionSet,
    pub profile: serde_json::Value,
}

impl NewUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: None,
            password: password.into(),
            permissions: PermissionSet::read_only(),
            profile: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_profile(mut self, profile: serde_json::Value) -> Self {
        self.profile = profile;
        self
    }

    /// Reject inputs no backend should ever persist
    pub fn validate(&self) -> Result<(), CredentialError> {
        let username = self.username.trim();
        if username.is_empty() || username != self.username {
            return Err(CredentialError::invalid_input(
                "username must be non-empty without surrounding whitespace",
            ));
        }
        if username.len() > MAX_USERNAME_LEN {
            return Err(CredentialError::invalid_input(format!(
                "username must be at most {} characters",
                MAX_USERNAME_LEN
            )));
        }
        if self.password.is_empty() {
            return Err(CredentialError::invalid_input("password must not be empty"));
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(CredentialError::invalid_input("email is not valid"));
            }
        }
        if !self.profile.is_object() {
            return Err(CredentialError::invalid_input("profile must be a JSON object"));
        }
        Ok(())
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("permissions", &self.permissions)
            .finish()
    }
}

/// A stored refresh token that passed every validity check
#[derive(Debug, Clone)]
pub struct RefreshSession {
    pub token_id: String,
    pub user: User,
    pub expires_at: i64,
}
