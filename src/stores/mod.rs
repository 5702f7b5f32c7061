// Stores layer - credential persistence behind one capability-aware trait
pub mod audit_store;
pub mod file_store;
pub mod relational_store;

use std::fmt;

use async_trait::async_trait;

use crate::audit::{AuditBuilder, AuditLogger};
use crate::errors::internal::{CredentialError, InternalError};
use crate::services::PasswordService;
use crate::types::internal::audit::{AuditEvent, EventType};
use crate::types::internal::context::ClientMeta;
use crate::types::internal::permission::PermissionSet;
use crate::types::internal::user::{NewUser, RefreshSession, User};

pub use audit_store::AuditStore;
pub use file_store::FileStore;
pub use relational_store::RelationalStore;

/// Which storage implementation is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Relational,
    File,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relational => "relational",
            Self::File => "file",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guarantees a backend can honour. Callers branch on these instead of
/// assuming every backend behaves like the relational one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCapabilities {
    /// Refresh tokens are persisted and revocation is enforced on refresh
    pub revocation_supported: bool,
    /// Audit events are written somewhere other than the log stream
    pub audit_persisted: bool,
    /// Session records survive the request that created them
    pub sessions_persisted: bool,
}

impl StoreCapabilities {
    pub const FULL: Self = Self {
        revocation_supported: true,
        audit_persisted: true,
        sessions_persisted: true,
    };

    pub const DEGRADED: Self = Self {
        revocation_supported: false,
        audit_persisted: false,
        sessions_persisted: false,
    };
}

/// User, credential and refresh-token persistence.
///
/// Both implementations present the same contract; where the file backend
/// cannot honour an operation it says so through `capabilities()` and
/// `InternalError::Unsupported` rather than quietly doing less.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    fn backend(&self) -> BackendKind;

    fn capabilities(&self) -> StoreCapabilities;

    /// Connect and provision. Never fails; returns false when unusable.
    async fn initialize(&self) -> bool;

    async fn health_check(&self) -> Result<(), InternalError>;

    async fn create_user(&self, new_user: NewUser) -> Result<User, InternalError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, InternalError>;

    async fn get_by_id(&self, user_id: &str) -> Result<Option<User>, InternalError>;

    async fn list_users(&self, limit: u64, offset: u64) -> Result<Vec<User>, InternalError>;

    async fn count_users(&self) -> Result<u64, InternalError>;

    /// Check a username/password pair.
    ///
    /// Hashes exactly once whether or not the user exists and records
    /// exactly one audit event per call.
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        client: &ClientMeta,
    ) -> Result<User, InternalError>;

    /// Replace the password and revoke every active refresh token of the
    /// user in one atomic step. Returns the number of tokens revoked.
    async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<u64, InternalError>;

    async fn store_refresh_token(
        &self,
        user_id: &str,
        token_hash: &str,
        issued_at: i64,
        expires_at: i64,
        client: &ClientMeta,
    ) -> Result<(), InternalError>;

    /// Valid only if stored, unexpired, unrevoked and owned by an active user
    async fn verify_refresh_token(&self, token_hash: &str) -> Result<RefreshSession, InternalError>;

    /// Idempotent. Returns true only when this call did the revoking.
    async fn revoke_refresh_token(&self, token_hash: &str) -> Result<bool, InternalError>;

    async fn revoke_all_refresh_tokens(&self, user_id: &str) -> Result<u64, InternalError>;

    async fn purge_expired_tokens(&self) -> Result<u64, InternalError>;

    /// Hard delete: tokens, audit rows, sessions, then the user, atomically
    async fn delete_user(&self, user_id: &str) -> Result<(), InternalError>;

    /// Soft delete: clear the active flag and revoke all refresh tokens
    async fn deactivate_user(&self, user_id: &str) -> Result<User, InternalError>;

    async fn update_permissions(
        &self,
        user_id: &str,
        permissions: PermissionSet,
    ) -> Result<User, InternalError>;

    async fn update_profile(
        &self,
        user_id: &str,
        profile: serde_json::Value,
    ) -> Result<User, InternalError>;

    async fn record_session(
        &self,
        user_id: &str,
        kind: &str,
        client: &ClientMeta,
    ) -> Result<(), InternalError>;

    /// Best-effort; never fails the caller
    async fn record_event(&self, event: AuditEvent);

    async fn prune_audit(&self, retention_days: u32) -> Result<u64, InternalError>;
}

/// Why an authentication attempt did not produce a user.
///
/// Failures against an existing account keep its id so the audit row is
/// attributed to it and removed with it on hard delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AuthFailure {
    UnknownUser,
    BadPassword { user_id: String },
    InactiveUser { user_id: String },
}

impl AuthFailure {
    fn reason(&self) -> &'static str {
        match self {
            Self::UnknownUser => "unknown_user",
            Self::BadPassword { .. } => "bad_password",
            Self::InactiveUser { .. } => "inactive_user",
        }
    }

    fn user_id(&self) -> Option<&str> {
        match self {
            Self::UnknownUser => None,
            Self::BadPassword { user_id } | Self::InactiveUser { user_id } => Some(user_id),
        }
    }
}

/// Shared constant-shape check used by both backends.
///
/// Exactly one hash verification runs regardless of whether `user` exists.
pub(crate) fn check_password(
    passwords: &PasswordService,
    user: Option<User>,
    password: &str,
) -> Result<User, AuthFailure> {
    let matches = passwords.verify(password, user.as_ref().map(|u| u.password_hash.as_str()));
    match user {
        None => Err(AuthFailure::UnknownUser),
        Some(user) if !matches => Err(AuthFailure::BadPassword { user_id: user.id }),
        Some(user) if !user.is_active => Err(AuthFailure::InactiveUser { user_id: user.id }),
        Some(user) => Ok(user),
    }
}

/// Record the single audit event for an authentication attempt and shape the result
pub(crate) async fn finish_authentication(
    audit: &AuditLogger,
    username: &str,
    client: &ClientMeta,
    outcome: Result<Result<User, AuthFailure>, InternalError>,
) -> Result<User, InternalError> {
    match outcome {
        Ok(Ok(user)) => {
            audit
                .record(
                    AuditBuilder::new(EventType::LoginSuccess, true)
                        .user(&user)
                        .client(client)
                        .build(),
                )
                .await;
            Ok(user)
        }
        Ok(Err(failure)) => {
            audit
                .record(login_failure(username, failure.user_id(), client, failure.reason()))
                .await;
            Err(CredentialError::InvalidCredentials.into())
        }
        Err(e) => {
            audit
                .record(login_failure(username, None, client, "store_error"))
                .await;
            Err(e)
        }
    }
}

fn login_failure(
    username: &str,
    user_id: Option<&str>,
    client: &ClientMeta,
    reason: &str,
) -> AuditEvent {
    let mut event = AuditBuilder::new(EventType::LoginFailure, false)
        .username(username)
        .client(client)
        .add_field("reason", reason);
    if let Some(user_id) = user_id {
        event = event.user_id(user_id);
    }
    event.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::utils::fast_password_service;

    fn sample_user(passwords: &PasswordService, username: &str, password: &str) -> User {
        User {
            id: "u-1".to_string(),
            username: username.to_string(),
            email: None,
            password_hash: passwords.hash(password).unwrap(),
            permissions: PermissionSet::read_only(),
            profile: serde_json::json!({}),
            is_active: true,
            created_at: 0,
            updated_at: 0,
            last_login_at: None,
        }
    }

    #[test]
    fn test_capability_presets() {
        assert!(StoreCapabilities::FULL.revocation_supported);
        assert!(!StoreCapabilities::DEGRADED.revocation_supported);
        assert!(!StoreCapabilities::DEGRADED.audit_persisted);
    }

    #[test]
    fn test_check_password_keeps_existing_user_id() {
        let passwords = fast_password_service();
        let mut user = sample_user(&passwords, "alice", "s3cret!");

        assert_eq!(
            check_password(&passwords, Some(user.clone()), "wrong"),
            Err(AuthFailure::BadPassword { user_id: "u-1".to_string() })
        );
        assert_eq!(
            check_password(&passwords, None, "s3cret!"),
            Err(AuthFailure::UnknownUser)
        );

        user.is_active = false;
        let inactive = check_password(&passwords, Some(user), "s3cret!").unwrap_err();
        assert_eq!(inactive.reason(), "inactive_user");
        assert_eq!(inactive.user_id(), Some("u-1"));
    }

    #[test]
    fn test_backend_kind_names() {
        assert_eq!(BackendKind::Relational.to_string(), "relational");
        assert_eq!(BackendKind::File.to_string(), "file");
    }
}
