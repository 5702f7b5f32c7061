use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::audit::AuditLogger;
use crate::errors::internal::{CredentialError, InternalError};
use crate::services::PasswordService;
use crate::stores::{
    check_password, finish_authentication, BackendKind, CredentialStore, StoreCapabilities,
};
use crate::types::internal::audit::AuditEvent;
use crate::types::internal::context::ClientMeta;
use crate::types::internal::permission::PermissionSet;
use crate::types::internal::user::{NewUser, RefreshSession, User};

const FORMAT_VERSION: u32 = 1;

/// On-disk layout. Users are keyed by username, which doubles as their id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserFile {
    version: u32,
    users: BTreeMap<String, User>,
}

/// Degraded fallback store holding users in a single JSON file.
///
/// The whole file is rewritten on every mutation (temp file then rename).
/// Refresh tokens, sessions and audit history are not persisted; see
/// `capabilities()`.
pub struct FileStore {
    path: PathBuf,
    passwords: Arc<PasswordService>,
    state: RwLock<Option<UserFile>>,
    audit: AuditLogger,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, passwords: Arc<PasswordService>) -> Self {
        Self {
            path: path.into(),
            passwords,
            state: RwLock::new(None),
            audit: AuditLogger::tracing_only(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn not_ready() -> InternalError {
        InternalError::unavailable("file_store", "not initialized")
    }

    async fn open(&self) -> Result<(), InternalError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| InternalError::io("create_store_directory", e))?;
        }

        let file = match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice::<UserFile>(&bytes)
                .map_err(|e| InternalError::parse("user_file", e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = UserFile {
                    version: FORMAT_VERSION,
                    users: BTreeMap::new(),
                };
                self.persist(&empty).await?;
                empty
            }
            Err(e) => return Err(InternalError::io("read_user_file", e)),
        };

        *self.state.write().await = Some(file);
        Ok(())
    }

    async fn persist(&self, file: &UserFile) -> Result<(), InternalError> {
        let content = serde_json::to_vec_pretty(file)
            .map_err(|e| InternalError::parse("user_file", e.to_string()))?;
        let tmp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, &content)
            .await
            .map_err(|e| InternalError::io("write_user_file", e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| InternalError::io("replace_user_file", e))?;

        Ok(())
    }

    /// Apply `change` to a copy of the user map, persist it, then publish it.
    ///
    /// The write lock is held across the rewrite so mutations serialize and a
    /// failed write leaves the in-memory state untouched.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, User>) -> Result<T, InternalError>,
    ) -> Result<T, InternalError> {
        let mut guard = self.state.write().await;
        let current = guard.as_mut().ok_or_else(Self::not_ready)?;

        let mut next = current.clone();
        let value = change(&mut next.users)?;
        self.persist(&next).await?;
        *current = next;

        Ok(value)
    }

    async fn read<T>(&self, view: impl FnOnce(&BTreeMap<String, User>) -> T) -> Result<T, InternalError> {
        let guard = self.state.read().await;
        let file = guard.as_ref().ok_or_else(Self::not_ready)?;
        Ok(view(&file.users))
    }

    fn entry<'a>(users: &'a mut BTreeMap<String, User>, user_id: &str) -> Result<&'a mut User, InternalError> {
        users
            .get_mut(user_id)
            .ok_or_else(|| CredentialError::UserNotFound(user_id.to_string()).into())
    }

    fn unsupported(capability: &str) -> InternalError {
        InternalError::unsupported(format!("{} (file backend)", capability))
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

#[async_trait]
impl CredentialStore for FileStore {
    fn backend(&self) -> BackendKind {
        BackendKind::File
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::DEGRADED
    }

    async fn initialize(&self) -> bool {
        match self.open().await {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "File credential store ready");
                true
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "File credential store unusable");
                false
            }
        }
    }

    async fn health_check(&self) -> Result<(), InternalError> {
        self.read(|_| ()).await?;
        tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| InternalError::unavailable("health_check", e.to_string()))?;
        Ok(())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, InternalError> {
        new_user.validate()?;
        let password_hash = self.passwords.hash(&new_user.password)?;
        let created_at = now();

        let user = User {
            id: new_user.username.clone(),
            username: new_user.username,
            email: new_user.email,
            password_hash,
            permissions: new_user.permissions,
            profile: new_user.profile,
            is_active: true,
            created_at,
            updated_at: created_at,
            last_login_at: None,
        };

        self.mutate(|users| {
            if users.contains_key(&user.username) {
                return Err(CredentialError::DuplicateUsername(user.username.clone()).into());
            }
            if let Some(email) = &user.email {
                if users.values().any(|u| u.email.as_ref() == Some(email)) {
                    return Err(CredentialError::DuplicateEmail(email.clone()).into());
                }
            }
            users.insert(user.username.clone(), user.clone());
            Ok(user)
        })
        .await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, InternalError> {
        self.read(|users| users.get(username).cloned()).await
    }

    async fn get_by_id(&self, user_id: &str) -> Result<Option<User>, InternalError> {
        self.get_by_username(user_id).await
    }

    async fn list_users(&self, limit: u64, offset: u64) -> Result<Vec<User>, InternalError> {
        self.read(|users| {
            let mut all: Vec<User> = users.values().cloned().collect();
            all.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.username.cmp(&b.username))
            });
            all.into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect()
        })
        .await
    }

    async fn count_users(&self) -> Result<u64, InternalError> {
        self.read(|users| users.len() as u64).await
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        client: &ClientMeta,
    ) -> Result<User, InternalError> {
        let outcome = match self.get_by_username(username).await {
            Ok(found) => Ok(check_password(&self.passwords, found, password)),
            Err(e) => {
                let _ = self.passwords.verify(password, None);
                Err(e)
            }
        };

        let outcome = match outcome {
            Ok(Ok(mut user)) => {
                let login_at = now();
                let touched = self
                    .mutate(|users| {
                        Self::entry(users, &user.id)?.last_login_at = Some(login_at);
                        Ok(())
                    })
                    .await;
                match touched {
                    Ok(()) => user.last_login_at = Some(login_at),
                    Err(e) => tracing::warn!(error = %e, "Failed to record last login time"),
                }
                Ok(Ok(user))
            }
            other => other,
        };

        finish_authentication(&self.audit, username, client, outcome).await
    }

    async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<u64, InternalError> {
        if new_password.is_empty() {
            return Err(CredentialError::invalid_input("new password must not be empty").into());
        }
        let found = self.get_by_id(user_id).await?;
        let user = check_password(&self.passwords, found, current_password)
            .map_err(|_| CredentialError::InvalidCredentials)?;
        let password_hash = self.passwords.hash(new_password)?;

        self.mutate(|users| {
            let entry = Self::entry(users, &user.id)?;
            // Another change landed between the check and the write lock
            if entry.password_hash != user.password_hash {
                return Err(CredentialError::InvalidCredentials.into());
            }
            entry.password_hash = password_hash;
            entry.updated_at = now();
            Ok(())
        })
        .await?;

        // No refresh tokens are stored here, so there is nothing to revoke
        Ok(0)
    }

    async fn store_refresh_token(
        &self,
        user_id: &str,
        _token_hash: &str,
        _issued_at: i64,
        _expires_at: i64,
        _client: &ClientMeta,
    ) -> Result<(), InternalError> {
        tracing::trace!(user_id = %user_id, "Refresh token not persisted by file backend");
        Ok(())
    }

    async fn verify_refresh_token(&self, _token_hash: &str) -> Result<RefreshSession, InternalError> {
        Err(Self::unsupported("refresh token verification"))
    }

    async fn revoke_refresh_token(&self, _token_hash: &str) -> Result<bool, InternalError> {
        Ok(false)
    }

    async fn revoke_all_refresh_tokens(&self, _user_id: &str) -> Result<u64, InternalError> {
        Ok(0)
    }

    async fn purge_expired_tokens(&self) -> Result<u64, InternalError> {
        Err(Self::unsupported("refresh token cleanup"))
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), InternalError> {
        self.mutate(|users| {
            users
                .remove(user_id)
                .map(|_| ())
                .ok_or_else(|| CredentialError::UserNotFound(user_id.to_string()).into())
        })
        .await
    }

    async fn deactivate_user(&self, user_id: &str) -> Result<User, InternalError> {
        self.mutate(|users| {
            let entry = Self::entry(users, user_id)?;
            entry.is_active = false;
            entry.updated_at = now();
            Ok(entry.clone())
        })
        .await
    }

    async fn update_permissions(
        &self,
        user_id: &str,
        permissions: PermissionSet,
    ) -> Result<User, InternalError> {
        self.mutate(|users| {
            let entry = Self::entry(users, user_id)?;
            entry.permissions = permissions;
            entry.updated_at = now();
            Ok(entry.clone())
        })
        .await
    }

    async fn update_profile(
        &self,
        user_id: &str,
        profile: serde_json::Value,
    ) -> Result<User, InternalError> {
        if !profile.is_object() {
            return Err(CredentialError::invalid_input("profile must be a JSON object").into());
        }
        self.mutate(|users| {
            let entry = Self::entry(users, user_id)?;
            entry.profile = profile;
            entry.updated_at = now();
            Ok(entry.clone())
        })
        .await
    }

    async fn record_session(
        &self,
        user_id: &str,
        kind: &str,
        _client: &ClientMeta,
    ) -> Result<(), InternalError> {
        if self.get_by_id(user_id).await?.is_none() {
            return Err(CredentialError::UserNotFound(user_id.to_string()).into());
        }
        tracing::debug!(user_id = %user_id, kind = %kind, "Session started (not persisted)");
        Ok(())
    }

    async fn record_event(&self, event: AuditEvent) {
        self.audit.record(event).await
    }

    async fn prune_audit(&self, _retention_days: u32) -> Result<u64, InternalError> {
        Err(Self::unsupported("audit retention"))
    }
}

impl fmt::Debug for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .finish()
    }
}
