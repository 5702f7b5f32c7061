use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::audit::AuditLogger;
use crate::config::{connect_database, migrate_database, PoolSettings};
use crate::errors::internal::{CredentialError, InternalError};
use crate::services::PasswordService;
use crate::stores::{
    check_password, finish_authentication, AuditStore, BackendKind, CredentialStore,
    StoreCapabilities,
};
use crate::types::db::{refresh_token, user, user_session};
use crate::types::internal::audit::AuditEvent;
use crate::types::internal::context::ClientMeta;
use crate::types::internal::permission::{Permission, PermissionSet};
use crate::types::internal::user::{NewUser, RefreshSession, User};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

struct Connected {
    db: DatabaseConnection,
    audit_store: Arc<AuditStore>,
    audit: AuditLogger,
}

impl Connected {
    fn new(db: DatabaseConnection) -> Self {
        let audit_store = Arc::new(AuditStore::new(db.clone()));
        Self {
            audit: AuditLogger::durable(audit_store.clone()),
            audit_store,
            db,
        }
    }
}

/// Durable, transactional credential store backed by SeaORM.
///
/// Holds no connection until `initialize()` succeeds; every operation
/// before that reports `StoreUnavailable`.
pub struct RelationalStore {
    database_url: String,
    pool: PoolSettings,
    passwords: Arc<PasswordService>,
    state: OnceCell<Connected>,
    pending_audit: AuditLogger,
}

impl RelationalStore {
    pub fn new(database_url: impl Into<String>, pool: PoolSettings, passwords: Arc<PasswordService>) -> Self {
        Self {
            database_url: database_url.into(),
            pool,
            passwords,
            state: OnceCell::new(),
            pending_audit: AuditLogger::tracing_only(),
        }
    }

    /// Wrap an already open connection. `initialize()` still runs migrations.
    pub fn from_connection(db: DatabaseConnection, passwords: Arc<PasswordService>) -> Self {
        Self {
            database_url: String::new(),
            pool: PoolSettings::default(),
            passwords,
            state: OnceCell::from(Connected::new(db)),
            pending_audit: AuditLogger::tracing_only(),
        }
    }

    pub fn connection(&self) -> Option<&DatabaseConnection> {
        self.state.get().map(|c| &c.db)
    }

    pub fn audit_store(&self) -> Option<Arc<AuditStore>> {
        self.state.get().map(|c| c.audit_store.clone())
    }

    fn db(&self) -> Result<&DatabaseConnection, InternalError> {
        self.connection()
            .ok_or_else(|| InternalError::unavailable("relational_store", "not initialized"))
    }

    fn audit(&self) -> &AuditLogger {
        self.state.get().map(|c| &c.audit).unwrap_or(&self.pending_audit)
    }

    async fn connect_and_migrate(&self) -> Result<(), InternalError> {
        if let Some(connected) = self.state.get() {
            return migrate_database(&connected.db).await;
        }
        if self.database_url.is_empty() {
            return Err(InternalError::unavailable("relational_store", "no database url"));
        }

        let db = connect_database(&self.database_url, &self.pool).await?;
        migrate_database(&db).await?;
        // A concurrent initialize may have won; either connection is equivalent
        let _ = self.state.set(Connected::new(db));
        Ok(())
    }

    async fn find_user<C: ConnectionTrait>(conn: &C, user_id: &str) -> Result<Option<user::Model>, InternalError> {
        user::Entity::find_by_id(user_id.to_string())
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_user_by_id", e))
    }

    async fn revoke_tokens_for<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
        now: i64,
    ) -> Result<u64, InternalError> {
        let result = refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::RevokedAt, Expr::value(Some(now)))
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .exec(conn)
            .await
            .map_err(|e| InternalError::transaction("revoke_user_refresh_tokens", e))?;

        Ok(result.rows_affected)
    }

    async fn touch_last_login(&self, user_id: &str, login_at: i64) -> Result<(), InternalError> {
        user::Entity::update_many()
            .col_expr(user::Column::LastLoginAt, Expr::value(Some(login_at)))
            .filter(user::Column::Id.eq(user_id))
            .exec(self.db()?)
            .await
            .map_err(|e| InternalError::database("touch_last_login", e))?;
        Ok(())
    }

    async fn reload(&self, user_id: &str) -> Result<User, InternalError> {
        self.get_by_id(user_id)
            .await?
            .ok_or_else(|| CredentialError::UserNotFound(user_id.to_string()).into())
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

fn to_user(model: user::Model) -> Result<User, InternalError> {
    let permissions: Vec<Permission> = serde_json::from_str(&model.permissions)
        .map_err(|e| InternalError::parse("permissions", e.to_string()))?;
    let profile = serde_json::from_str(&model.profile)
        .map_err(|e| InternalError::parse("profile", e.to_string()))?;

    Ok(User {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        permissions: PermissionSet::new(permissions),
        profile,
        is_active: model.is_active,
        created_at: model.created_at,
        updated_at: model.updated_at,
        last_login_at: model.last_login_at,
    })
}

fn permissions_json(permissions: &PermissionSet) -> Result<String, InternalError> {
    serde_json::to_string(&permissions.to_vec())
        .map_err(|e| InternalError::parse("permissions", e.to_string()))
}

/// Translate a failed user insert, turning constraint hits into domain errors
fn insert_user_error(err: DbErr, username: &str, email: Option<&str>) -> InternalError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) if message.contains("email") => {
            CredentialError::DuplicateEmail(email.unwrap_or_default().to_string()).into()
        }
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            CredentialError::DuplicateUsername(username.to_string()).into()
        }
        _ => InternalError::database("insert_user", err),
    }
}

#[async_trait]
impl CredentialStore for RelationalStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Relational
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::FULL
    }

    async fn initialize(&self) -> bool {
        match self.connect_and_migrate().await {
            Ok(()) => {
                tracing::info!("Relational credential store ready");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Relational credential store unavailable");
                false
            }
        }
    }

    async fn health_check(&self) -> Result<(), InternalError> {
        self.db()?
            .ping()
            .await
            .map_err(|e| InternalError::database("health_check", e))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, InternalError> {
        new_user.validate()?;
        let db = self.db()?;

        if self.get_by_username(&new_user.username).await?.is_some() {
            return Err(CredentialError::DuplicateUsername(new_user.username).into());
        }
        if let Some(email) = &new_user.email {
            let taken = user::Entity::find()
                .filter(user::Column::Email.eq(email.as_str()))
                .one(db)
                .await
                .map_err(|e| InternalError::database("find_user_by_email", e))?;
            if taken.is_some() {
                return Err(CredentialError::DuplicateEmail(email.clone()).into());
            }
        }

        let password_hash = self.passwords.hash(&new_user.password)?;
        let profile = serde_json::to_string(&new_user.profile)
            .map_err(|e| InternalError::parse("profile", e.to_string()))?;
        let created_at = now();

        let row = user::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            username: Set(new_user.username.clone()),
            email: Set(new_user.email.clone()),
            password_hash: Set(password_hash),
            permissions: Set(permissions_json(&new_user.permissions)?),
            profile: Set(profile),
            is_active: Set(true),
            created_at: Set(created_at),
            updated_at: Set(created_at),
            last_login_at: Set(None),
        };

        let model = row
            .insert(db)
            .await
            .map_err(|e| insert_user_error(e, &new_user.username, new_user.email.as_deref()))?;

        tracing::debug!(user_id = %model.id, "User created");
        to_user(model)
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, InternalError> {
        user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(self.db()?)
            .await
            .map_err(|e| InternalError::database("find_user_by_username", e))?
            .map(to_user)
            .transpose()
    }

    async fn get_by_id(&self, user_id: &str) -> Result<Option<User>, InternalError> {
        Self::find_user(self.db()?, user_id).await?.map(to_user).transpose()
    }

    async fn list_users(&self, limit: u64, offset: u64) -> Result<Vec<User>, InternalError> {
        user::Entity::find()
            .order_by_asc(user::Column::CreatedAt)
            .order_by_asc(user::Column::Username)
            .limit(limit)
            .offset(offset)
            .all(self.db()?)
            .await
            .map_err(|e| InternalError::database("list_users", e))?
            .into_iter()
            .map(to_user)
            .collect()
    }

    async fn count_users(&self) -> Result<u64, InternalError> {
        user::Entity::find()
            .count(self.db()?)
            .await
            .map_err(|e| InternalError::database("count_users", e))
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
                match self.touch_last_login(&user.id, login_at).await {
                    Ok(()) => user.last_login_at = Some(login_at),
                    Err(e) => tracing::warn!(error = %e, "Failed to record last login time"),
                }
                Ok(Ok(user))
            }
            other => other,
        };

        finish_authentication(self.audit(), username, client, outcome).await
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
        let db = self.db()?;
        let found = self.get_by_id(user_id).await?;
        let verified = check_password(&self.passwords, found, current_password)
            .map_err(|_| CredentialError::InvalidCredentials)?;
        let password_hash = self.passwords.hash(new_password)?;

        let txn = db
            .begin()
            .await
            .map_err(|e| InternalError::transaction("begin_change_password", e))?;
        let changed_at = now();

        let updated = user::Entity::update_many()
            .col_expr(user::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(user::Column::UpdatedAt, Expr::value(changed_at))
            .filter(user::Column::Id.eq(user_id))
            .filter(user::Column::PasswordHash.eq(verified.password_hash.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| InternalError::transaction("update_password_hash", e))?;
        // The hash moved (or the row vanished) since the current password was checked
        if updated.rows_affected == 0 {
            return Err(CredentialError::InvalidCredentials.into());
        }

        let revoked = Self::revoke_tokens_for(&txn, user_id, changed_at).await?;

        txn.commit()
            .await
            .map_err(|e| InternalError::transaction("commit_change_password", e))?;

        tracing::debug!(user_id = %user_id, revoked, "Password changed");
        Ok(revoked)
    }

    async fn store_refresh_token(
        &self,
        user_id: &str,
        token_hash: &str,
        issued_at: i64,
        expires_at: i64,
        client: &ClientMeta,
    ) -> Result<(), InternalError> {
        let row = refresh_token::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            token_hash: Set(token_hash.to_string()),
            issued_at: Set(issued_at),
            expires_at: Set(expires_at),
            revoked_at: Set(None),
            ip_address: Set(client.ip_address.clone()),
            user_agent: Set(client.user_agent.clone()),
        };

        row.insert(self.db()?)
            .await
            .map_err(|e| InternalError::database("store_refresh_token", e))?;

        Ok(())
    }

    async fn verify_refresh_token(&self, token_hash: &str) -> Result<RefreshSession, InternalError> {
        let found = refresh_token::Entity::find()
            .filter(refresh_token::Column::TokenHash.eq(token_hash))
            .find_also_related(user::Entity)
            .one(self.db()?)
            .await
            .map_err(|e| InternalError::database("find_refresh_token", e))?;

        let Some((token, owner)) = found else {
            return Err(CredentialError::invalid_refresh_token("not stored").into());
        };
        if token.revoked_at.is_some() {
            return Err(CredentialError::invalid_refresh_token("revoked").into());
        }
        if token.expires_at <= now() {
            return Err(CredentialError::invalid_refresh_token("expired").into());
        }
        let owner = match owner.map(to_user).transpose()? {
            Some(owner) if owner.is_active => owner,
            _ => return Err(CredentialError::invalid_refresh_token("owner inactive").into()),
        };

        Ok(RefreshSession {
            token_id: token.id,
            user: owner,
            expires_at: token.expires_at,
        })
    }

    async fn revoke_refresh_token(&self, token_hash: &str) -> Result<bool, InternalError> {
        let result = refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::RevokedAt, Expr::value(Some(now())))
            .filter(refresh_token::Column::TokenHash.eq(token_hash))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .exec(self.db()?)
            .await
            .map_err(|e| InternalError::database("revoke_refresh_token", e))?;

        Ok(result.rows_affected > 0)
    }

    async fn revoke_all_refresh_tokens(&self, user_id: &str) -> Result<u64, InternalError> {
        Self::revoke_tokens_for(self.db()?, user_id, now()).await
    }

    async fn purge_expired_tokens(&self) -> Result<u64, InternalError> {
        let result = refresh_token::Entity::delete_many()
            .filter(refresh_token::Column::ExpiresAt.lte(now()))
            .exec(self.db()?)
            .await
            .map_err(|e| InternalError::database("purge_expired_tokens", e))?;

        Ok(result.rows_affected)
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), InternalError> {
        let txn = self
            .db()?
            .begin()
            .await
            .map_err(|e| InternalError::transaction("begin_delete_user", e))?;

        if Self::find_user(&txn, user_id).await?.is_none() {
            return Err(CredentialError::UserNotFound(user_id.to_string()).into());
        }

        let tokens = refresh_token::Entity::delete_many()
            .filter(refresh_token::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| InternalError::transaction("delete_user_refresh_tokens", e))?;
        let audit_rows = AuditStore::delete_for_user(&txn, user_id).await?;
        let sessions = user_session::Entity::delete_many()
            .filter(user_session::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| InternalError::transaction("delete_user_sessions", e))?;
        user::Entity::delete_by_id(user_id.to_string())
            .exec(&txn)
            .await
            .map_err(|e| InternalError::transaction("delete_user_row", e))?;

        txn.commit()
            .await
            .map_err(|e| InternalError::transaction("commit_delete_user", e))?;

        tracing::debug!(
            user_id = %user_id,
            tokens = tokens.rows_affected,
            audit_rows,
            sessions = sessions.rows_affected,
            "User hard-deleted"
        );
        Ok(())
    }

    async fn deactivate_user(&self, user_id: &str) -> Result<User, InternalError> {
        let txn = self
            .db()?
            .begin()
            .await
            .map_err(|e| InternalError::transaction("begin_deactivate_user", e))?;
        let deactivated_at = now();

        let updated = user::Entity::update_many()
            .col_expr(user::Column::IsActive, Expr::value(false))
            .col_expr(user::Column::UpdatedAt, Expr::value(deactivated_at))
            .filter(user::Column::Id.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| InternalError::transaction("deactivate_user", e))?;
        if updated.rows_affected == 0 {
            return Err(CredentialError::UserNotFound(user_id.to_string()).into());
        }
        Self::revoke_tokens_for(&txn, user_id, deactivated_at).await?;

        txn.commit()
            .await
            .map_err(|e| InternalError::transaction("commit_deactivate_user", e))?;

        self.reload(user_id).await
    }

    async fn update_permissions(
        &self,
        user_id: &str,
        permissions: PermissionSet,
    ) -> Result<User, InternalError> {
        let updated = user::Entity::update_many()
            .col_expr(user::Column::Permissions, Expr::value(permissions_json(&permissions)?))
            .col_expr(user::Column::UpdatedAt, Expr::value(now()))
            .filter(user::Column::Id.eq(user_id))
            .exec(self.db()?)
            .await
            .map_err(|e| InternalError::database("update_permissions", e))?;
        if updated.rows_affected == 0 {
            return Err(CredentialError::UserNotFound(user_id.to_string()).into());
        }

        self.reload(user_id).await
    }

    async fn update_profile(
        &self,
        user_id: &str,
        profile: serde_json::Value,
    ) -> Result<User, InternalError> {
        if !profile.is_object() {
            return Err(CredentialError::invalid_input("profile must be a JSON object").into());
        }
        let profile = serde_json::to_string(&profile)
            .map_err(|e| InternalError::parse("profile", e.to_string()))?;

        let updated = user::Entity::update_many()
            .col_expr(user::Column::Profile, Expr::value(profile))
            .col_expr(user::Column::UpdatedAt, Expr::value(now()))
            .filter(user::Column::Id.eq(user_id))
            .exec(self.db()?)
            .await
            .map_err(|e| InternalError::database("update_profile", e))?;
        if updated.rows_affected == 0 {
            return Err(CredentialError::UserNotFound(user_id.to_string()).into());
        }

        self.reload(user_id).await
    }

    async fn record_session(
        &self,
        user_id: &str,
        kind: &str,
        client: &ClientMeta,
    ) -> Result<(), InternalError> {
        let row = user_session::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            kind: Set(kind.to_string()),
            ip_address: Set(client.ip_address.clone()),
            user_agent: Set(client.user_agent.clone()),
            started_at: Set(now()),
        };

        row.insert(self.db()?).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                CredentialError::UserNotFound(user_id.to_string()).into()
            }
            _ => InternalError::database("record_session", e),
        })?;

        Ok(())
    }

    async fn record_event(&self, event: AuditEvent) {
        self.audit().record(event).await
    }

    async fn prune_audit(&self, retention_days: u32) -> Result<u64, InternalError> {
        let audit_store = self
            .audit_store()
            .ok_or_else(|| InternalError::unavailable("prune_audit", "not initialized"))?;
        let cutoff = now() - i64::from(retention_days) * SECONDS_PER_DAY;
        audit_store.prune_older_than(cutoff).await
    }
}

impl fmt::Debug for RelationalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationalStore")
            .field("database_url", &"<redacted>")
            .field("pool", &self.pool)
            .field("connected", &self.state.initialized())
            .finish()
    }
}
