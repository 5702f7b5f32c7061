use std::sync::Arc;

use crate::audit::AuditBuilder;
use crate::errors::internal::{CredentialError, InternalError};
use crate::services::PermissionGuard;
use crate::stores::CredentialStore;
use crate::types::internal::audit::EventType;
use crate::types::internal::auth::Claims;
use crate::types::internal::context::ClientMeta;
use crate::types::internal::permission::PermissionSet;
use crate::types::internal::user::{NewUser, User};

/// One page of users plus the total across all pages
#[derive(Debug)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// Orchestrates user administration.
///
/// Every operation requires the `admin` permission in the caller's
/// verified claims. Authorization is decided from the claims alone.
pub struct AdminCoordinator {
    store: Arc<dyn CredentialStore>,
}

impl AdminCoordinator {
    pub const MAX_PAGE_SIZE: u64 = 100;

    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// List users, clamping `limit` to `1..=MAX_PAGE_SIZE`
    pub async fn list_users(
        &self,
        actor: &Claims,
        limit: u64,
        offset: u64,
    ) -> Result<UserPage, InternalError> {
        PermissionGuard::require_admin(actor)?;

        let limit = limit.clamp(1, Self::MAX_PAGE_SIZE);
        let users = self.store.list_users(limit, offset).await?;
        let total = self.store.count_users().await?;

        Ok(UserPage {
            users,
            total,
            limit,
            offset,
        })
    }

    pub async fn create_user(
        &self,
        actor: &Claims,
        new_user: NewUser,
        client: &ClientMeta,
    ) -> Result<User, InternalError> {
        PermissionGuard::require_admin(actor)?;

        let user = self.store.create_user(new_user).await?;

        self.store
            .record_event(
                AuditBuilder::new(EventType::UserCreated, true)
                    .user_id(&actor.sub)
                    .username(&actor.username)
                    .client(client)
                    .add_field("target_user_id", &user.id)
                    .add_field("target_username", &user.username)
                    .add_field("permissions", user.permissions.to_vec())
                    .build(),
            )
            .await;

        tracing::info!(user_id = %user.id, created_by = %actor.sub, "User created by admin");
        Ok(user)
    }

    /// Hard delete. Administrators cannot delete themselves.
    pub async fn delete_user(
        &self,
        actor: &Claims,
        user_id: &str,
        client: &ClientMeta,
    ) -> Result<(), InternalError> {
        // Step 1: Authorization, then self-deletion guard
        PermissionGuard::require_admin(actor)?;
        if actor.sub == user_id {
            return Err(CredentialError::SelfDeletion.into());
        }

        // Step 2: Capture the username before the row disappears
        let target = self
            .store
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| CredentialError::UserNotFound(user_id.to_string()))?;

        // Step 3: Transactional cascade inside the store
        self.store.delete_user(user_id).await?;

        // Step 4: Audit against the actor; the target's own rows are gone
        self.store
            .record_event(
                AuditBuilder::new(EventType::UserDeleted, true)
                    .user_id(&actor.sub)
                    .username(&actor.username)
                    .client(client)
                    .add_field("target_user_id", &target.id)
                    .add_field("target_username", &target.username)
                    .build(),
            )
            .await;

        tracing::info!(user_id = %user_id, deleted_by = %actor.sub, "User deleted by admin");
        Ok(())
    }

    /// Soft delete: the account is kept but can no longer log in or refresh
    pub async fn deactivate_user(
        &self,
        actor: &Claims,
        user_id: &str,
        client: &ClientMeta,
    ) -> Result<User, InternalError> {
        PermissionGuard::require_admin(actor)?;
        if actor.sub == user_id {
            return Err(CredentialError::SelfDeletion.into());
        }

        let user = self.store.deactivate_user(user_id).await?;

        self.store
            .record_event(
                AuditBuilder::new(EventType::UserDeactivated, true)
                    .user_id(&actor.sub)
                    .username(&actor.username)
                    .client(client)
                    .add_field("target_user_id", &user.id)
                    .add_field("target_username", &user.username)
                    .build(),
            )
            .await;

        Ok(user)
    }

    /// Replace a user's permission set.
    ///
    /// Already-issued access tokens keep their old claims until they
    /// expire; the next refresh picks up the new set.
    pub async fn update_permissions(
        &self,
        actor: &Claims,
        user_id: &str,
        permissions: PermissionSet,
        client: &ClientMeta,
    ) -> Result<User, InternalError> {
        PermissionGuard::require_admin(actor)?;

        let user = self.store.update_permissions(user_id, permissions).await?;

        self.store
            .record_event(
                AuditBuilder::new(EventType::PermissionsUpdated, true)
                    .user_id(&actor.sub)
                    .username(&actor.username)
                    .client(client)
                    .add_field("target_user_id", &user.id)
                    .add_field("permissions", user.permissions.to_vec())
                    .build(),
            )
            .await;

        Ok(user)
    }
}
