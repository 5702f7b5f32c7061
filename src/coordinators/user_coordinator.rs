use std::sync::Arc;

use crate::audit::AuditBuilder;
use crate::errors::internal::{CredentialError, InternalError};
use crate::stores::CredentialStore;
use crate::types::internal::audit::EventType;
use crate::types::internal::auth::Claims;
use crate::types::internal::context::ClientMeta;
use crate::types::internal::user::User;

/// Self-service operations for the bearer of an access token
pub struct UserCoordinator {
    store: Arc<dyn CredentialStore>,
}

impl UserCoordinator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Current state of the caller's account.
    ///
    /// Unlike authorization this does read the store, so a deleted or
    /// deactivated account reports not-found even with a live token.
    pub async fn me(&self, claims: &Claims) -> Result<User, InternalError> {
        match self.store.get_by_id(&claims.sub).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(CredentialError::UserNotFound(claims.sub.clone()).into()),
        }
    }

    pub async fn update_profile(
        &self,
        claims: &Claims,
        profile: serde_json::Value,
        client: &ClientMeta,
    ) -> Result<User, InternalError> {
        let user = self.store.update_profile(&claims.sub, profile).await?;

        self.store
            .record_event(
                AuditBuilder::new(EventType::ProfileUpdated, true)
                    .user(&user)
                    .client(client)
                    .build(),
            )
            .await;

        Ok(user)
    }

    /// Persist a record of an authenticated long-lived connection
    pub async fn start_session(
        &self,
        claims: &Claims,
        kind: &str,
        client: &ClientMeta,
    ) -> Result<(), InternalError> {
        self.store.record_session(&claims.sub, kind, client).await?;

        self.store
            .record_event(
                AuditBuilder::new(EventType::SessionStarted, true)
                    .user_id(&claims.sub)
                    .username(&claims.username)
                    .client(client)
                    .add_field("kind", kind)
                    .build(),
            )
            .await;

        tracing::debug!(user_id = %claims.sub, kind, "Session started");
        Ok(())
    }
}
