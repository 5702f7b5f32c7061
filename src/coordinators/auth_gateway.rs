use std::fmt;
use std::sync::Arc;

use crate::audit::AuditBuilder;
use crate::errors::internal::{CredentialError, InternalError};
use crate::services::crypto::generate_secure_password;
use crate::services::TokenService;
use crate::stores::CredentialStore;
use crate::types::internal::audit::EventType;
use crate::types::internal::auth::{IssuedToken, TokenType};
use crate::types::internal::context::ClientMeta;
use crate::types::internal::permission::PermissionSet;
use crate::types::internal::user::{NewUser, User};

/// Tokens and user returned by a successful login
#[derive(Debug)]
pub struct LoginOutcome {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
    pub user: User,
}

/// The administrator account created on an empty store
#[derive(Clone)]
pub struct DefaultAdmin {
    pub username: String,
    /// Set only when the password was generated rather than configured
    pub generated_password: Option<String>,
}

impl fmt::Debug for DefaultAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultAdmin")
            .field("username", &self.username)
            .field("generated_password", &self.generated_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Orchestrates login, refresh, logout and password change.
///
/// Holds the one credential store chosen at startup and the token
/// service. Each call is a short-lived flow; nothing is cached between calls.
pub struct AuthGateway {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
}

impl AuthGateway {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Try the primary store, falling back to the secondary when it cannot
    /// be initialized. Fails only if neither is usable.
    pub async fn select_backend(
        primary: Arc<dyn CredentialStore>,
        fallback: Arc<dyn CredentialStore>,
    ) -> Result<Arc<dyn CredentialStore>, InternalError> {
        if primary.initialize().await {
            tracing::info!(backend = %primary.backend(), "Credential store selected");
            return Ok(primary);
        }

        tracing::warn!(
            primary = %primary.backend(),
            fallback = %fallback.backend(),
            "Primary credential store unavailable, falling back"
        );

        if fallback.initialize().await {
            let capabilities = fallback.capabilities();
            if !capabilities.revocation_supported {
                tracing::warn!(
                    "Fallback store does not persist refresh tokens: logout and password \
                     changes cannot revoke outstanding refresh tokens until they expire"
                );
            }
            return Ok(fallback);
        }

        Err(InternalError::unavailable(
            "select_backend",
            "neither the primary nor the fallback credential store could be initialized",
        ))
    }

    /// Create an administrator when the store holds no users at all.
    ///
    /// Returns `None` when users already exist.
    pub async fn ensure_default_admin(
        &self,
        username: &str,
        configured_password: Option<&str>,
    ) -> Result<Option<DefaultAdmin>, InternalError> {
        if self.store.count_users().await? > 0 {
            return Ok(None);
        }

        let generated_password = match configured_password {
            Some(_) => None,
            None => Some(generate_secure_password()),
        };
        let password = configured_password
            .map(str::to_string)
            .or_else(|| generated_password.clone())
            .unwrap_or_default();

        let admin = self
            .store
            .create_user(NewUser::new(username, password).with_permissions(PermissionSet::all()))
            .await?;

        tracing::warn!(
            username = %admin.username,
            "No users found; created default administrator. Rotate its password immediately."
        );
        if let Some(password) = &generated_password {
            // Printed once so the operator can log in; never written to logs
            eprintln!(
                "\n  Default administrator '{}' created with password: {}\n  Change it now.\n",
                admin.username, password
            );
        }

        self.store
            .record_event(
                AuditBuilder::new(EventType::DefaultAdminCreated, true)
                    .user(&admin)
                    .client(&ClientMeta::internal())
                    .add_field("backend", self.store.backend().as_str())
                    .build(),
            )
            .await;

        Ok(Some(DefaultAdmin {
            username: admin.username,
            generated_password,
        }))
    }

    /// Authenticate and issue an access/refresh pair.
    ///
    /// Every credential failure comes back as the same `InvalidCredentials`;
    /// the specific reason lives only in the audit trail.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client: &ClientMeta,
    ) -> Result<LoginOutcome, InternalError> {
        let user = self
            .store
            .authenticate(username, password, client)
            .await
            .map_err(|e| match e {
                InternalError::Credential(_) => CredentialError::InvalidCredentials.into(),
                other => other,
            })?;

        let access = self.tokens.issue_access(&user)?;
        let refresh = self.tokens.issue_refresh(&user)?;

        if self.store.capabilities().revocation_supported {
            let token_hash = self.tokens.hash_refresh_token(&refresh.token)?;
            self.store
                .store_refresh_token(&user.id, &token_hash, refresh.issued_at, refresh.expires_at, client)
                .await?;
        }

        Ok(LoginOutcome { access, refresh, user })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token is not rotated. The user is always re-read so the
    /// new access token carries current permissions.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientMeta,
    ) -> Result<IssuedToken, InternalError> {
        let result = self.resolve_refresh(refresh_token).await;

        match result {
            Ok(user) => {
                let access = self.tokens.issue_access(&user)?;
                self.store
                    .record_event(
                        AuditBuilder::new(EventType::AccessTokenRefreshed, true)
                            .user(&user)
                            .client(client)
                            .add_field("jti", &access.jti)
                            .build(),
                    )
                    .await;
                Ok(access)
            }
            Err(e) => {
                self.store
                    .record_event(
                        AuditBuilder::new(EventType::RefreshRejected, false)
                            .client(client)
                            .add_field("reason", e.to_string())
                            .build(),
                    )
                    .await;
                Err(e)
            }
        }
    }

    async fn resolve_refresh(&self, refresh_token: &str) -> Result<User, InternalError> {
        let claims = self.tokens.verify(refresh_token, TokenType::Refresh)?;

        if self.store.capabilities().revocation_supported {
            let token_hash = self.tokens.hash_refresh_token(refresh_token)?;
            let session = self.store.verify_refresh_token(&token_hash).await?;
            if session.user.id != claims.sub {
                return Err(CredentialError::invalid_refresh_token("subject mismatch").into());
            }
            return Ok(session.user);
        }

        // Without persisted tokens only signature and expiry are checked,
        // but a deleted or deactivated owner still cannot refresh
        match self.store.get_by_id(&claims.sub).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(CredentialError::invalid_refresh_token("owner inactive").into()),
        }
    }

    /// Change the password of `user_id`, revoking all of their refresh tokens
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
        client: &ClientMeta,
    ) -> Result<u64, InternalError> {
        let result = self
            .store
            .change_password(user_id, current_password, new_password)
            .await;

        let event = match &result {
            Ok(revoked) => AuditBuilder::new(EventType::PasswordChanged, true)
                .add_field("revoked_tokens", revoked),
            Err(e) => AuditBuilder::new(EventType::PasswordChangeFailed, false)
                .add_field("reason", e.to_string()),
        };
        self.store
            .record_event(event.user_id(user_id).client(client).build())
            .await;

        result
    }

    /// Revoke a refresh token. Unknown or already revoked tokens are fine.
    pub async fn logout(&self, refresh_token: &str, client: &ClientMeta) -> Result<bool, InternalError> {
        if !self.store.capabilities().revocation_supported {
            tracing::debug!("Logout on a backend without revocation; token stays valid until expiry");
            return Ok(false);
        }

        let token_hash = self.tokens.hash_refresh_token(refresh_token)?;
        let revoked = self.store.revoke_refresh_token(&token_hash).await?;

        if revoked {
            let mut event = AuditBuilder::new(EventType::RefreshTokenRevoked, true).client(client);
            if let Ok(claims) = self.tokens.verify(refresh_token, TokenType::Refresh) {
                event = event
                    .user_id(claims.sub)
                    .username(claims.username)
                    .add_sensitive("refresh_jti", &claims.jti);
            }
            self.store.record_event(event.build()).await;
        }

        Ok(revoked)
    }
}
