use std::sync::Arc;

use crate::config::{AuthSettings, SecretManager};
use crate::coordinators::{AdminCoordinator, AuthGateway, DefaultAdmin, UserCoordinator};
use crate::errors::InternalError;
use crate::services::{PasswordService, TokenService};
use crate::stores::{CredentialStore, FileStore, RelationalStore};

/// Centralized application data, created once by the binary and shared
/// by the API layer.
///
/// ```text
/// main.rs
///   ↓
/// AppData::init(settings, secrets)
///   ↓ creates once
///   ├─ token_service (Arc<TokenService>)
///   ├─ store (Arc<dyn CredentialStore>)   relational, or file on fallback
///   ├─ gateway (Arc<AuthGateway>)
///   ├─ admin (Arc<AdminCoordinator>)
///   └─ users (Arc<UserCoordinator>)
/// ```
pub struct AppData {
    pub settings: AuthSettings,
    pub secret_manager: Arc<SecretManager>,
    pub token_service: Arc<TokenService>,
    pub store: Arc<dyn CredentialStore>,
    pub gateway: Arc<AuthGateway>,
    pub admin: Arc<AdminCoordinator>,
    pub users: Arc<UserCoordinator>,
    /// Present only when this start created the default administrator
    pub default_admin: Option<DefaultAdmin>,
}

impl AppData {
    /// Select the credential backend and wire up services and coordinators.
    ///
    /// # Errors
    ///
    /// Returns `InternalError` when neither backend can be initialized or
    /// the default administrator cannot be created.
    pub async fn init(settings: AuthSettings, secrets: SecretManager) -> Result<Self, InternalError> {
        tracing::info!("Initializing AppData...");

        let passwords = Arc::new(PasswordService::new(secrets.pepper())?);

        let primary: Arc<dyn CredentialStore> = Arc::new(RelationalStore::new(
            settings.database_url.clone(),
            settings.pool.clone(),
            passwords.clone(),
        ));
        let fallback: Arc<dyn CredentialStore> =
            Arc::new(FileStore::new(settings.fallback_store_path.clone(), passwords));

        let store = AuthGateway::select_backend(primary, fallback).await?;
        Self::assemble(settings, secrets, store).await
    }

    /// Wire everything around an already initialized store
    pub async fn assemble(
        settings: AuthSettings,
        secrets: SecretManager,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, InternalError> {
        let token_service = Arc::new(TokenService::new(settings.tokens.clone(), &secrets));
        let gateway = Arc::new(AuthGateway::new(store.clone(), token_service.clone()));

        let default_admin = gateway
            .ensure_default_admin(
                &settings.default_admin_username,
                settings.default_admin_password.as_deref(),
            )
            .await?;

        tracing::info!(
            backend = %store.backend(),
            revocation_supported = store.capabilities().revocation_supported,
            "AppData initialization complete"
        );

        Ok(Self {
            admin: Arc::new(AdminCoordinator::new(store.clone())),
            users: Arc::new(UserCoordinator::new(store.clone())),
            secret_manager: Arc::new(secrets),
            settings,
            token_service,
            store,
            gateway,
            default_admin,
        })
    }
}
