// Maintenance commands against the relational backend.
// These never fall back: pruning a file store would be meaningless.

use std::sync::Arc;

use crate::config::{connect_database, migrate_database, AuthSettings, SecretManager};
use crate::errors::InternalError;
use crate::services::PasswordService;
use crate::stores::{CredentialStore, RelationalStore};

/// Connect to the relational store and run all pending migrations
pub async fn run_migrations(settings: &AuthSettings) -> Result<(), InternalError> {
    tracing::info!("Running database migrations...");

    let db = connect_database(&settings.database_url, &settings.pool).await?;
    migrate_database(&db).await?;

    tracing::info!("All migrations completed successfully");
    Ok(())
}

async fn open_relational(
    settings: &AuthSettings,
    secrets: &SecretManager,
) -> Result<RelationalStore, InternalError> {
    let passwords = Arc::new(PasswordService::new(secrets.pepper())?);
    let store = RelationalStore::new(settings.database_url.clone(), settings.pool.clone(), passwords);

    if !store.initialize().await {
        return Err(InternalError::unavailable(
            "maintenance",
            "relational store could not be initialized",
        ));
    }
    Ok(store)
}

pub async fn prune_audit(
    settings: &AuthSettings,
    secrets: &SecretManager,
    retention_days: u32,
) -> Result<u64, InternalError> {
    let store = open_relational(settings, secrets).await?;
    let removed = store.prune_audit(retention_days).await?;

    tracing::info!(removed, retention_days, "Audit events pruned");
    Ok(removed)
}

pub async fn purge_tokens(
    settings: &AuthSettings,
    secrets: &SecretManager,
) -> Result<u64, InternalError> {
    let store = open_relational(settings, secrets).await?;
    let removed = store.purge_expired_tokens().await?;

    tracing::info!(removed, "Expired refresh tokens purged");
    Ok(removed)
}
