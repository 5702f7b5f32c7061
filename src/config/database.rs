use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use migration::{AuthMigrator, MigratorTrait};

use crate::config::PoolSettings;
use crate::errors::InternalError;

/// Open a pooled connection to the relational store
///
/// Does NOT run migrations - call `migrate_database()` separately.
pub async fn connect_database(
    database_url: &str,
    pool: &PoolSettings,
) -> Result<DatabaseConnection, InternalError> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(pool.max_connections)
        .acquire_timeout(pool.acquire_timeout)
        .idle_timeout(pool.idle_timeout)
        .connect_timeout(pool.connect_timeout)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .map_err(|e| InternalError::unavailable("connect_database", e.to_string()))?;

    tracing::debug!("Connected to relational store");

    Ok(db)
}

/// Run pending migrations on the relational store
pub async fn migrate_database(db: &DatabaseConnection) -> Result<(), InternalError> {
    AuthMigrator::up(db, None)
        .await
        .map_err(|e| InternalError::database("run_migrations", e))?;

    tracing::debug!("Database migrations completed");

    Ok(())
}
