// Common test utilities for integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use argon2::Params;
use docsync_auth::app_data::AppData;
use docsync_auth::config::{AuthSettings, SecretManager};
use docsync_auth::services::PasswordService;
use docsync_auth::stores::{CredentialStore, RelationalStore};
use docsync_auth::types::internal::context::ClientMeta;
use migration::{AuthMigrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

pub const TEST_JWT_SECRET: &str = "integration-jwt-secret-at-least-32-chars";
pub const TEST_REFRESH_SECRET: &str = "integration-refresh-secret-32-chars-min";
pub const ADMIN_PASSWORD: &str = "integration-admin-password";

/// Creates a test auth database with migrations applied
pub async fn setup_test_auth_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    AuthMigrator::up(&db, None)
        .await
        .expect("Failed to run auth migrations");

    db
}

pub fn fast_passwords() -> Arc<PasswordService> {
    let params = Params::new(1024, 1, 1, None).expect("valid argon2 params");
    Arc::new(
        PasswordService::with_params(Some("integration-pepper"), params)
            .expect("Failed to create password service"),
    )
}

pub fn test_secrets() -> SecretManager {
    SecretManager::from_parts(TEST_JWT_SECRET, TEST_REFRESH_SECRET, Some("integration-pepper".to_string()))
}

pub fn test_settings() -> AuthSettings {
    AuthSettings {
        default_admin_password: Some(ADMIN_PASSWORD.to_string()),
        ..AuthSettings::default()
    }
}

pub fn client() -> ClientMeta {
    ClientMeta::new(Some("198.51.100.7".to_string()), Some("integration-test".to_string()))
}

/// Fully wired application over an in-memory relational store
///
/// Returns the raw connection too so tests can count rows directly.
pub async fn relational_app() -> (AppData, DatabaseConnection) {
    let db = setup_test_auth_db().await;
    let store = RelationalStore::from_connection(db.clone(), fast_passwords());
    assert!(store.initialize().await, "relational store should initialize");

    let app = AppData::assemble(test_settings(), test_secrets(), Arc::new(store))
        .await
        .expect("Failed to assemble app data");
    (app, db)
}

/// Helper to manage environment variables in tests
///
/// Cleans up specified environment variables on creation and drop,
/// ensuring test isolation when dealing with global environment state.
pub struct EnvGuard {
    vars: Vec<String>,
}

impl EnvGuard {
    pub fn new(vars: Vec<&str>) -> Self {
        for var in &vars {
            std::env::remove_var(var);
        }
        Self {
            vars: vars.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for var in &self.vars {
            std::env::remove_var(var);
        }
    }
}

/// Global mutex for tests that modify environment variables
///
/// Environment variables are process-global, so tests that modify them
/// must run serially to avoid race conditions.
pub static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());
