// Test utilities shared across unit tests
// Only compiled when running tests

use std::sync::Arc;

use argon2::Params;
use sea_orm::Database;

use crate::config::{SecretManager, TokenSettings};
use crate::coordinators::AuthGateway;
use crate::services::{PasswordService, TokenService};
use crate::stores::{CredentialStore, RelationalStore};
use crate::types::internal::auth::{Claims, TokenType};
use crate::types::internal::user::User;

pub const TEST_JWT_SECRET: &str = "test-secret-key-minimum-32-characters-long";
pub const TEST_REFRESH_SECRET: &str = "test-refresh-secret-minimum-32-chars";
pub const TEST_PEPPER: &str = "test-pepper-for-unit-tests";

/// Argon2 with minimal cost so tests hashing many passwords stay fast
pub fn fast_password_service() -> Arc<PasswordService> {
    let params = Params::new(1024, 1, 1, None).expect("valid argon2 params");
    Arc::new(
        PasswordService::with_params(Some(TEST_PEPPER), params)
            .expect("Failed to create password service"),
    )
}

pub fn test_secrets() -> SecretManager {
    SecretManager::from_parts(TEST_JWT_SECRET, TEST_REFRESH_SECRET, Some(TEST_PEPPER.to_string()))
}

pub fn test_token_service() -> Arc<TokenService> {
    Arc::new(TokenService::new(TokenSettings::default(), &test_secrets()))
}

/// Relational store over a private in-memory SQLite database, migrated and ready
pub async fn setup_relational_store() -> RelationalStore {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    let store = RelationalStore::from_connection(db, fast_password_service());
    assert!(store.initialize().await, "Failed to initialize relational store");
    store
}

/// Gateway over a fresh relational store
///
/// Returns the concrete store too so tests can inspect rows directly:
/// ```rust
/// let (store, gateway) = setup_relational_gateway().await;
/// ```
pub async fn setup_relational_gateway() -> (Arc<RelationalStore>, AuthGateway) {
    let store = Arc::new(setup_relational_store().await);
    let gateway = AuthGateway::new(store.clone(), test_token_service());
    (store, gateway)
}

/// Verified access-token claims for `user`, as the API layer would see them
pub fn claims_for(user: &User) -> Claims {
    let tokens = test_token_service();
    let issued = tokens.issue_access(user).expect("Failed to issue token");
    tokens
        .verify(&issued.token, TokenType::Access)
        .expect("Failed to verify token")
}
