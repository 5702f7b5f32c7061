// SecretManager against the real process environment

mod common;

use common::{EnvGuard, ENV_TEST_MUTEX};
use docsync_auth::config::{AuthSettings, SecretManager};

const SECRET_VARS: [&str; 3] = ["JWT_SECRET", "REFRESH_TOKEN_SECRET", "PASSWORD_PEPPER"];

#[test]
fn test_init_reads_configured_secrets() {
    let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = EnvGuard::new(SECRET_VARS.to_vec());

    std::env::set_var("JWT_SECRET", "env-jwt-secret-that-is-at-least-32-chars");
    std::env::set_var("REFRESH_TOKEN_SECRET", "env-refresh-secret-at-least-32-chars!!");
    std::env::set_var("PASSWORD_PEPPER", "env-pepper");

    let secrets = SecretManager::init().unwrap();

    assert!(!secrets.is_ephemeral());
    assert_eq!(secrets.jwt_secret(), "env-jwt-secret-that-is-at-least-32-chars");
    assert_eq!(secrets.pepper(), Some("env-pepper"));
}

#[test]
fn test_init_generates_ephemeral_secrets_when_missing() {
    let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = EnvGuard::new(SECRET_VARS.to_vec());

    let first = SecretManager::init().unwrap();
    let second = SecretManager::init().unwrap();

    assert!(first.is_ephemeral());
    assert!(first.jwt_secret().len() >= 32);
    assert_ne!(first.jwt_secret(), second.jwt_secret());
    assert!(first.pepper().is_none());
}

#[test]
fn test_init_rejects_short_secret() {
    let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = EnvGuard::new(SECRET_VARS.to_vec());

    std::env::set_var("JWT_SECRET", "too-short");

    assert!(SecretManager::init().is_err());
}

#[test]
fn test_settings_from_env_reads_port() {
    let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = EnvGuard::new(vec!["PORT", "AUDIT_RETENTION_DAYS"]);

    std::env::set_var("PORT", "8088");
    std::env::set_var("AUDIT_RETENTION_DAYS", "30");

    let settings = AuthSettings::from_env().unwrap();

    assert_eq!(settings.server_port, 8088);
    assert_eq!(settings.audit_retention_days, 30);
}
