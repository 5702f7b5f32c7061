use crate::errors::internal::{CredentialError, InternalError};
use crate::errors::AuthError;
use crate::types::internal::auth::{TokenRejection, TokenType};
use sea_orm::DbErr;

#[test]
fn test_database_error_converts_to_internal_server_error() {
    let db_err = DbErr::RecordNotFound("test".to_string());
    let internal_err = InternalError::database("get_user", db_err);
    let auth_err = AuthError::from_internal_error(internal_err, false);

    assert_eq!(auth_err.status_code(), 500);
    assert_eq!(auth_err.message(), "An internal error occurred");
    assert!(auth_err.detail().is_none());
}

#[test]
fn test_debug_flag_exposes_backend_detail() {
    let db_err = DbErr::Custom("driver exploded".to_string());
    let internal_err = InternalError::transaction("delete_user", db_err);
    let auth_err = AuthError::from_internal_error(internal_err, true);

    assert_eq!(auth_err.status_code(), 500);
    assert!(auth_err.detail().unwrap().contains("driver exploded"));
}

#[test]
fn test_debug_flag_never_decorates_client_errors() {
    let internal_err = InternalError::Credential(CredentialError::InvalidCredentials);
    let auth_err = AuthError::from_internal_error(internal_err, true);

    assert!(auth_err.detail().is_none());
}

#[test]
fn test_store_unavailable_converts_to_503() {
    let internal_err = InternalError::unavailable("acquire_connection", "pool timed out");
    let auth_err = AuthError::from_internal_error(internal_err, false);

    assert_eq!(auth_err.status_code(), 503);
    assert_eq!(auth_err.code(), "store_unavailable");
}

#[test]
fn test_invalid_credentials_converts_correctly() {
    let internal_err = InternalError::Credential(CredentialError::InvalidCredentials);
    let auth_err = AuthError::from_internal_error(internal_err, false);

    assert_eq!(auth_err.status_code(), 401);
    assert_eq!(auth_err.message(), "Invalid username or password");
}

#[test]
fn test_duplicate_username_and_email_share_one_shape() {
    let by_name = AuthError::from_internal_error(
        InternalError::Credential(CredentialError::DuplicateUsername("alice".to_string())),
        false,
    );
    let by_email = AuthError::from_internal_error(
        InternalError::Credential(CredentialError::DuplicateEmail("a@example.com".to_string())),
        false,
    );

    assert_eq!(by_name.status_code(), 409);
    assert_eq!(by_name.code(), by_email.code());
}

#[test]
fn test_token_rejections_map_to_distinct_codes() {
    let expired = AuthError::from_internal_error(InternalError::Token(TokenRejection::Expired), false);
    let wrong = AuthError::from_internal_error(
        InternalError::Token(TokenRejection::WrongType {
            expected: TokenType::Access,
            actual: TokenType::Refresh,
        }),
        false,
    );
    let forged = AuthError::from_internal_error(
        InternalError::Token(TokenRejection::SignatureInvalid),
        false,
    );

    assert_eq!(expired.code(), "expired_token");
    assert_eq!(wrong.code(), "wrong_token_type");
    assert_eq!(forged.code(), "invalid_token");
    assert!([expired, wrong, forged].iter().all(|e| e.status_code() == 401));
}

#[test]
fn test_revoked_refresh_token_looks_like_invalid_token() {
    let internal_err = InternalError::Credential(CredentialError::invalid_refresh_token("revoked"));
    let auth_err = AuthError::from_internal_error(internal_err, false);

    assert_eq!(auth_err.code(), "invalid_token");
}

#[test]
fn test_insufficient_permission_converts_to_403() {
    let internal_err = InternalError::Credential(CredentialError::insufficient_permission("admin"));
    let auth_err = AuthError::from_internal_error(internal_err, false);

    assert_eq!(auth_err.status_code(), 403);
    assert!(auth_err.message().contains("admin"));
}
