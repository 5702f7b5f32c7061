#[cfg(test)]
mod tests {
    use crate::errors::internal::{CredentialError, InternalError};
    use crate::types::internal::auth::TokenRejection;
    use sea_orm::{DbErr, RuntimeErr};

    #[test]
    fn test_database_error_includes_operation() {
        let db_err = DbErr::RecordNotFound("test record".to_string());
        let error = InternalError::database("create_user", db_err);

        let error_string = error.to_string();
        assert!(error_string.contains("create_user"));
        assert!(error_string.contains("Database error"));
    }

    #[test]
    fn test_transaction_error_includes_operation() {
        let db_err = DbErr::RecordNotFound("test".to_string());
        let error = InternalError::transaction("change_password", db_err);

        let error_string = error.to_string();
        assert!(error_string.contains("change_password"));
        assert!(error_string.contains("Transaction error"));
    }

    #[test]
    fn test_connection_failures_become_unavailable() {
        let db_err = DbErr::Conn(RuntimeErr::Internal("connection refused".to_string()));
        let error = InternalError::database("get_user", db_err);

        assert!(error.is_unavailable());
        assert!(matches!(error, InternalError::StoreUnavailable { .. }));
    }

    #[test]
    fn test_parse_error_includes_value_type() {
        let error = InternalError::parse("permissions", "invalid format");

        let error_string = error.to_string();
        assert!(error_string.contains("permissions"));
        assert!(error_string.contains("invalid format"));
        assert!(error_string.contains("Parse error"));
    }

    #[test]
    fn test_crypto_error_includes_operation() {
        let error = InternalError::crypto("argon2_init", "invalid secret length");

        let error_string = error.to_string();
        assert!(error_string.contains("argon2_init"));
        assert!(error_string.contains("invalid secret length"));
        assert!(error_string.contains("Crypto error"));
    }

    #[test]
    fn test_unsupported_names_capability() {
        let error = InternalError::unsupported("prune_audit");
        assert!(error.to_string().contains("prune_audit"));
    }

    #[test]
    fn test_credential_error_invalid_credentials() {
        let error = CredentialError::InvalidCredentials;
        assert_eq!(error.to_string(), "Invalid credentials");
    }

    #[test]
    fn test_domain_errors_convert_transparently() {
        let error: InternalError = CredentialError::SelfDeletion.into();
        assert_eq!(error.to_string(), "Administrators cannot delete their own account");

        let error: InternalError = TokenRejection::Expired.into();
        assert_eq!(error.to_string(), "token has expired");
    }
}
