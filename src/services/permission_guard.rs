use crate::errors::internal::CredentialError;
use crate::services::TokenService;
use crate::types::internal::auth::Claims;
use crate::types::internal::permission::Permission;

/// Request-time authorization over already-verified claims.
///
/// Never consults the store: a permission revoked mid-session stays
/// effective until the holder's access token expires.
pub struct PermissionGuard;

impl PermissionGuard {
    pub fn check(claims: &Claims, required: Permission) -> Result<(), CredentialError> {
        if TokenService::has_permission(claims, required) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %claims.sub,
                required = %required,
                "Permission denied"
            );
            Err(CredentialError::insufficient_permission(required.as_str()))
        }
    }

    pub fn require_admin(claims: &Claims) -> Result<(), CredentialError> {
        Self::check(claims, Permission::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::internal::auth::TokenType;

    fn claims(permissions: Vec<Permission>) -> Claims {
        Claims {
            sub: "user-1".to_string(),
            username: "alice".to_string(),
            permissions,
            token_type: TokenType::Access,
            iss: "docsync-auth".to_string(),
            aud: "docsync-api".to_string(),
            iat: 0,
            exp: 0,
            jti: "jti".to_string(),
        }
    }

    #[test]
    fn test_present_permission_is_accepted() {
        let claims = claims(vec![Permission::Read, Permission::Write]);

        assert!(PermissionGuard::check(&claims, Permission::Write).is_ok());
    }

    #[test]
    fn test_missing_permission_is_rejected() {
        let claims = claims(vec![Permission::Read]);

        match PermissionGuard::check(&claims, Permission::Delete) {
            Err(CredentialError::InsufficientPermission { required }) => assert_eq!(required, "delete"),
            other => panic!("Expected InsufficientPermission, got {:?}", other),
        }
    }

    #[test]
    fn test_admin_claims_pass_every_check() {
        let claims = claims(vec![Permission::Admin]);

        for permission in Permission::ALL {
            assert!(PermissionGuard::check(&claims, permission).is_ok());
        }
        assert!(PermissionGuard::require_admin(&claims).is_ok());
    }

    #[test]
    fn test_empty_claims_fail_admin_check() {
        assert!(PermissionGuard::require_admin(&claims(vec![])).is_err());
    }
}
