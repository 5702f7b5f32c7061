use std::fmt;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::config::{SecretManager, TokenSettings};
use crate::errors::InternalError;
use crate::services::crypto;
use crate::types::internal::auth::{Claims, IssuedToken, TokenRejection, TokenType};
use crate::types::internal::permission::Permission;
use crate::types::internal::user::User;

/// Signs and verifies access and refresh tokens.
///
/// Pure and in-process: no store lookups happen here, so an access token
/// stays valid until it expires even if the user's sessions are revoked.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    refresh_token_secret: String,
    settings: TokenSettings,
}

impl TokenService {
    pub fn new(settings: TokenSettings, secrets: &SecretManager) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secrets.jwt_secret().as_bytes()),
            decoding_key: DecodingKey::from_secret(secrets.jwt_secret().as_bytes()),
            refresh_token_secret: secrets.refresh_token_secret().to_string(),
            settings,
        }
    }

    pub fn issue_access(&self, user: &User) -> Result<IssuedToken, InternalError> {
        self.issue(user, TokenType::Access, self.settings.access_ttl_secs)
    }

    pub fn issue_refresh(&self, user: &User) -> Result<IssuedToken, InternalError> {
        self.issue(user, TokenType::Refresh, self.settings.refresh_ttl_secs)
    }

    fn issue(
        &self,
        user: &User,
        token_type: TokenType,
        ttl_secs: i64,
    ) -> Result<IssuedToken, InternalError> {
        let issued_at = Utc::now().timestamp();
        let expires_at = issued_at + ttl_secs;
        let jti = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            permissions: user.permissions.to_vec(),
            token_type,
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            iat: issued_at,
            exp: expires_at,
            jti: jti.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| InternalError::crypto(format!("sign_{}_token", token_type), e.to_string()))?;

        Ok(IssuedToken {
            token,
            jti,
            issued_at,
            expires_at,
        })
    }

    /// Verify signature, issuer, audience, expiry and token type.
    ///
    /// Every failure is reported as a `TokenRejection`; nothing here is an
    /// internal error, so garbage input degrades to a 401.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, TokenRejection> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[&self.settings.issuer]);
        validation.set_audience(&[&self.settings.audience]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "aud", "sub"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenRejection::Expired,
                ErrorKind::InvalidSignature => TokenRejection::SignatureInvalid,
                _ => TokenRejection::Malformed,
            }
        })?;

        if data.claims.token_type != expected {
            return Err(TokenRejection::WrongType {
                expected,
                actual: data.claims.token_type,
            });
        }

        Ok(data.claims)
    }

    /// Pull the token out of an `Authorization: Bearer <token>` header value
    pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
        let value = header?.trim();
        let (scheme, token) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        (!token.is_empty()).then_some(token)
    }

    /// True if the claims carry `permission` directly or through `admin`
    pub fn has_permission(claims: &Claims, permission: Permission) -> bool {
        claims.permission_set().allows(permission)
    }

    /// Storage fingerprint of a refresh token
    pub fn hash_refresh_token(&self, token: &str) -> Result<String, InternalError> {
        crypto::hmac_sha256_token(&self.refresh_token_secret, token)
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("signing_key", &"<redacted>")
            .field("refresh_token_secret", &"<redacted>")
            .field("settings", &self.settings)
            .finish()
    }
}

impl fmt::Display for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TokenService {{ access_ttl: {}s, refresh_ttl: {}s }}",
            self.settings.access_ttl_secs, self.settings.refresh_ttl_secs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::internal::permission::PermissionSet;

    const JWT_SECRET: &str = "test-secret-key-minimum-32-characters-long";
    const REFRESH_SECRET: &str = "test-refresh-secret-minimum-32-chars";

    fn secrets() -> SecretManager {
        SecretManager::from_parts(JWT_SECRET, REFRESH_SECRET, None)
    }

    fn service() -> TokenService {
        TokenService::new(TokenSettings::default(), &secrets())
    }

    fn user(permissions: PermissionSet) -> User {
        User {
            id: "user-1".to_string(),
            username: "alice".to_string(),
            email: None,
            password_hash: String::new(),
            permissions,
            profile: serde_json::json!({}),
            is_active: true,
            created_at: 0,
            updated_at: 0,
            last_login_at: None,
        }
    }

    #[test]
    fn test_access_token_round_trips_claims() {
        let service = service();
        let issued = service.issue_access(&user(PermissionSet::read_only())).unwrap();

        let claims = service.verify(&issued.token, TokenType::Access).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.permissions, vec![Permission::Read]);
        assert_eq!(claims.iss, "docsync-auth");
        assert_eq!(claims.aud, "docsync-api");
        assert_eq!(claims.exp - claims.iat, 86_400);
        assert_eq!(claims.jti, issued.jti);
    }

    #[test]
    fn test_refresh_token_uses_refresh_ttl() {
        let service = service();
        let issued = service.issue_refresh(&user(PermissionSet::read_only())).unwrap();

        assert_eq!(issued.expires_at - issued.issued_at, 604_800);
        assert!(service.verify(&issued.token, TokenType::Refresh).is_ok());
    }

    #[test]
    fn test_tokens_issued_together_are_distinct() {
        let service = service();
        let alice = user(PermissionSet::read_only());

        let first = service.issue_refresh(&alice).unwrap();
        let second = service.issue_refresh(&alice).unwrap();

        assert_ne!(first.token, second.token);
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let service = service();
        let refresh = service.issue_refresh(&user(PermissionSet::read_only())).unwrap();

        assert_eq!(
            service.verify(&refresh.token, TokenType::Access),
            Err(TokenRejection::WrongType {
                expected: TokenType::Access,
                actual: TokenType::Refresh,
            })
        );
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let settings = TokenSettings {
            access_ttl_secs: -120,
            ..TokenSettings::default()
        };
        let service = TokenService::new(settings, &secrets());
        let issued = service.issue_access(&user(PermissionSet::read_only())).unwrap();

        assert_eq!(service.verify(&issued.token, TokenType::Access), Err(TokenRejection::Expired));
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let other = TokenService::new(
            TokenSettings::default(),
            &SecretManager::from_parts("another-secret-that-is-32-chars-long!!", REFRESH_SECRET, None),
        );
        let issued = other.issue_access(&user(PermissionSet::read_only())).unwrap();

        assert_eq!(
            service().verify(&issued.token, TokenType::Access),
            Err(TokenRejection::SignatureInvalid)
        );
    }

    #[test]
    fn test_wrong_audience_is_malformed() {
        let settings = TokenSettings {
            audience: "someone-else".to_string(),
            ..TokenSettings::default()
        };
        let issued = TokenService::new(settings, &secrets())
            .issue_access(&user(PermissionSet::read_only()))
            .unwrap();

        assert_eq!(service().verify(&issued.token, TokenType::Access), Err(TokenRejection::Malformed));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_eq!(service().verify("not.a.jwt", TokenType::Access), Err(TokenRejection::Malformed));
        assert_eq!(service().verify("", TokenType::Access), Err(TokenRejection::Malformed));
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(TokenService::extract_bearer(Some("Bearer abc.def")), Some("abc.def"));
        assert_eq!(TokenService::extract_bearer(Some("bearer abc")), Some("abc"));
        assert_eq!(TokenService::extract_bearer(Some("Basic abc")), None);
        assert_eq!(TokenService::extract_bearer(Some("Bearer ")), None);
        assert_eq!(TokenService::extract_bearer(None), None);
    }

    #[test]
    fn test_has_permission_honours_admin() {
        let service = service();
        let admin = service.issue_access(&user(PermissionSet::new([Permission::Admin]))).unwrap();
        let reader = service.issue_access(&user(PermissionSet::read_only())).unwrap();

        let admin_claims = service.verify(&admin.token, TokenType::Access).unwrap();
        let reader_claims = service.verify(&reader.token, TokenType::Access).unwrap();

        assert!(TokenService::has_permission(&admin_claims, Permission::Delete));
        assert!(TokenService::has_permission(&reader_claims, Permission::Read));
        assert!(!TokenService::has_permission(&reader_claims, Permission::Write));
    }

    #[test]
    fn test_refresh_hash_is_stable_hex() {
        let service = service();

        let first = service.hash_refresh_token("token").unwrap();
        assert_eq!(first, service.hash_refresh_token("token").unwrap());
        assert_ne!(first, service.hash_refresh_token("other").unwrap());
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let output = format!("{:?}", service());
        assert!(!output.contains(JWT_SECRET));
        assert!(!output.contains(REFRESH_SECRET));
    }
}
