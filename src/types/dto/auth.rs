use poem_openapi::Object;

use crate::types::internal::permission::Permission;
use crate::types::internal::user::User;

/// Request model for user login
#[derive(Object, Debug)]
pub struct LoginRequest {
    /// Username for authentication
    #[oai(validator(min_length = 1))]
    pub username: String,

    /// Password for authentication
    pub password: String,
}

/// Public view of an account; never carries the password hash
#[derive(Object, Debug, Clone)]
#[oai(rename_all = "camelCase")]
pub struct UserDto {
    /// UUID under the relational backend, the username under the file backend
    pub id: String,
    pub username: String,
    #[oai(skip_serializing_if_is_none)]
    pub email: Option<String>,
    pub permissions: Vec<Permission>,
    pub profile: serde_json::Value,
    pub is_active: bool,
    /// Unix timestamp (seconds)
    pub created_at: i64,
    /// Unix timestamp (seconds)
    pub updated_at: i64,
    #[oai(skip_serializing_if_is_none)]
    pub last_login_at: Option<i64>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            permissions: user.permissions.to_vec(),
            id: user.id,
            username: user.username,
            email: user.email,
            profile: user.profile,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
            last_login_at: user.last_login_at,
        }
    }
}

/// Response model for a successful login
#[derive(Object, Debug)]
#[oai(rename_all = "camelCase")]
pub struct LoginResponse {
    /// JWT access token for API authentication
    pub access_token: String,

    /// Refresh token for obtaining new access tokens
    pub refresh_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Number of seconds until the access token expires
    pub expires_in: i64,

    pub user: UserDto,
}

/// Request model for token refresh and logout
#[derive(Object, Debug)]
#[oai(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response model for token refresh
#[derive(Object, Debug)]
#[oai(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// New JWT access token; the refresh token itself is not rotated
    pub access_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Number of seconds until the access token expires
    pub expires_in: i64,
}

#[derive(Object, Debug)]
#[oai(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,

    #[oai(validator(min_length = 1))]
    pub new_password: String,
}

/// Generic acknowledgement
#[derive(Object, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response model for the current-user endpoint
#[derive(Object, Debug)]
pub struct MeResponse {
    pub username: String,
    pub permissions: Vec<Permission>,
    pub profile: serde_json::Value,
}

impl From<User> for MeResponse {
    fn from(user: User) -> Self {
        Self {
            permissions: user.permissions.to_vec(),
            username: user.username,
            profile: user.profile,
        }
    }
}

/// Replacement profile; must be a JSON object
#[derive(Object, Debug)]
pub struct ProfileUpdateRequest {
    pub profile: serde_json::Value,
}
