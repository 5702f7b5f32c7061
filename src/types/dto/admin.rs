use poem_openapi::Object;

use crate::types::dto::auth::UserDto;
use crate::types::internal::permission::Permission;

/// Paginated user listing
#[derive(Object, Debug)]
pub struct UserListResponse {
    pub users: Vec<UserDto>,

    /// Total number of users across all pages
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// Request to create a user as an administrator
#[derive(Object, Debug)]
pub struct CreateUserRequest {
    #[oai(validator(min_length = 1, max_length = 64))]
    pub username: String,

    pub password: String,

    #[oai(skip_serializing_if_is_none)]
    pub email: Option<String>,

    /// Defaults to read-only when omitted
    #[oai(skip_serializing_if_is_none)]
    pub permissions: Option<Vec<Permission>>,

    #[oai(skip_serializing_if_is_none)]
    pub profile: Option<serde_json::Value>,
}

/// Replacement permission set; `admin` implies every other permission
#[derive(Object, Debug)]
pub struct PermissionsRequest {
    pub permissions: Vec<Permission>,
}

/// Response after hard-deleting a user
#[derive(Object, Debug)]
#[oai(rename_all = "camelCase")]
pub struct DeleteUserResponse {
    pub message: String,
    pub user_id: String,
}
