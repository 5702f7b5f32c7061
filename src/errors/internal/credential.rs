use thiserror::Error;

#[derive(Error, Debug)]
pub enum CredentialError {
    /// Unknown username, wrong password or inactive account; never differentiated externally
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User already exists: {0}")]
    DuplicateUsername(String),

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User is inactive: {0}")]
    InactiveUser(String),

    #[error("Refresh token rejected: {0}")]
    InvalidRefreshToken(String),

    #[error("Missing required permission: {required}")]
    InsufficientPermission { required: String },

    #[error("Administrators cannot delete their own account")]
    SelfDeletion,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CredentialError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_refresh_token(reason: impl Into<String>) -> Self {
        Self::InvalidRefreshToken(reason.into())
    }

    pub fn insufficient_permission(required: impl Into<String>) -> Self {
        Self::InsufficientPermission {
            required: required.into(),
        }
    }
}
