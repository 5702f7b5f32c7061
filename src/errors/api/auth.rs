use crate::errors::internal::{CredentialError, InternalError};
use crate::types::dto::common::ErrorResponse;
use crate::types::internal::auth::TokenRejection;
use poem_openapi::{payload::Json, ApiResponse};
use std::fmt;

/// Authentication and authorization error responses
#[derive(ApiResponse, Debug)]
pub enum AuthError {
    /// Authorization header or token is missing
    #[oai(status = 401)]
    MissingToken(Json<ErrorResponse>),

    /// Token is malformed or its signature does not verify
    #[oai(status = 401)]
    InvalidToken(Json<ErrorResponse>),

    /// Token has expired
    #[oai(status = 401)]
    ExpiredToken(Json<ErrorResponse>),

    /// Refresh token presented where an access token is required, or vice versa
    #[oai(status = 401)]
    WrongTokenType(Json<ErrorResponse>),

    /// Invalid username or password
    #[oai(status = 401)]
    InvalidCredential(Json<ErrorResponse>),

    /// Caller lacks the required permission
    #[oai(status = 403)]
    InsufficientPermission(Json<ErrorResponse>),

    /// Request is well-formed but not acceptable
    #[oai(status = 400)]
    BadRequest(Json<ErrorResponse>),

    /// User does not exist
    #[oai(status = 404)]
    UserNotFound(Json<ErrorResponse>),

    /// Username or email already in use
    #[oai(status = 409)]
    DuplicateUser(Json<ErrorResponse>),

    /// Credential store is unreachable
    #[oai(status = 503)]
    StoreUnavailable(Json<ErrorResponse>),

    /// Internal server error
    #[oai(status = 500)]
    InternalError(Json<ErrorResponse>),
}

fn body(error: &str, message: impl Into<String>, status_code: u16) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code,
        detail: None,
    })
}

impl AuthError {
    pub fn missing_token() -> Self {
        AuthError::MissingToken(body("missing_token", "Authorization bearer token is required", 401))
    }

    pub fn invalid_token() -> Self {
        AuthError::InvalidToken(body("invalid_token", "Invalid or malformed token", 401))
    }

    pub fn expired_token() -> Self {
        AuthError::ExpiredToken(body("expired_token", "Token has expired", 401))
    }

    pub fn wrong_token_type() -> Self {
        AuthError::WrongTokenType(body("wrong_token_type", "Token type is not accepted here", 401))
    }

    pub fn invalid_credential() -> Self {
        AuthError::InvalidCredential(body("invalid_credential", "Invalid username or password", 401))
    }

    pub fn insufficient_permission(required: &str) -> Self {
        AuthError::InsufficientPermission(body(
            "insufficient_permission",
            format!("Permission '{}' is required", required),
            403,
        ))
    }

    pub fn bad_request(error: &str, message: impl Into<String>) -> Self {
        AuthError::BadRequest(body(error, message, 400))
    }

    pub fn user_not_found() -> Self {
        AuthError::UserNotFound(body("user_not_found", "User not found", 404))
    }

    pub fn duplicate_user() -> Self {
        AuthError::DuplicateUser(body("duplicate_user", "Username or email already exists", 409))
    }

    pub fn store_unavailable() -> Self {
        AuthError::StoreUnavailable(body(
            "store_unavailable",
            "Credential store is temporarily unavailable",
            503,
        ))
    }

    /// Generic internal error; never carries backend text on its own
    pub fn internal_server_error() -> Self {
        AuthError::InternalError(body("internal_error", "An internal error occurred", 500))
    }

    pub fn from_token_rejection(rejection: &TokenRejection) -> Self {
        match rejection {
            TokenRejection::Expired => Self::expired_token(),
            TokenRejection::WrongType { .. } => Self::wrong_token_type(),
            TokenRejection::Malformed | TokenRejection::SignatureInvalid => Self::invalid_token(),
        }
    }

    /// Convert InternalError to AuthError
    ///
    /// This is the explicit conversion point from internal errors to API errors.
    /// Infrastructure details are logged; they reach the client only when
    /// `expose_detail` is set (non-production debugging).
    pub fn from_internal_error(err: InternalError, expose_detail: bool) -> Self {
        let converted = match &err {
            InternalError::Database { operation, .. }
            | InternalError::Transaction { operation, .. }
            | InternalError::Io { operation, .. } => {
                tracing::error!("Store error in {}: {}", operation, err);
                Self::internal_server_error()
            }
            InternalError::StoreUnavailable { operation, .. } => {
                tracing::error!("Store unavailable during {}: {}", operation, err);
                Self::store_unavailable()
            }
            InternalError::Parse { value_type, .. } => {
                tracing::error!("Parse error for {}: {}", value_type, err);
                Self::internal_server_error()
            }
            InternalError::Crypto { operation, .. } => {
                tracing::error!("Crypto error in {}: {}", operation, err);
                Self::internal_server_error()
            }
            InternalError::Unsupported { capability } => {
                tracing::warn!("Unsupported operation requested: {}", capability);
                Self::bad_request("unsupported", "Operation not supported by the active store")
            }
            InternalError::Token(rejection) => {
                tracing::debug!("Token rejected: {}", rejection);
                Self::from_token_rejection(rejection)
            }

            // Domain errors - convert to specific API errors
            InternalError::Credential(CredentialError::InvalidCredentials)
            | InternalError::Credential(CredentialError::InactiveUser(_)) => {
                tracing::debug!("Invalid credentials attempt");
                Self::invalid_credential()
            }
            InternalError::Credential(CredentialError::DuplicateUsername(username)) => {
                tracing::warn!("Duplicate username attempt: {}", username);
                Self::duplicate_user()
            }
            InternalError::Credential(CredentialError::DuplicateEmail(_)) => {
                tracing::warn!("Duplicate email attempt");
                Self::duplicate_user()
            }
            InternalError::Credential(CredentialError::UserNotFound(user_id)) => {
                tracing::debug!("User not found: {}", user_id);
                Self::user_not_found()
            }
            InternalError::Credential(CredentialError::InvalidRefreshToken(reason)) => {
                tracing::debug!("Refresh token rejected: {}", reason);
                Self::invalid_token()
            }
            InternalError::Credential(CredentialError::InsufficientPermission { required }) => {
                tracing::debug!("Permission denied, required {}", required);
                Self::insufficient_permission(required)
            }
            InternalError::Credential(CredentialError::SelfDeletion) => {
                Self::bad_request("self_deletion", "You cannot delete your own account")
            }
            InternalError::Credential(CredentialError::InvalidInput(message)) => {
                Self::bad_request("invalid_input", message.clone())
            }
        };

        if expose_detail && converted.status_code() >= 500 {
            converted.with_detail(err.to_string())
        } else {
            converted
        }
    }

    fn response(&self) -> &ErrorResponse {
        match self {
            AuthError::MissingToken(json)
            | AuthError::InvalidToken(json)
            | AuthError::ExpiredToken(json)
            | AuthError::WrongTokenType(json)
            | AuthError::InvalidCredential(json)
            | AuthError::InsufficientPermission(json)
            | AuthError::BadRequest(json)
            | AuthError::UserNotFound(json)
            | AuthError::DuplicateUser(json)
            | AuthError::StoreUnavailable(json)
            | AuthError::InternalError(json) => &json.0,
        }
    }

    fn with_detail(mut self, detail: String) -> Self {
        match &mut self {
            AuthError::MissingToken(json)
            | AuthError::InvalidToken(json)
            | AuthError::ExpiredToken(json)
            | AuthError::WrongTokenType(json)
            | AuthError::InvalidCredential(json)
            | AuthError::InsufficientPermission(json)
            | AuthError::BadRequest(json)
            | AuthError::UserNotFound(json)
            | AuthError::DuplicateUser(json)
            | AuthError::StoreUnavailable(json)
            | AuthError::InternalError(json) => json.0.detail = Some(detail),
        }
        self
    }

    /// Machine-readable error code
    pub fn code(&self) -> &str {
        &self.response().error
    }

    pub fn message(&self) -> String {
        self.response().message.clone()
    }

    pub fn status_code(&self) -> u16 {
        self.response().status_code
    }

    pub fn detail(&self) -> Option<&str> {
        self.response().detail.as_deref()
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}
