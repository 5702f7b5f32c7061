use std::fmt;

/// Action tags recorded in the audit trail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    LoginSuccess,
    LoginFailure,
    AccessTokenRefreshed,
    RefreshRejected,
    RefreshTokenRevoked,
    PasswordChanged,
    PasswordChangeFailed,
    UserCreated,
    UserDeleted,
    UserDeactivated,
    PermissionsUpdated,
    ProfileUpdated,
    DefaultAdminCreated,
    SessionStarted,
    Custom(String),
}

impl EventType {
    /// Convert EventType to string representation for database storage
    pub fn as_str(&self) -> &str {
        match self {
            Self::LoginSuccess => "login_success",
            Self::LoginFailure => "login_failure",
            Self::AccessTokenRefreshed => "access_token_refreshed",
            Self::RefreshRejected => "refresh_rejected",
            Self::RefreshTokenRevoked => "refresh_token_revoked",
            Self::PasswordChanged => "password_changed",
            Self::PasswordChangeFailed => "password_change_failed",
            Self::UserCreated => "user_created",
            Self::UserDeleted => "user_deleted",
            Self::UserDeactivated => "user_deactivated",
            Self::PermissionsUpdated => "permissions_updated",
            Self::ProfileUpdated => "profile_updated",
            Self::DefaultAdminCreated => "default_admin_created",
            Self::SessionStarted => "session_started",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<T: Into<String>> From<T> for EventType {
    fn from(s: T) -> Self {
        EventType::Custom(s.into())
    }
}

/// Audit event structure for building and storing audit logs.
///
/// The timestamp is assigned by the sink at write time.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: EventType,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub success: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub detail: serde_json::Map<String, serde_json::Value>,
}

impl AuditEvent {
    /// Create a new audit event with the specified action
    pub fn new(action: EventType, success: bool) -> Self {
        Self {
            action,
            user_id: None,
            username: None,
            success,
            ip_address: None,
            user_agent: None,
            detail: serde_json::Map::new(),
        }
    }
}
