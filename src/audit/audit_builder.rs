use serde::Serialize;
use serde_json::json;

use crate::services::crypto::sha256_hex;
use crate::types::internal::audit::{AuditEvent, EventType};
use crate::types::internal::context::ClientMeta;
use crate::types::internal::user::User;

/// Fluent construction of audit events
///
/// ```ignore
/// store
///     .record_event(
///         AuditBuilder::new(EventType::LoginFailure, false)
///             .username("alice")
///             .client(&meta)
///             .add_field("reason", "bad_password")
///             .build(),
///     )
///     .await;
/// ```
pub struct AuditBuilder {
    event: AuditEvent,
}

impl AuditBuilder {
    pub fn new(action: impl Into<EventType>, success: bool) -> Self {
        Self {
            event: AuditEvent::new(action.into(), success),
        }
    }

    pub fn user(mut self, user: &User) -> Self {
        self.event.user_id = Some(user.id.clone());
        self.event.username = Some(user.username.clone());
        self
    }

    pub fn user_id(mut self, id: impl Into<String>) -> Self {
        self.event.user_id = Some(id.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.event.username = Some(username.into());
        self
    }

    pub fn client(mut self, meta: &ClientMeta) -> Self {
        self.event.ip_address = meta.ip_address.clone();
        self.event.user_agent = meta.user_agent.clone();
        self
    }

    /// Add an arbitrary JSON-serializable field to the detail blob
    pub fn add_field(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.event.detail.insert(key.into(), value);
        }
        self
    }

    /// Add a field as its SHA-256 digest so events correlate without exposing the value
    pub fn add_sensitive(mut self, key: impl Into<String>, value: &str) -> Self {
        self.event
            .detail
            .insert(key.into(), json!(format!("sha256:{}", sha256_hex(value))));
        self
    }

    pub fn build(self) -> AuditEvent {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_populates_event() {
        let meta = ClientMeta::new(Some("10.0.0.1".to_string()), Some("curl/8".to_string()));

        let event = AuditBuilder::new(EventType::LoginFailure, false)
            .username("alice")
            .client(&meta)
            .add_field("reason", "bad_password")
            .build();

        assert_eq!(event.action, EventType::LoginFailure);
        assert!(!event.success);
        assert_eq!(event.username.as_deref(), Some("alice"));
        assert_eq!(event.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(event.detail["reason"], json!("bad_password"));
    }

    #[test]
    fn test_sensitive_fields_are_hashed() {
        let event = AuditBuilder::new("token_lookup", true)
            .add_sensitive("token", "raw-refresh-token")
            .build();

        let stored = event.detail["token"].as_str().unwrap();
        assert!(stored.starts_with("sha256:"));
        assert!(!stored.contains("raw-refresh-token"));
        assert_eq!(event.action, EventType::Custom("token_lookup".to_string()));
    }
}
