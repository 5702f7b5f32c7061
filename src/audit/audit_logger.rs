use std::sync::Arc;

use crate::stores::AuditStore;
use crate::types::internal::audit::AuditEvent;

/// Best-effort audit recorder.
///
/// Every event goes to the `audit` tracing target. When a durable store is
/// attached the event is also persisted; a failed write is logged at warn
/// and swallowed so it can never fail the operation being audited.
pub struct AuditLogger {
    store: Option<Arc<AuditStore>>,
}

impl AuditLogger {
    pub fn durable(store: Arc<AuditStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Logger with no persistent sink (file backend)
    pub fn tracing_only() -> Self {
        Self { store: None }
    }

    pub async fn record(&self, event: AuditEvent) {
        tracing::info!(
            target: "audit",
            action = %event.action,
            success = event.success,
            user_id = event.user_id.as_deref().unwrap_or("-"),
            username = event.username.as_deref().unwrap_or("-"),
            ip_address = event.ip_address.as_deref().unwrap_or("-"),
            detail = %serde_json::Value::Object(event.detail.clone()),
            "audit event"
        );

        if let Some(store) = &self.store {
            let action = event.action.to_string();
            if let Err(e) = store.write_event(event).await {
                tracing::warn!(action = %action, error = %e, "Failed to persist audit event");
            }
        }
    }
}
