use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::errors::InternalError;
use crate::types::db::audit_event;
use crate::types::internal::audit::AuditEvent;

/// Repository for audit event storage operations
pub struct AuditStore {
    db: DatabaseConnection,
}

impl AuditStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Append an audit event; the timestamp is assigned here
    pub async fn write_event(&self, event: AuditEvent) -> Result<(), InternalError> {
        let detail = serde_json::to_string(&event.detail)
            .map_err(|e| InternalError::parse("audit_detail", e.to_string()))?;

        let row = audit_event::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            user_id: Set(event.user_id),
            username: Set(event.username),
            action: Set(event.action.to_string()),
            success: Set(event.success),
            ip_address: Set(event.ip_address),
            user_agent: Set(event.user_agent),
            detail: Set(detail),
            created_at: Set(Utc::now().timestamp()),
        };

        row.insert(&self.db)
            .await
            .map_err(|e| InternalError::database("write_audit_event", e))?;

        Ok(())
    }

    /// Delete events created before `cutoff` (unix seconds)
    pub async fn prune_older_than(&self, cutoff: i64) -> Result<u64, InternalError> {
        let result = audit_event::Entity::delete_many()
            .filter(audit_event::Column::CreatedAt.lt(cutoff))
            .exec(&self.db)
            .await
            .map_err(|e| InternalError::database("prune_audit_events", e))?;

        Ok(result.rows_affected)
    }

    /// Events referencing a user, oldest first
    pub async fn events_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<audit_event::Model>, InternalError> {
        audit_event::Entity::find()
            .filter(audit_event::Column::UserId.eq(user_id))
            .order_by_asc(audit_event::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("list_audit_events", e))
    }

    /// Remove every event referencing a user, on the caller's connection or transaction
    pub async fn delete_for_user<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
    ) -> Result<u64, InternalError> {
        let result = audit_event::Entity::delete_many()
            .filter(audit_event::Column::UserId.eq(user_id))
            .exec(conn)
            .await
            .map_err(|e| InternalError::transaction("delete_user_audit_events", e))?;

        Ok(result.rows_affected)
    }
}
