use serde_json::Value;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    database::{
        models::{AuditAction, AuditLog, CreateAuditLogInput, Module, User},
        repositories::AuditLogRepository,
    },
    middleware::RequestInfo,
};

/// One audit trail entry, assembled by the handler that performed the action.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    action: AuditAction,
    module: Module,
    entity_type: String,
    entity_id: Option<Uuid>,
    description: String,
    metadata: Option<Value>,
    user_id: Option<Uuid>,
    user_email: Option<String>,
}

impl AuditEntry {
    pub fn new(
        module: Module,
        action: AuditAction,
        entity_type: &str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action,
            module,
            entity_type: entity_type.to_string(),
            entity_id: None,
            description: description.into(),
            metadata: None,
            user_id: None,
            user_email: None,
        }
    }

    pub fn entity(mut self, entity_id: Uuid) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn actor(mut self, user: &User) -> Self {
        self.user_id = Some(user.id);
        self.user_email = Some(user.email.clone());
        self
    }

    /// Used for failed logins, where only the attempted email is known.
    pub fn actor_email(mut self, email: &str) -> Self {
        self.user_email = Some(email.to_string());
        self
    }

    fn into_input(self, request: &RequestInfo) -> CreateAuditLogInput {
        CreateAuditLogInput {
            user_id: self.user_id,
            user_email: self.user_email,
            action: self.action,
            module: self.module,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            description: self.description,
            metadata: self.metadata,
            ip_address: Some(request.ip_address.clone()),
            user_agent: Some(request.user_agent.clone()),
        }
    }
}

#[derive(Clone)]
pub struct AuditLogger {
    repository: AuditLogRepository,
}

impl AuditLogger {
    pub fn new(repository: AuditLogRepository) -> Self {
        Self { repository }
    }

    /// Writes the entry inside the caller's transaction, so it commits or
    /// rolls back together with the change it describes.
    pub async fn record(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        request: &RequestInfo,
        entry: AuditEntry,
    ) -> Result<AuditLog, sqlx::Error> {
        AuditLogRepository::insert(&mut **tx, entry.into_input(request)).await
    }

    /// Writes the entry on its own connection. A failure is logged and
    /// swallowed; authentication must not fail because the trail is down.
    pub async fn record_detached(&self, request: &RequestInfo, entry: AuditEntry) {
        let action = entry.action;
        if let Err(err) =
            AuditLogRepository::insert(self.repository.pool(), entry.into_input(request)).await
        {
            log::error!("Failed to record {} audit entry: {}", action, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request() -> RequestInfo {
        RequestInfo {
            user_agent: "curl/8.0".to_string(),
            ip_address: "10.0.0.7".to_string(),
            method: "POST".to_string(),
            path: "/api/v1/leaves".to_string(),
        }
    }

    #[test]
    fn test_entry_carries_actor_and_client() {
        let user = User::new(
            "ada@example.com".to_string(),
            "hash".to_string(),
            "Ada".to_string(),
            None,
        );
        let leave_id = Uuid::new_v4();

        let input = AuditEntry::new(Module::Leave, AuditAction::Approved, "leave", "Leave approved")
            .entity(leave_id)
            .actor(&user)
            .metadata(serde_json::json!({"from": "pending"}))
            .into_input(&request());

        assert_eq!(input.user_id, Some(user.id));
        assert_eq!(input.user_email.as_deref(), Some("ada@example.com"));
        assert_eq!(input.entity_id, Some(leave_id));
        assert_eq!(input.ip_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(input.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(input.metadata, Some(serde_json::json!({"from": "pending"})));
    }

    #[test]
    fn test_failed_login_entry_has_no_user_id() {
        let input = AuditEntry::new(Module::Users, AuditAction::LoginFailed, "user", "Login failed")
            .actor_email("nobody@example.com")
            .into_input(&request());

        assert_eq!(input.user_id, None);
        assert_eq!(input.user_email.as_deref(), Some("nobody@example.com"));
        assert_eq!(input.entity_id, None);
    }
}
