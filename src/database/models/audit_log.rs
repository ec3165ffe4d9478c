use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use super::{Module, macros::string_enum};

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AuditAction {
        Created => "created",
        Updated => "updated",
        Deleted => "deleted",
        StatusChanged => "status_changed",
        Approved => "approved",
        Rejected => "rejected",
        Cancelled => "cancelled",
        Login => "login",
        LoginFailed => "login_failed",
        Registered => "registered",
        PasswordResetRequested => "password_reset_requested",
        PasswordReset => "password_reset",
        PasswordChanged => "password_changed",
        RoleAssigned => "role_assigned",
        PermissionsChanged => "permissions_changed",
        MemberAdded => "member_added",
        MemberRemoved => "member_removed",
        CheckIn => "check_in",
        CheckOut => "check_out",
    }
}

/// A recorded action. Rows are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_email: Option<String>,
    pub action: AuditAction,
    pub module: Module,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub description: String,
    pub metadata: Option<Json<serde_json::Value>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAuditLogInput {
    pub user_id: Option<Uuid>,
    pub user_email: Option<String>,
    pub action: AuditAction,
    pub module: Module,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogFilter {
    pub user_id: Option<Uuid>,
    pub module: Option<Module>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogPage {
    pub items: Vec<AuditLog>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
