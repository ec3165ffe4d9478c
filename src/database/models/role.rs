use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use super::macros::string_enum;

pub const SUPER_ADMIN_ROLE: &str = "super_admin";
pub const ADMIN_ROLE: &str = "admin";
pub const DEFAULT_ROLE: &str = "employee";

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Module {
        Users => "users",
        Roles => "roles",
        Employees => "employees",
        Attendance => "attendance",
        Leave => "leave",
        Payroll => "payroll",
        Finance => "finance",
        Projects => "projects",
        Tasks => "tasks",
        Teams => "teams",
        Content => "content",
        Analytics => "analytics",
        AuditLogs => "audit_logs",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Action {
        Create => "create",
        Read => "read",
        Update => "update",
        Delete => "delete",
        Approve => "approve",
        Export => "export",
    }
}

/// A grant of `actions` on one `module`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub module: Module,
    pub actions: Vec<Action>,
}

impl Permission {
    pub fn new(module: Module, actions: &[Action]) -> Self {
        Self {
            module,
            actions: actions.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Json<Vec<Permission>>,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn is_super_admin(&self) -> bool {
        self.name == SUPER_ADMIN_ROLE
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl RoleInput {
    /// Role names are lowercase snake case so they can be matched in `authorize` lists.
    pub fn validate(&self) -> Result<(), String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Role name is required".to_string());
        }
        if name.len() > 64 {
            return Err("Role name must be at most 64 characters".to_string());
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(
                "Role name may only contain lowercase letters, digits and underscores".to_string(),
            );
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCatalogEntry {
    pub module: Module,
    pub actions: &'static [Action],
}

pub fn module_catalog() -> Vec<ModuleCatalogEntry> {
    Module::ALL
        .iter()
        .map(|module| ModuleCatalogEntry {
            module: *module,
            actions: Action::ALL,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_round_trip_through_str() {
        for module in Module::ALL {
            assert_eq!(module.as_str().parse::<Module>().unwrap(), *module);
        }
        assert_eq!("AUDIT_LOGS".parse::<Module>().unwrap(), Module::AuditLogs);
        assert!("inventory".parse::<Module>().is_err());
    }

    #[test]
    fn test_permission_json_shape() {
        let permission = Permission::new(Module::Leave, &[Action::Read, Action::Approve]);
        let json = serde_json::to_value(&permission).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"module": "leave", "actions": ["read", "approve"]})
        );
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result: Result<Permission, _> =
            serde_json::from_str(r#"{"module":"leave","actions":["fly"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_role_name_validation() {
        let input = |name: &str| RoleInput {
            name: name.to_string(),
            description: None,
            permissions: vec![],
        };

        assert!(input("hr_manager").validate().is_ok());
        assert!(input("").validate().is_err());
        assert!(input("HR Manager").validate().is_err());
        assert!(input(&"a".repeat(65)).validate().is_err());
    }

    #[test]
    fn test_catalog_covers_every_module() {
        let catalog = module_catalog();
        assert_eq!(catalog.len(), Module::ALL.len());
        assert!(catalog.iter().all(|entry| entry.actions.len() == 6));
    }
}
