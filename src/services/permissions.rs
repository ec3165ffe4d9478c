use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};

use crate::database::models::{Action, Module, Permission};

/// Flattened `module -> actions` lookup table for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    grants: BTreeMap<Module, BTreeSet<Action>>,
}

impl PermissionSet {
    /// Folds a permission list into a set; repeated modules are merged.
    pub fn from_permissions(permissions: &[Permission]) -> Self {
        let mut grants: BTreeMap<Module, BTreeSet<Action>> = BTreeMap::new();
        for permission in permissions {
            grants
                .entry(permission.module)
                .or_default()
                .extend(permission.actions.iter().copied());
        }
        grants.retain(|_, actions| !actions.is_empty());
        Self { grants }
    }

    /// Role permissions with per-user overrides applied.
    ///
    /// An override entry replaces the role's entry for its module; an entry
    /// with no actions revokes the module entirely.
    pub fn resolve(role: Option<&[Permission]>, overrides: Option<&[Permission]>) -> Self {
        let mut resolved = role.map(Self::from_permissions).unwrap_or_default();

        if let Some(overrides) = overrides {
            let mut replaced: BTreeMap<Module, BTreeSet<Action>> = BTreeMap::new();
            for permission in overrides {
                replaced
                    .entry(permission.module)
                    .or_default()
                    .extend(permission.actions.iter().copied());
            }

            for (module, actions) in replaced {
                if actions.is_empty() {
                    resolved.grants.remove(&module);
                } else {
                    resolved.grants.insert(module, actions);
                }
            }
        }

        resolved
    }

    pub fn allows(&self, module: Module, action: Action) -> bool {
        self.grants
            .get(&module)
            .is_some_and(|actions| actions.contains(&action))
    }

    pub fn has_module(&self, module: Module) -> bool {
        self.grants.contains_key(&module)
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn to_permissions(&self) -> Vec<Permission> {
        self.grants
            .iter()
            .map(|(module, actions)| Permission {
                module: *module,
                actions: actions.iter().copied().collect(),
            })
            .collect()
    }
}

impl Serialize for PermissionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_permissions().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hr_role() -> Vec<Permission> {
        vec![
            Permission::new(Module::Employees, &[Action::Create, Action::Read]),
            Permission::new(Module::Leave, &[Action::Read, Action::Approve]),
            Permission::new(Module::Employees, &[Action::Update]),
        ]
    }

    #[test]
    fn test_role_permissions_are_merged() {
        let set = PermissionSet::from_permissions(&hr_role());

        assert!(set.allows(Module::Employees, Action::Create));
        assert!(set.allows(Module::Employees, Action::Update));
        assert!(set.allows(Module::Leave, Action::Approve));
        assert!(!set.allows(Module::Employees, Action::Delete));
        assert!(!set.has_module(Module::Payroll));
    }

    #[test]
    fn test_override_replaces_module_entry() {
        let overrides = vec![Permission::new(Module::Leave, &[Action::Read])];
        let set = PermissionSet::resolve(Some(&hr_role()), Some(&overrides));

        assert!(set.allows(Module::Leave, Action::Read));
        assert!(!set.allows(Module::Leave, Action::Approve));
        // untouched modules keep the role's grants
        assert!(set.allows(Module::Employees, Action::Create));
    }

    #[test]
    fn test_empty_override_revokes_module() {
        let overrides = vec![Permission::new(Module::Employees, &[])];
        let set = PermissionSet::resolve(Some(&hr_role()), Some(&overrides));

        assert!(!set.has_module(Module::Employees));
        assert!(set.has_module(Module::Leave));
    }

    #[test]
    fn test_override_can_grant_new_module() {
        let overrides = vec![Permission::new(Module::Finance, &[Action::Read])];
        let set = PermissionSet::resolve(Some(&hr_role()), Some(&overrides));

        assert!(set.allows(Module::Finance, Action::Read));
    }

    #[test]
    fn test_user_without_role() {
        assert!(PermissionSet::resolve(None, None).is_empty());

        let overrides = vec![Permission::new(Module::Tasks, &[Action::Read])];
        let set = PermissionSet::resolve(None, Some(&overrides));
        assert!(set.allows(Module::Tasks, Action::Read));
        assert!(!set.has_module(Module::Projects));
    }

    #[test]
    fn test_empty_role_entry_is_not_module_access() {
        let set = PermissionSet::from_permissions(&[Permission::new(Module::Content, &[])]);
        assert!(!set.has_module(Module::Content));
    }

    #[test]
    fn test_serializes_as_sorted_permission_list() {
        let set = PermissionSet::from_permissions(&hr_role());
        let json = serde_json::to_value(&set).unwrap();

        assert_eq!(
            json,
            serde_json::json!([
                {"module": "employees", "actions": ["create", "read", "update"]},
                {"module": "leave", "actions": ["read", "approve"]},
            ])
        );
    }
}
