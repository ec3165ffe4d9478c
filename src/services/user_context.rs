use actix_web::{FromRequest, HttpRequest, dev::Payload, web::Data};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;

use crate::{
    database::{
        models::{ADMIN_ROLE, Action, Module, Permission, Role, SUPER_ADMIN_ROLE, User},
        repositories::UserRepository,
    },
    error::AppError,
    services::{Claims, PermissionSet, RoleCache},
};

/// The authenticated caller: account, role and resolved permissions.
///
/// Extracting it authenticates the request. The guard methods below form
/// the rest of the chain and are called by each handler.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user: User,
    pub role: Option<Role>,
    pub permissions: PermissionSet,
}

impl UserContext {
    pub fn new(user: User, role: Option<Role>) -> Self {
        let permissions = PermissionSet::resolve(
            role.as_ref().map(|r| r.permissions.0.as_slice()),
            user.permission_overrides(),
        );

        Self {
            user,
            role,
            permissions,
        }
    }

    pub async fn load(
        user_id: Uuid,
        users: &UserRepository,
        roles: &RoleCache,
    ) -> Result<Self, AppError> {
        let user = users.find_by_id(user_id).await?.ok_or_else(|| {
            log::warn!("Token refers to missing user {}", user_id);
            AppError::Unauthorized
        })?;

        if !user.is_active {
            log::warn!("Deactivated user {} attempted access", user.id);
            return Err(AppError::Forbidden("Account is deactivated".to_string()));
        }

        let role = match user.role_id {
            Some(role_id) => roles.get(role_id).await?,
            None => None,
        };

        Ok(Self::new(user, role))
    }

    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn user_email(&self) -> &str {
        &self.user.email
    }

    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().map(|r| r.name.as_str())
    }

    pub fn is_super_admin(&self) -> bool {
        self.role.as_ref().is_some_and(Role::is_super_admin)
    }

    pub fn is_self(&self, user_id: Uuid) -> bool {
        self.user.id == user_id
    }

    pub fn can(&self, module: Module, action: Action) -> bool {
        self.is_super_admin() || self.permissions.allows(module, action)
    }

    pub fn has_module_access(&self, module: Module) -> bool {
        self.is_super_admin() || self.permissions.has_module(module)
    }

    /// Passes when the caller's role is one of `roles`.
    pub fn authorize(&self, roles: &[&str]) -> Result<(), AppError> {
        if self.is_super_admin() {
            return Ok(());
        }

        match self.role_name() {
            Some(name) if roles.contains(&name) => Ok(()),
            role => {
                log::warn!(
                    "User {} with role {:?} denied; requires one of {:?}",
                    self.user.id,
                    role,
                    roles
                );
                Err(AppError::Forbidden(
                    "Your role is not allowed to perform this action".to_string(),
                ))
            }
        }
    }

    pub fn check_permission(&self, module: Module, action: Action) -> Result<(), AppError> {
        if self.can(module, action) {
            return Ok(());
        }

        log::warn!(
            "User {} denied {} on {}",
            self.user.id,
            action,
            module
        );
        Err(AppError::PermissionDenied(format!(
            "Missing permission {module}:{action}"
        )))
    }

    pub fn check_module_access(&self, module: Module) -> Result<(), AppError> {
        if self.has_module_access(module) {
            return Ok(());
        }

        log::warn!("User {} denied access to module {}", self.user.id, module);
        Err(AppError::PermissionDenied(format!(
            "No access to module {module}"
        )))
    }

    /// What the caller may do; super admins get the full catalogue.
    pub fn effective_permissions(&self) -> Vec<Permission> {
        if self.is_super_admin() {
            return Module::ALL
                .iter()
                .map(|module| Permission::new(*module, Action::ALL))
                .collect();
        }
        self.permissions.to_permissions()
    }
}

impl FromRequest for UserContext {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        // Token first: a bad token must not cost a database round trip
        let claims = Claims::from_request(req, payload).into_inner();
        let users = req.app_data::<Data<UserRepository>>().cloned();
        let roles = req.app_data::<Data<RoleCache>>().cloned();

        Box::pin(async move {
            let claims = claims?;

            let (Some(users), Some(roles)) = (users, roles) else {
                log::error!("UserRepository or RoleCache missing from app data");
                return Err(AppError::internal_server_error());
            };

            UserContext::load(claims.user_id(), &users, &roles).await
        })
    }
}

/// Checks both that the caller's role is listed and that the permission is held.
pub fn authorize_with_permission(
    ctx: &UserContext,
    roles: &[&str],
    module: Module,
    action: Action,
) -> Result<(), AppError> {
    ctx.authorize(roles)?;
    ctx.check_permission(module, action)
}

pub const ROLE_ADMINS: &[&str] = &[SUPER_ADMIN_ROLE, ADMIN_ROLE];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;

    fn role(name: &str, permissions: Vec<Permission>) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            permissions: Json(permissions),
            is_system: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user() -> User {
        User::new(
            "grace@example.com".to_string(),
            "hash".to_string(),
            "Grace".to_string(),
            None,
        )
    }

    #[test]
    fn test_super_admin_passes_every_guard() {
        let ctx = UserContext::new(user(), Some(role(SUPER_ADMIN_ROLE, vec![])));

        assert!(ctx.check_permission(Module::Payroll, Action::Approve).is_ok());
        assert!(ctx.check_module_access(Module::AuditLogs).is_ok());
        assert!(ctx.authorize(&["hr_manager"]).is_ok());
        assert_eq!(ctx.effective_permissions().len(), Module::ALL.len());
    }

    #[test]
    fn test_permission_guard_follows_role() {
        let ctx = UserContext::new(
            user(),
            Some(role(
                "hr_manager",
                vec![Permission::new(Module::Leave, &[Action::Read, Action::Approve])],
            )),
        );

        assert!(ctx.check_permission(Module::Leave, Action::Approve).is_ok());
        assert!(matches!(
            ctx.check_permission(Module::Leave, Action::Delete),
            Err(AppError::PermissionDenied(_))
        ));
        assert!(ctx.check_module_access(Module::Leave).is_ok());
        assert!(ctx.check_module_access(Module::Finance).is_err());
    }

    #[test]
    fn test_authorize_by_role_name() {
        let ctx = UserContext::new(user(), Some(role("admin", vec![])));
        assert!(ctx.authorize(ROLE_ADMINS).is_ok());

        let ctx = UserContext::new(user(), Some(role("employee", vec![])));
        assert!(matches!(
            ctx.authorize(ROLE_ADMINS),
            Err(AppError::Forbidden(_))
        ));

        let ctx = UserContext::new(user(), None);
        assert!(ctx.authorize(ROLE_ADMINS).is_err());
    }

    #[test]
    fn test_user_overrides_apply() {
        let mut user = user();
        user.custom_permissions = Some(Json(vec![
            Permission::new(Module::Tasks, &[]),
            Permission::new(Module::Finance, &[Action::Read]),
        ]));

        let ctx = UserContext::new(
            user,
            Some(role(
                "employee",
                vec![Permission::new(Module::Tasks, &[Action::Read])],
            )),
        );

        assert!(!ctx.can(Module::Tasks, Action::Read));
        assert!(ctx.can(Module::Finance, Action::Read));
    }

    #[test]
    fn test_combined_guard_requires_both() {
        let ctx = UserContext::new(
            user(),
            Some(role(
                "hr_manager",
                vec![Permission::new(Module::Users, &[Action::Update])],
            )),
        );

        assert!(
            authorize_with_permission(&ctx, ROLE_ADMINS, Module::Users, Action::Update).is_err()
        );

        let ctx = UserContext::new(
            user(),
            Some(role("admin", vec![Permission::new(Module::Users, &[Action::Read])])),
        );
        assert!(
            authorize_with_permission(&ctx, ROLE_ADMINS, Module::Users, Action::Update).is_err()
        );
    }
}
