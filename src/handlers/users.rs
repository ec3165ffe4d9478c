use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    database::{
        models::{
            Action, AdminCreateUserInput, AssignRoleInput, AuditAction, DEFAULT_ROLE, Module,
            Permission, UpdateUserInput, User, UserInfo, UserPermissionsInput,
            UserPermissionsResponse,
        },
        repositories::{RoleRepository, UserRepository},
    },
    error::AppError,
    handlers::shared::{ApiResponse, Pagination},
    middleware::RequestInfo,
    services::{
        AuditEntry, AuditLogger, AuthService, RoleCache, UserContext,
        auth::{validate_email, validate_password},
        user_context::{ROLE_ADMINS, authorize_with_permission},
    },
};

async fn find_user(repo: &UserRepository, user_id: Uuid) -> Result<User, AppError> {
    repo.find_by_id(user_id).await?.ok_or_else(|| {
        log::warn!("User {} not found", user_id);
        AppError::NotFound("User not found".to_string())
    })
}

/// Only a super admin may act on another super admin's account.
async fn guard_super_admin_target(
    ctx: &UserContext,
    target: &User,
    roles: &RoleCache,
) -> Result<(), AppError> {
    if ctx.is_super_admin() {
        return Ok(());
    }

    let target_role = match target.role_id {
        Some(role_id) => roles.get(role_id).await?,
        None => None,
    };

    if target_role.is_some_and(|role| role.is_super_admin()) {
        log::warn!(
            "User {} attempted to modify super admin {}",
            ctx.user_id(),
            target.id
        );
        return Err(AppError::Forbidden(
            "Only a super admin can modify a super admin account".to_string(),
        ));
    }

    Ok(())
}

pub async fn list_users(
    ctx: UserContext,
    user_repo: web::Data<UserRepository>,
    page: web::Query<Pagination>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Users, Action::Read)?;

    let users: Vec<UserInfo> = user_repo
        .list_users(page.limit(), page.offset())
        .await?
        .into_iter()
        .map(UserInfo::from)
        .collect();

    Ok(ApiResponse::success(users))
}

pub async fn get_user(
    path: web::Path<Uuid>,
    ctx: UserContext,
    user_repo: web::Data<UserRepository>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    if !ctx.is_self(user_id) {
        ctx.check_permission(Module::Users, Action::Read)?;
    }

    let user = find_user(&user_repo, user_id).await?;

    Ok(ApiResponse::success(UserInfo::from(user)))
}

pub async fn create_user(
    ctx: UserContext,
    pool: web::Data<PgPool>,
    user_repo: web::Data<UserRepository>,
    role_repo: web::Data<RoleRepository>,
    auth_service: web::Data<AuthService>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<AdminCreateUserInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Users, Action::Create)?;

    let input = input.into_inner();
    let email = input.email.trim().to_lowercase();
    let name = input.name.trim().to_string();

    validate_email(&email)?;
    validate_password(&input.password)?;
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    let role = match input.role_id {
        Some(role_id) => {
            ctx.authorize(ROLE_ADMINS)?;
            let role = role_repo
                .find_by_id(role_id)
                .await?
                .ok_or_else(|| AppError::BadRequest("Role does not exist".to_string()))?;
            if role.is_super_admin() && !ctx.is_super_admin() {
                return Err(AppError::Forbidden(
                    "Only a super admin can grant the super admin role".to_string(),
                ));
            }
            Some(role)
        }
        None => role_repo.find_by_name(DEFAULT_ROLE).await?,
    };

    if user_repo.email_exists(&email).await? {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }

    let password_hash = auth_service.hash_password(&input.password)?;
    let user = User::new(email, password_hash, name, role.as_ref().map(|r| r.id));

    let mut tx = pool.begin().await?;
    let user = user_repo.create_user(&mut tx, &user).await?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Users,
                AuditAction::Created,
                "user",
                format!("User {} created", user.email),
            )
            .entity(user.id)
            .actor(&ctx.user)
            .metadata(json!({ "role": role.as_ref().map(|r| r.name.as_str()) })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::created(UserInfo::from(user)))
}

pub async fn update_user(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    user_repo: web::Data<UserRepository>,
    role_cache: web::Data<RoleCache>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<UpdateUserInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Users, Action::Update)?;

    let user_id = path.into_inner();
    let input = input.into_inner();
    let email = input.email.trim().to_lowercase();
    let name = input.name.trim().to_string();

    validate_email(&email)?;
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    if ctx.is_self(user_id) && input.is_active == Some(false) {
        return Err(AppError::BadRequest(
            "You cannot deactivate your own account".to_string(),
        ));
    }

    let existing = find_user(&user_repo, user_id).await?;
    guard_super_admin_target(&ctx, &existing, &role_cache).await?;

    let mut tx = pool.begin().await?;
    let user = user_repo
        .update_user(&mut tx, user_id, &name, &email, input.is_active)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Users,
                AuditAction::Updated,
                "user",
                format!("User {} updated", user.email),
            )
            .entity(user.id)
            .actor(&ctx.user)
            .metadata(json!({
                "previousEmail": existing.email,
                "previousName": existing.name,
                "isActive": user.is_active,
            })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(UserInfo::from(user)))
}

pub async fn delete_user(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    user_repo: web::Data<UserRepository>,
    role_cache: web::Data<RoleCache>,
    audit_logger: web::Data<AuditLogger>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Users, Action::Delete)?;

    let user_id = path.into_inner();
    if ctx.is_self(user_id) {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    let existing = find_user(&user_repo, user_id).await?;
    guard_super_admin_target(&ctx, &existing, &role_cache).await?;

    let mut tx = pool.begin().await?;
    if !user_repo.delete_user(&mut tx, user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Users,
                AuditAction::Deleted,
                "user",
                format!("User {} deleted", existing.email),
            )
            .entity(user_id)
            .actor(&ctx.user),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success_message("User deleted successfully"))
}

pub async fn assign_role(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    user_repo: web::Data<UserRepository>,
    role_cache: web::Data<RoleCache>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<AssignRoleInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    authorize_with_permission(&ctx, ROLE_ADMINS, Module::Users, Action::Update)?;

    let user_id = path.into_inner();
    let existing = find_user(&user_repo, user_id).await?;
    guard_super_admin_target(&ctx, &existing, &role_cache).await?;

    let role = role_cache
        .get(input.role_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Role does not exist".to_string()))?;

    if role.is_super_admin() && !ctx.is_super_admin() {
        return Err(AppError::Forbidden(
            "Only a super admin can grant the super admin role".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;
    let user = user_repo
        .assign_role(&mut tx, user_id, role.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Users,
                AuditAction::RoleAssigned,
                "user",
                format!("Role {} assigned to {}", role.name, user.email),
            )
            .entity(user.id)
            .actor(&ctx.user)
            .metadata(json!({
                "roleId": role.id,
                "roleName": role.name,
                "previousRoleId": existing.role_id,
            })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(UserInfo::from(user)))
}

pub async fn get_user_permissions(
    path: web::Path<Uuid>,
    ctx: UserContext,
    user_repo: web::Data<UserRepository>,
    role_cache: web::Data<RoleCache>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    if !ctx.is_self(user_id) {
        ctx.check_permission(Module::Users, Action::Read)?;
    }

    let user = find_user(&user_repo, user_id).await?;
    let role = match user.role_id {
        Some(role_id) => role_cache.get(role_id).await?,
        None => None,
    };

    let target = UserContext::new(user, role);
    let response = UserPermissionsResponse {
        user_id: target.user_id(),
        role: target.role_name().map(str::to_string),
        is_super_admin: target.is_super_admin(),
        custom_permissions: target.user.permission_overrides().map(<[_]>::to_vec),
        effective_permissions: target.effective_permissions(),
    };

    Ok(ApiResponse::success(response))
}

async fn write_user_permissions(
    user_id: Uuid,
    ctx: &UserContext,
    pool: &PgPool,
    user_repo: &UserRepository,
    role_cache: &RoleCache,
    audit_logger: &AuditLogger,
    permissions: Option<Vec<Permission>>,
    req_info: &RequestInfo,
) -> Result<User, AppError> {
    authorize_with_permission(ctx, ROLE_ADMINS, Module::Users, Action::Update)?;

    let existing = find_user(user_repo, user_id).await?;
    guard_super_admin_target(ctx, &existing, role_cache).await?;

    let description = match &permissions {
        Some(_) => format!("Custom permissions set for {}", existing.email),
        None => format!("Custom permissions cleared for {}", existing.email),
    };
    let metadata = json!({
        "previous": existing.permission_overrides(),
        "current": permissions,
    });

    let mut tx = pool.begin().await?;
    let user = user_repo
        .set_custom_permissions(&mut tx, user_id, permissions)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            req_info,
            AuditEntry::new(
                Module::Users,
                AuditAction::PermissionsChanged,
                "user",
                description,
            )
            .entity(user.id)
            .actor(&ctx.user)
            .metadata(metadata),
        )
        .await?;
    tx.commit().await?;

    Ok(user)
}

pub async fn set_user_permissions(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    user_repo: web::Data<UserRepository>,
    role_cache: web::Data<RoleCache>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<UserPermissionsInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let user = write_user_permissions(
        path.into_inner(),
        &ctx,
        &pool,
        &user_repo,
        &role_cache,
        &audit_logger,
        Some(input.into_inner().permissions),
        &req_info,
    )
    .await?;

    Ok(ApiResponse::success(UserInfo::from(user)))
}

pub async fn clear_user_permissions(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    user_repo: web::Data<UserRepository>,
    role_cache: web::Data<RoleCache>,
    audit_logger: web::Data<AuditLogger>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let user = write_user_permissions(
        path.into_inner(),
        &ctx,
        &pool,
        &user_repo,
        &role_cache,
        &audit_logger,
        None,
        &req_info,
    )
    .await?;

    Ok(ApiResponse::success(UserInfo::from(user)))
}
