use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    database::{
        models::{Action, AuditAction, Module, Role, RoleInput, module_catalog},
        repositories::{RoleRepository, UserRepository},
    },
    error::AppError,
    handlers::shared::ApiResponse,
    middleware::RequestInfo,
    services::{AuditEntry, AuditLogger, RoleCache, UserContext},
};

async fn find_role(repo: &RoleRepository, role_id: Uuid) -> Result<Role, AppError> {
    repo.find_by_id(role_id).await?.ok_or_else(|| {
        log::warn!("Role {} not found", role_id);
        AppError::NotFound("Role not found".to_string())
    })
}

/// Module/action catalogue for building role editors.
pub async fn list_modules(_ctx: UserContext) -> Result<HttpResponse, AppError> {
    Ok(ApiResponse::success(module_catalog()))
}

pub async fn list_roles(
    ctx: UserContext,
    role_repo: web::Data<RoleRepository>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Roles, Action::Read)?;

    let roles = role_repo.list_roles().await?;

    Ok(ApiResponse::success(roles))
}

pub async fn get_role(
    path: web::Path<Uuid>,
    ctx: UserContext,
    role_repo: web::Data<RoleRepository>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Roles, Action::Read)?;

    let role = find_role(&role_repo, path.into_inner()).await?;

    Ok(ApiResponse::success(role))
}

pub async fn create_role(
    ctx: UserContext,
    pool: web::Data<PgPool>,
    role_repo: web::Data<RoleRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<RoleInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Roles, Action::Create)?;

    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;

    let mut tx = pool.begin().await?;
    let role = role_repo
        .create_role(
            &mut tx,
            input.name.trim(),
            input.description.as_deref(),
            input.permissions,
        )
        .await?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Roles,
                AuditAction::Created,
                "role",
                format!("Role {} created", role.name),
            )
            .entity(role.id)
            .actor(&ctx.user)
            .metadata(json!({ "permissions": role.permissions })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::created(role))
}

pub async fn update_role(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    role_repo: web::Data<RoleRepository>,
    role_cache: web::Data<RoleCache>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<RoleInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Roles, Action::Update)?;

    let role_id = path.into_inner();
    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;

    let existing = find_role(&role_repo, role_id).await?;
    if existing.is_super_admin() {
        return Err(AppError::Forbidden(
            "The super_admin role cannot be modified".to_string(),
        ));
    }

    let name = input.name.trim();
    if existing.is_system && name != existing.name {
        return Err(AppError::BadRequest(
            "System roles cannot be renamed".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;
    let role = role_repo
        .update_role(
            &mut tx,
            role_id,
            name,
            input.description.as_deref(),
            input.permissions,
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Role not found".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Roles,
                AuditAction::Updated,
                "role",
                format!("Role {} updated", role.name),
            )
            .entity(role.id)
            .actor(&ctx.user)
            .metadata(json!({
                "previousName": existing.name,
                "previousPermissions": existing.permissions,
                "permissions": role.permissions,
            })),
        )
        .await?;
    tx.commit().await?;

    role_cache.invalidate(role_id).await;

    Ok(ApiResponse::success(role))
}

pub async fn delete_role(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    role_repo: web::Data<RoleRepository>,
    user_repo: web::Data<UserRepository>,
    role_cache: web::Data<RoleCache>,
    audit_logger: web::Data<AuditLogger>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Roles, Action::Delete)?;

    let role_id = path.into_inner();
    let existing = find_role(&role_repo, role_id).await?;

    if existing.is_system {
        return Err(AppError::Forbidden(
            "System roles cannot be deleted".to_string(),
        ));
    }

    let assigned = user_repo.count_with_role(role_id).await?;
    if assigned > 0 {
        return Err(AppError::Conflict(format!(
            "Role is still assigned to {assigned} user(s)"
        )));
    }

    let mut tx = pool.begin().await?;
    if !role_repo.delete_role(&mut tx, role_id).await? {
        return Err(AppError::NotFound("Role not found".to_string()));
    }
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Roles,
                AuditAction::Deleted,
                "role",
                format!("Role {} deleted", existing.name),
            )
            .entity(role_id)
            .actor(&ctx.user),
        )
        .await?;
    tx.commit().await?;

    role_cache.invalidate(role_id).await;

    Ok(ApiResponse::success_message("Role deleted successfully"))
}
