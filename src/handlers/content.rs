use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    database::{
        models::{
            Action, AuditAction, Content, ContentFilter, ContentInput, ContentStatus,
            ContentStatusInput, Module,
        },
        repositories::ContentRepository,
    },
    error::AppError,
    handlers::shared::{ApiResponse, Pagination},
    middleware::RequestInfo,
    services::{AuditEntry, AuditLogger, UserContext},
};

async fn find_content(repo: &ContentRepository, content_id: Uuid) -> Result<Content, AppError> {
    repo.find_by_id(content_id).await?.ok_or_else(|| {
        log::warn!("Content {} not found", content_id);
        AppError::NotFound("Content not found".to_string())
    })
}

pub async fn list_content(
    ctx: UserContext,
    content_repo: web::Data<ContentRepository>,
    page: web::Query<Pagination>,
    filter: web::Query<ContentFilter>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Content, Action::Read)?;

    let items = content_repo
        .list_content(&filter, page.limit(), page.offset())
        .await?;

    Ok(ApiResponse::success(items))
}

pub async fn get_content(
    path: web::Path<Uuid>,
    ctx: UserContext,
    content_repo: web::Data<ContentRepository>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Content, Action::Read)?;

    let content = find_content(&content_repo, path.into_inner()).await?;

    Ok(ApiResponse::success(content))
}

pub async fn create_content(
    ctx: UserContext,
    pool: web::Data<PgPool>,
    content_repo: web::Data<ContentRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<ContentInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Content, Action::Create)?;

    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;

    let mut tx = pool.begin().await?;
    let content = content_repo
        .create_content(&mut tx, input, ctx.user_id())
        .await?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Content,
                AuditAction::Created,
                "content",
                format!("{} \"{}\" drafted", content.kind, content.title),
            )
            .entity(content.id)
            .actor(&ctx.user)
            .metadata(json!({ "tags": content.tags })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::created(content))
}

/// Published content is frozen for everyone but approvers.
pub async fn update_content(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    content_repo: web::Data<ContentRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<ContentInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Content, Action::Update)?;

    let content_id = path.into_inner();
    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;

    let existing = find_content(&content_repo, content_id).await?;
    if existing.status == ContentStatus::Published {
        ctx.check_permission(Module::Content, Action::Approve)?;
    }

    let mut tx = pool.begin().await?;
    let content = content_repo
        .update_content(&mut tx, content_id, existing.status, input)
        .await?
        .ok_or_else(|| AppError::Conflict("Content changed concurrently".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Content,
                AuditAction::Updated,
                "content",
                format!("\"{}\" updated", content.title),
            )
            .entity(content.id)
            .actor(&ctx.user)
            .metadata(json!({ "status": content.status })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(content))
}

pub async fn update_content_status(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    content_repo: web::Data<ContentRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<ContentStatusInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Content, Action::Update)?;

    let next = input.status;
    if next == ContentStatus::Published {
        ctx.check_permission(Module::Content, Action::Approve)?;
    }

    let content_id = path.into_inner();
    let existing = find_content(&content_repo, content_id).await?;
    if !existing.status.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot move content from {} to {}",
            existing.status, next
        )));
    }

    let mut tx = pool.begin().await?;
    let content = content_repo
        .transition_status(&mut tx, content_id, existing.status, next)
        .await?
        .ok_or_else(|| AppError::Conflict("Content changed concurrently".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Content,
                if next == ContentStatus::Published {
                    AuditAction::Approved
                } else {
                    AuditAction::StatusChanged
                },
                "content",
                format!(
                    "\"{}\" moved from {} to {}",
                    content.title, existing.status, next
                ),
            )
            .entity(content.id)
            .actor(&ctx.user)
            .metadata(json!({ "from": existing.status, "to": next })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(content))
}

pub async fn delete_content(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    content_repo: web::Data<ContentRepository>,
    audit_logger: web::Data<AuditLogger>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Content, Action::Delete)?;

    let content_id = path.into_inner();
    let existing = find_content(&content_repo, content_id).await?;

    let mut tx = pool.begin().await?;
    if !content_repo.delete_content(&mut tx, content_id).await? {
        return Err(AppError::NotFound("Content not found".to_string()));
    }
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Content,
                AuditAction::Deleted,
                "content",
                format!("\"{}\" deleted", existing.title),
            )
            .entity(content_id)
            .actor(&ctx.user),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success_message("Content deleted successfully"))
}
