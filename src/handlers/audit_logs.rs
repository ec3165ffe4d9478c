use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::{
    database::{
        models::{Action, AuditLogFilter, AuditLogPage, Module},
        repositories::AuditLogRepository,
    },
    error::AppError,
    handlers::shared::{ApiResponse, Pagination},
    services::UserContext,
};

pub async fn list_audit_logs(
    ctx: UserContext,
    audit_repo: web::Data<AuditLogRepository>,
    page: web::Query<Pagination>,
    filter: web::Query<AuditLogFilter>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::AuditLogs, Action::Read)?;

    let limit = page.limit();
    let offset = page.offset();
    let items = audit_repo.list(&filter, limit, offset).await?;
    let total = audit_repo.count(&filter).await?;

    Ok(ApiResponse::success(AuditLogPage {
        items,
        total,
        limit,
        offset,
    }))
}

pub async fn get_audit_log(
    path: web::Path<Uuid>,
    ctx: UserContext,
    audit_repo: web::Data<AuditLogRepository>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::AuditLogs, Action::Read)?;

    let entry_id = path.into_inner();
    let entry = audit_repo.find_by_id(entry_id).await?.ok_or_else(|| {
        log::warn!("Audit log entry {} not found", entry_id);
        AppError::NotFound("Audit log entry not found".to_string())
    })?;

    Ok(ApiResponse::success(entry))
}
