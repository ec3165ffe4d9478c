use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    database::{
        models::{
            Action, AuditAction, Leave, LeaveFilter, LeaveInput, LeaveStatus, Module,
            ReviewLeaveInput,
        },
        repositories::{EmployeeRepository, LeaveRepository},
    },
    error::AppError,
    handlers::{
        employees::{find_employee, own_employee},
        shared::{ApiResponse, Pagination},
    },
    middleware::RequestInfo,
    services::{AuditEntry, AuditLogger, UserContext},
};

async fn find_leave(repo: &LeaveRepository, leave_id: Uuid) -> Result<Leave, AppError> {
    repo.find_by_id(leave_id).await?.ok_or_else(|| {
        log::warn!("Leave {} not found", leave_id);
        AppError::NotFound("Leave request not found".to_string())
    })
}

async fn is_own_leave(
    ctx: &UserContext,
    employee_repo: &EmployeeRepository,
    leave: &Leave,
) -> Result<bool, AppError> {
    let employee = find_employee(employee_repo, leave.employee_id).await?;
    Ok(employee.user_id == Some(ctx.user_id()))
}

pub async fn create_leave(
    ctx: UserContext,
    pool: web::Data<PgPool>,
    employee_repo: web::Data<EmployeeRepository>,
    leave_repo: web::Data<LeaveRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<LeaveInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Leave, Action::Create)?;

    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;

    let employee = match input.employee_id {
        Some(employee_id) => {
            let employee = find_employee(&employee_repo, employee_id).await?;
            if employee.user_id != Some(ctx.user_id()) {
                // filing on someone's behalf
                ctx.check_permission(Module::Leave, Action::Approve)?;
            }
            employee
        }
        None => own_employee(&employee_repo, &ctx).await?,
    };

    let mut tx = pool.begin().await?;
    let leave = leave_repo.create_leave(&mut tx, employee.id, input).await?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Leave,
                AuditAction::Created,
                "leave",
                format!(
                    "{} leave requested for {} ({} to {})",
                    leave.leave_type,
                    employee.full_name(),
                    leave.start_date,
                    leave.end_date
                ),
            )
            .entity(leave.id)
            .actor(&ctx.user)
            .metadata(json!({ "days": leave.days() })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::created(leave))
}

pub async fn my_leaves(
    ctx: UserContext,
    employee_repo: web::Data<EmployeeRepository>,
    leave_repo: web::Data<LeaveRepository>,
    page: web::Query<Pagination>,
    filter: web::Query<LeaveFilter>,
) -> Result<HttpResponse, AppError> {
    let employee = own_employee(&employee_repo, &ctx).await?;

    let mut filter = filter.into_inner();
    filter.employee_id = Some(employee.id);

    let leaves = leave_repo
        .list_leaves(&filter, page.limit(), page.offset())
        .await?;

    Ok(ApiResponse::success(leaves))
}

pub async fn list_leaves(
    ctx: UserContext,
    leave_repo: web::Data<LeaveRepository>,
    page: web::Query<Pagination>,
    filter: web::Query<LeaveFilter>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Leave, Action::Read)?;

    let leaves = leave_repo
        .list_leaves(&filter, page.limit(), page.offset())
        .await?;

    Ok(ApiResponse::success(leaves))
}

pub async fn get_leave(
    path: web::Path<Uuid>,
    ctx: UserContext,
    employee_repo: web::Data<EmployeeRepository>,
    leave_repo: web::Data<LeaveRepository>,
) -> Result<HttpResponse, AppError> {
    let leave = find_leave(&leave_repo, path.into_inner()).await?;

    if !ctx.can(Module::Leave, Action::Read) && !is_own_leave(&ctx, &employee_repo, &leave).await?
    {
        ctx.check_permission(Module::Leave, Action::Read)?;
    }

    Ok(ApiResponse::success(leave))
}

/// Shared by approve and reject.
async fn review_leave(
    leave_id: Uuid,
    next: LeaveStatus,
    ctx: &UserContext,
    pool: &PgPool,
    employee_repo: &EmployeeRepository,
    leave_repo: &LeaveRepository,
    audit_logger: &AuditLogger,
    note: Option<String>,
    req_info: &RequestInfo,
) -> Result<Leave, AppError> {
    ctx.check_permission(Module::Leave, Action::Approve)?;

    let leave = find_leave(leave_repo, leave_id).await?;
    if leave.status != LeaveStatus::Pending {
        return Err(AppError::BadRequest(format!(
            "Only pending leave requests can be reviewed (current status: {})",
            leave.status
        )));
    }
    if !ctx.is_super_admin() && is_own_leave(ctx, employee_repo, &leave).await? {
        return Err(AppError::Forbidden(
            "You cannot review your own leave request".to_string(),
        ));
    }

    let (action, verb) = match next {
        LeaveStatus::Approved => (AuditAction::Approved, "approved"),
        _ => (AuditAction::Rejected, "rejected"),
    };

    let mut tx = pool.begin().await?;
    let updated = leave_repo
        .transition_status(
            &mut tx,
            leave_id,
            LeaveStatus::Pending,
            next,
            Some(ctx.user_id()),
            note.clone(),
        )
        .await?
        .ok_or_else(|| {
            AppError::Conflict("Leave request was reviewed by someone else".to_string())
        })?;
    audit_logger
        .record(
            &mut tx,
            req_info,
            AuditEntry::new(
                Module::Leave,
                action,
                "leave",
                format!("Leave request {verb}"),
            )
            .entity(updated.id)
            .actor(&ctx.user)
            .metadata(json!({
                "from": leave.status,
                "to": updated.status,
                "note": note,
            })),
        )
        .await?;
    tx.commit().await?;

    Ok(updated)
}

pub async fn approve_leave(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    employee_repo: web::Data<EmployeeRepository>,
    leave_repo: web::Data<LeaveRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: Option<web::Json<ReviewLeaveInput>>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let note = input.and_then(|input| input.into_inner().note);
    let leave = review_leave(
        path.into_inner(),
        LeaveStatus::Approved,
        &ctx,
        &pool,
        &employee_repo,
        &leave_repo,
        &audit_logger,
        note,
        &req_info,
    )
    .await?;

    Ok(ApiResponse::success(leave))
}

pub async fn reject_leave(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    employee_repo: web::Data<EmployeeRepository>,
    leave_repo: web::Data<LeaveRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: Option<web::Json<ReviewLeaveInput>>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let note = input.and_then(|input| input.into_inner().note);
    let leave = review_leave(
        path.into_inner(),
        LeaveStatus::Rejected,
        &ctx,
        &pool,
        &employee_repo,
        &leave_repo,
        &audit_logger,
        note,
        &req_info,
    )
    .await?;

    Ok(ApiResponse::success(leave))
}

pub async fn cancel_leave(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    employee_repo: web::Data<EmployeeRepository>,
    leave_repo: web::Data<LeaveRepository>,
    audit_logger: web::Data<AuditLogger>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let leave = find_leave(&leave_repo, path.into_inner()).await?;

    if !is_own_leave(&ctx, &employee_repo, &leave).await? {
        ctx.check_permission(Module::Leave, Action::Approve)?;
    }
    if !leave.status.can_transition_to(LeaveStatus::Cancelled) {
        return Err(AppError::BadRequest(format!(
            "A {} leave request cannot be cancelled",
            leave.status
        )));
    }

    let mut tx = pool.begin().await?;
    let updated = leave_repo
        .transition_status(
            &mut tx,
            leave.id,
            leave.status,
            LeaveStatus::Cancelled,
            None,
            None,
        )
        .await?
        .ok_or_else(|| AppError::Conflict("Leave request changed concurrently".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Leave,
                AuditAction::Cancelled,
                "leave",
                "Leave request cancelled",
            )
            .entity(updated.id)
            .actor(&ctx.user)
            .metadata(json!({ "from": leave.status })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(updated))
}
