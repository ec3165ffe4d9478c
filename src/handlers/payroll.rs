use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    database::{
        models::{
            Action, AuditAction, Module, Payroll, PayrollFilter, PayrollInput, PayrollStatus,
            PayrollStatusInput,
        },
        repositories::{EmployeeRepository, PayrollRepository},
    },
    error::AppError,
    handlers::{
        employees::{find_employee, own_employee},
        shared::{ApiResponse, Pagination},
    },
    middleware::RequestInfo,
    services::{AuditEntry, AuditLogger, UserContext},
};

async fn find_payroll(repo: &PayrollRepository, payroll_id: Uuid) -> Result<Payroll, AppError> {
    repo.find_by_id(payroll_id).await?.ok_or_else(|| {
        log::warn!("Payroll record {} not found", payroll_id);
        AppError::NotFound("Payroll record not found".to_string())
    })
}

pub async fn list_payroll(
    ctx: UserContext,
    payroll_repo: web::Data<PayrollRepository>,
    page: web::Query<Pagination>,
    filter: web::Query<PayrollFilter>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Payroll, Action::Read)?;

    let records = payroll_repo
        .list_payroll(&filter, page.limit(), page.offset())
        .await?;

    Ok(ApiResponse::success(records))
}

pub async fn my_payroll(
    ctx: UserContext,
    employee_repo: web::Data<EmployeeRepository>,
    payroll_repo: web::Data<PayrollRepository>,
    page: web::Query<Pagination>,
    filter: web::Query<PayrollFilter>,
) -> Result<HttpResponse, AppError> {
    let employee = own_employee(&employee_repo, &ctx).await?;

    let mut filter = filter.into_inner();
    filter.employee_id = Some(employee.id);

    let records = payroll_repo
        .list_payroll(&filter, page.limit(), page.offset())
        .await?;

    Ok(ApiResponse::success(records))
}

pub async fn get_payroll(
    path: web::Path<Uuid>,
    ctx: UserContext,
    employee_repo: web::Data<EmployeeRepository>,
    payroll_repo: web::Data<PayrollRepository>,
) -> Result<HttpResponse, AppError> {
    let payroll = find_payroll(&payroll_repo, path.into_inner()).await?;

    if !ctx.can(Module::Payroll, Action::Read) {
        let employee = find_employee(&employee_repo, payroll.employee_id).await?;
        if employee.user_id != Some(ctx.user_id()) {
            ctx.check_permission(Module::Payroll, Action::Read)?;
        }
    }

    Ok(ApiResponse::success(payroll))
}

pub async fn create_payroll(
    ctx: UserContext,
    pool: web::Data<PgPool>,
    employee_repo: web::Data<EmployeeRepository>,
    payroll_repo: web::Data<PayrollRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<PayrollInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Payroll, Action::Create)?;

    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;
    let employee = find_employee(&employee_repo, input.employee_id).await?;

    let mut tx = pool.begin().await?;
    let payroll = payroll_repo.create_payroll(&mut tx, input).await?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Payroll,
                AuditAction::Created,
                "payroll",
                format!(
                    "Payroll for {} ({} to {}) created",
                    employee.full_name(),
                    payroll.period_start,
                    payroll.period_end
                ),
            )
            .entity(payroll.id)
            .actor(&ctx.user)
            .metadata(json!({ "netSalary": payroll.net_salary })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::created(payroll))
}

pub async fn update_payroll(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    payroll_repo: web::Data<PayrollRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<PayrollInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Payroll, Action::Update)?;

    let payroll_id = path.into_inner();
    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;

    let existing = find_payroll(&payroll_repo, payroll_id).await?;
    if existing.status != PayrollStatus::Draft {
        return Err(AppError::BadRequest(
            "Only draft payroll records can be edited".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;
    let payroll = payroll_repo
        .update_payroll(&mut tx, payroll_id, input)
        .await?
        .ok_or_else(|| AppError::Conflict("Payroll record is no longer a draft".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Payroll,
                AuditAction::Updated,
                "payroll",
                "Payroll record updated",
            )
            .entity(payroll.id)
            .actor(&ctx.user)
            .metadata(json!({
                "previousNetSalary": existing.net_salary,
                "netSalary": payroll.net_salary,
            })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(payroll))
}

pub async fn update_payroll_status(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    payroll_repo: web::Data<PayrollRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<PayrollStatusInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Payroll, Action::Update)?;

    let next = input.status;
    if next == PayrollStatus::Paid {
        ctx.check_permission(Module::Payroll, Action::Approve)?;
    }

    let payroll_id = path.into_inner();
    let existing = find_payroll(&payroll_repo, payroll_id).await?;
    if !existing.status.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot move payroll from {} to {}",
            existing.status, next
        )));
    }

    let mut tx = pool.begin().await?;
    let payroll = payroll_repo
        .transition_status(&mut tx, payroll_id, existing.status, next)
        .await?
        .ok_or_else(|| AppError::Conflict("Payroll record changed concurrently".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Payroll,
                if next == PayrollStatus::Paid {
                    AuditAction::Approved
                } else {
                    AuditAction::StatusChanged
                },
                "payroll",
                format!("Payroll moved from {} to {}", existing.status, next),
            )
            .entity(payroll.id)
            .actor(&ctx.user)
            .metadata(json!({ "from": existing.status, "to": next })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(payroll))
}

pub async fn delete_payroll(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    payroll_repo: web::Data<PayrollRepository>,
    audit_logger: web::Data<AuditLogger>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Payroll, Action::Delete)?;

    let payroll_id = path.into_inner();
    let existing = find_payroll(&payroll_repo, payroll_id).await?;
    if existing.status == PayrollStatus::Paid {
        return Err(AppError::BadRequest(
            "Paid payroll records cannot be deleted".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;
    if !payroll_repo.delete_payroll(&mut tx, payroll_id).await? {
        return Err(AppError::Conflict(
            "Payroll record changed concurrently".to_string(),
        ));
    }
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Payroll,
                AuditAction::Deleted,
                "payroll",
                format!(
                    "Payroll record for {} to {} deleted",
                    existing.period_start, existing.period_end
                ),
            )
            .entity(payroll_id)
            .actor(&ctx.user),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success_message("Payroll record deleted successfully"))
}
