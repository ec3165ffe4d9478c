use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    database::{
        models::{Action, AuditAction, Employee, EmployeeFilter, EmployeeInput, Module},
        repositories::EmployeeRepository,
    },
    error::AppError,
    handlers::shared::{ApiResponse, Pagination},
    middleware::RequestInfo,
    services::{AuditEntry, AuditLogger, UserContext},
};

pub(crate) async fn find_employee(
    repo: &EmployeeRepository,
    employee_id: Uuid,
) -> Result<Employee, AppError> {
    repo.find_by_id(employee_id).await?.ok_or_else(|| {
        log::warn!("Employee {} not found", employee_id);
        AppError::NotFound("Employee not found".to_string())
    })
}

/// The employee record linked to the caller, required by self-service endpoints.
pub(crate) async fn own_employee(
    repo: &EmployeeRepository,
    ctx: &UserContext,
) -> Result<Employee, AppError> {
    repo.find_by_user_id(ctx.user_id()).await?.ok_or_else(|| {
        log::warn!("User {} has no employee record", ctx.user_id());
        AppError::BadRequest("No employee record is linked to your account".to_string())
    })
}

pub async fn list_employees(
    ctx: UserContext,
    employee_repo: web::Data<EmployeeRepository>,
    page: web::Query<Pagination>,
    filter: web::Query<EmployeeFilter>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Employees, Action::Read)?;

    let employees = employee_repo
        .list_employees(&filter, page.limit(), page.offset())
        .await?;

    Ok(ApiResponse::success(employees))
}

pub async fn get_employee(
    path: web::Path<Uuid>,
    ctx: UserContext,
    employee_repo: web::Data<EmployeeRepository>,
) -> Result<HttpResponse, AppError> {
    let employee = find_employee(&employee_repo, path.into_inner()).await?;

    if employee.user_id != Some(ctx.user_id()) {
        ctx.check_permission(Module::Employees, Action::Read)?;
    }

    Ok(ApiResponse::success(employee))
}

pub async fn create_employee(
    ctx: UserContext,
    pool: web::Data<PgPool>,
    employee_repo: web::Data<EmployeeRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<EmployeeInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Employees, Action::Create)?;

    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;

    if let Some(manager_id) = input.manager_id {
        find_employee(&employee_repo, manager_id).await?;
    }

    let mut tx = pool.begin().await?;
    let employee = employee_repo.create_employee(&mut tx, input).await?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Employees,
                AuditAction::Created,
                "employee",
                format!(
                    "Employee {} ({}) created",
                    employee.full_name(),
                    employee.employee_code
                ),
            )
            .entity(employee.id)
            .actor(&ctx.user),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::created(employee))
}

pub async fn update_employee(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    employee_repo: web::Data<EmployeeRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<EmployeeInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Employees, Action::Update)?;

    let employee_id = path.into_inner();
    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;

    if input.manager_id == Some(employee_id) {
        return Err(AppError::BadRequest(
            "An employee cannot be their own manager".to_string(),
        ));
    }

    let existing = find_employee(&employee_repo, employee_id).await?;

    let mut tx = pool.begin().await?;
    let employee = employee_repo
        .update_employee(&mut tx, employee_id, input)
        .await?
        .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Employees,
                AuditAction::Updated,
                "employee",
                format!("Employee {} updated", employee.full_name()),
            )
            .entity(employee.id)
            .actor(&ctx.user)
            .metadata(json!({
                "previousStatus": existing.status,
                "status": employee.status,
                "previousDepartment": existing.department,
                "department": employee.department,
            })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(employee))
}

pub async fn delete_employee(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    employee_repo: web::Data<EmployeeRepository>,
    audit_logger: web::Data<AuditLogger>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Employees, Action::Delete)?;

    let employee_id = path.into_inner();
    let existing = find_employee(&employee_repo, employee_id).await?;

    let mut tx = pool.begin().await?;
    if !employee_repo.delete_employee(&mut tx, employee_id).await? {
        return Err(AppError::NotFound("Employee not found".to_string()));
    }
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Employees,
                AuditAction::Deleted,
                "employee",
                format!("Employee {} deleted", existing.full_name()),
            )
            .entity(employee_id)
            .actor(&ctx.user),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success_message("Employee deleted successfully"))
}
