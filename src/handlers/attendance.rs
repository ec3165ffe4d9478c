use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    database::{
        models::{
            Action, Attendance, AttendanceFilter, AttendanceInput, AttendanceStatus, AuditAction,
            CheckInInput, Module,
        },
        repositories::{AttendanceRepository, EmployeeRepository},
    },
    error::AppError,
    handlers::{
        employees::{find_employee, own_employee},
        shared::{ApiResponse, Pagination},
    },
    middleware::RequestInfo,
    services::{AuditEntry, AuditLogger, UserContext},
};

async fn find_attendance(
    repo: &AttendanceRepository,
    attendance_id: Uuid,
) -> Result<Attendance, AppError> {
    repo.find_by_id(attendance_id).await?.ok_or_else(|| {
        log::warn!("Attendance record {} not found", attendance_id);
        AppError::NotFound("Attendance record not found".to_string())
    })
}

pub async fn check_in(
    ctx: UserContext,
    pool: web::Data<PgPool>,
    employee_repo: web::Data<EmployeeRepository>,
    attendance_repo: web::Data<AttendanceRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: Option<web::Json<CheckInInput>>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Attendance, Action::Create)?;

    let employee = own_employee(&employee_repo, &ctx).await?;
    let input = input.map(web::Json::into_inner).unwrap_or_default();
    let now = Utc::now();
    let today = now.date_naive();

    if attendance_repo
        .find_for_day(employee.id, today)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "You have already checked in today".to_string(),
        ));
    }

    let record = AttendanceInput {
        employee_id: employee.id,
        date: today,
        check_in: Some(now),
        check_out: None,
        status: input.status.unwrap_or(AttendanceStatus::Present),
        notes: input.notes,
    };

    let mut tx = pool.begin().await?;
    let attendance = attendance_repo.create_attendance(&mut tx, record).await?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Attendance,
                AuditAction::CheckIn,
                "attendance",
                format!("{} checked in", employee.full_name()),
            )
            .entity(attendance.id)
            .actor(&ctx.user),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::created(attendance))
}

pub async fn check_out(
    ctx: UserContext,
    pool: web::Data<PgPool>,
    employee_repo: web::Data<EmployeeRepository>,
    attendance_repo: web::Data<AttendanceRepository>,
    audit_logger: web::Data<AuditLogger>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Attendance, Action::Create)?;

    let employee = own_employee(&employee_repo, &ctx).await?;

    // A shift that started before midnight stays open into the next day
    let Some(open) = attendance_repo.find_open(employee.id).await? else {
        let today = Utc::now().date_naive();
        return match attendance_repo.find_for_day(employee.id, today).await? {
            Some(_) => Err(AppError::Conflict(
                "You have already checked out today".to_string(),
            )),
            None => Err(AppError::BadRequest(
                "You have not checked in today".to_string(),
            )),
        };
    };

    let mut tx = pool.begin().await?;
    let attendance = attendance_repo
        .record_check_out(&mut tx, open.id)
        .await?
        .ok_or_else(|| AppError::Conflict("You have already checked out today".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Attendance,
                AuditAction::CheckOut,
                "attendance",
                format!("{} checked out", employee.full_name()),
            )
            .entity(attendance.id)
            .actor(&ctx.user),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(attendance))
}

pub async fn my_attendance(
    ctx: UserContext,
    employee_repo: web::Data<EmployeeRepository>,
    attendance_repo: web::Data<AttendanceRepository>,
    page: web::Query<Pagination>,
    filter: web::Query<AttendanceFilter>,
) -> Result<HttpResponse, AppError> {
    let employee = own_employee(&employee_repo, &ctx).await?;

    let mut filter = filter.into_inner();
    filter.employee_id = Some(employee.id);

    let records = attendance_repo
        .list_attendance(&filter, page.limit(), page.offset())
        .await?;

    Ok(ApiResponse::success(records))
}

pub async fn list_attendance(
    ctx: UserContext,
    attendance_repo: web::Data<AttendanceRepository>,
    page: web::Query<Pagination>,
    filter: web::Query<AttendanceFilter>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Attendance, Action::Read)?;

    let records = attendance_repo
        .list_attendance(&filter, page.limit(), page.offset())
        .await?;

    Ok(ApiResponse::success(records))
}

pub async fn get_attendance(
    path: web::Path<Uuid>,
    ctx: UserContext,
    employee_repo: web::Data<EmployeeRepository>,
    attendance_repo: web::Data<AttendanceRepository>,
) -> Result<HttpResponse, AppError> {
    let attendance = find_attendance(&attendance_repo, path.into_inner()).await?;

    if !ctx.can(Module::Attendance, Action::Read) {
        let employee = find_employee(&employee_repo, attendance.employee_id).await?;
        if employee.user_id != Some(ctx.user_id()) {
            ctx.check_permission(Module::Attendance, Action::Read)?;
        }
    }

    Ok(ApiResponse::success(attendance))
}

pub async fn create_attendance(
    ctx: UserContext,
    pool: web::Data<PgPool>,
    employee_repo: web::Data<EmployeeRepository>,
    attendance_repo: web::Data<AttendanceRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<AttendanceInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Attendance, Action::Create)?;
    // recording for anyone else is an HR action
    ctx.check_permission(Module::Attendance, Action::Update)?;

    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;
    let employee = find_employee(&employee_repo, input.employee_id).await?;

    let mut tx = pool.begin().await?;
    let attendance = attendance_repo.create_attendance(&mut tx, input).await?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Attendance,
                AuditAction::Created,
                "attendance",
                format!(
                    "Attendance for {} on {} recorded",
                    employee.full_name(),
                    attendance.date
                ),
            )
            .entity(attendance.id)
            .actor(&ctx.user)
            .metadata(json!({ "status": attendance.status })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::created(attendance))
}

pub async fn update_attendance(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    attendance_repo: web::Data<AttendanceRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<AttendanceInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Attendance, Action::Update)?;

    let attendance_id = path.into_inner();
    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;

    let existing = find_attendance(&attendance_repo, attendance_id).await?;

    let mut tx = pool.begin().await?;
    let attendance = attendance_repo
        .update_attendance(&mut tx, attendance_id, input)
        .await?
        .ok_or_else(|| AppError::NotFound("Attendance record not found".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Attendance,
                AuditAction::Updated,
                "attendance",
                format!("Attendance record for {} updated", attendance.date),
            )
            .entity(attendance.id)
            .actor(&ctx.user)
            .metadata(json!({
                "previousStatus": existing.status,
                "status": attendance.status,
                "previousCheckIn": existing.check_in,
                "previousCheckOut": existing.check_out,
            })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(attendance))
}

pub async fn delete_attendance(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    attendance_repo: web::Data<AttendanceRepository>,
    audit_logger: web::Data<AuditLogger>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Attendance, Action::Delete)?;

    let attendance_id = path.into_inner();
    let existing = find_attendance(&attendance_repo, attendance_id).await?;

    let mut tx = pool.begin().await?;
    if !attendance_repo
        .delete_attendance(&mut tx, attendance_id)
        .await?
    {
        return Err(AppError::NotFound("Attendance record not found".to_string()));
    }
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Attendance,
                AuditAction::Deleted,
                "attendance",
                format!("Attendance record for {} deleted", existing.date),
            )
            .entity(attendance_id)
            .actor(&ctx.user),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success_message(
        "Attendance record deleted successfully",
    ))
}
