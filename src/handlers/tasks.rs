use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    database::{
        models::{
            Action, AuditAction, Module, Task, TaskFilter, TaskInput, TaskStatus, TaskStatusInput,
        },
        repositories::{ProjectRepository, TaskRepository, UserRepository},
    },
    error::AppError,
    handlers::{
        projects::find_project,
        shared::{ApiResponse, Pagination},
    },
    middleware::RequestInfo,
    services::{AuditEntry, AuditLogger, UserContext},
};

async fn find_task(repo: &TaskRepository, task_id: Uuid) -> Result<Task, AppError> {
    repo.find_by_id(task_id).await?.ok_or_else(|| {
        log::warn!("Task {} not found", task_id);
        AppError::NotFound("Task not found".to_string())
    })
}

async fn check_references(
    input: &TaskInput,
    project_repo: &ProjectRepository,
    user_repo: &UserRepository,
) -> Result<(), AppError> {
    find_project(project_repo, input.project_id).await?;
    if let Some(assignee_id) = input.assignee_id {
        if user_repo.find_by_id(assignee_id).await?.is_none() {
            return Err(AppError::BadRequest("Assignee not found".to_string()));
        }
    }
    Ok(())
}

pub async fn list_tasks(
    ctx: UserContext,
    task_repo: web::Data<TaskRepository>,
    page: web::Query<Pagination>,
    filter: web::Query<TaskFilter>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Tasks, Action::Read)?;

    let tasks = task_repo
        .list_tasks(&filter, page.limit(), page.offset())
        .await?;

    Ok(ApiResponse::success(tasks))
}

pub async fn get_task(
    path: web::Path<Uuid>,
    ctx: UserContext,
    task_repo: web::Data<TaskRepository>,
) -> Result<HttpResponse, AppError> {
    let task = find_task(&task_repo, path.into_inner()).await?;

    if task.assignee_id != Some(ctx.user_id()) {
        ctx.check_permission(Module::Tasks, Action::Read)?;
    }

    Ok(ApiResponse::success(task))
}

pub async fn create_task(
    ctx: UserContext,
    pool: web::Data<PgPool>,
    task_repo: web::Data<TaskRepository>,
    project_repo: web::Data<ProjectRepository>,
    user_repo: web::Data<UserRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<TaskInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Tasks, Action::Create)?;

    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;
    check_references(&input, &project_repo, &user_repo).await?;

    let mut tx = pool.begin().await?;
    let task = task_repo.create_task(&mut tx, input, ctx.user_id()).await?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Tasks,
                AuditAction::Created,
                "task",
                format!("Task {} created", task.title),
            )
            .entity(task.id)
            .actor(&ctx.user)
            .metadata(json!({
                "projectId": task.project_id,
                "assigneeId": task.assignee_id,
                "priority": task.priority,
            })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::created(task))
}

pub async fn update_task(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    task_repo: web::Data<TaskRepository>,
    project_repo: web::Data<ProjectRepository>,
    user_repo: web::Data<UserRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<TaskInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Tasks, Action::Update)?;

    let task_id = path.into_inner();
    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;
    check_references(&input, &project_repo, &user_repo).await?;
    let existing = find_task(&task_repo, task_id).await?;

    let mut tx = pool.begin().await?;
    let task = task_repo
        .update_task(&mut tx, task_id, input)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Tasks,
                AuditAction::Updated,
                "task",
                format!("Task {} updated", task.title),
            )
            .entity(task.id)
            .actor(&ctx.user)
            .metadata(json!({
                "previousAssigneeId": existing.assignee_id,
                "assigneeId": task.assignee_id,
                "previousStatus": existing.status,
                "status": task.status,
            })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(task))
}

/// Assignees may move their own task along; reopening a finished task
/// still needs `tasks:update`.
pub async fn update_task_status(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    task_repo: web::Data<TaskRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<TaskStatusInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let task_id = path.into_inner();
    let next = input.status;
    let existing = find_task(&task_repo, task_id).await?;

    let is_assignee = existing.assignee_id == Some(ctx.user_id());
    if !is_assignee || existing.status == TaskStatus::Done {
        ctx.check_permission(Module::Tasks, Action::Update)?;
    }

    if existing.status == next {
        return Ok(ApiResponse::success(existing));
    }

    let mut tx = pool.begin().await?;
    let task = task_repo
        .update_status(&mut tx, task_id, next)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Tasks,
                AuditAction::StatusChanged,
                "task",
                format!("Task {} moved from {} to {}", task.title, existing.status, next),
            )
            .entity(task.id)
            .actor(&ctx.user)
            .metadata(json!({ "from": existing.status, "to": next })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(task))
}

pub async fn delete_task(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    task_repo: web::Data<TaskRepository>,
    audit_logger: web::Data<AuditLogger>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Tasks, Action::Delete)?;

    let task_id = path.into_inner();
    let task = find_task(&task_repo, task_id).await?;

    let mut tx = pool.begin().await?;
    if !task_repo.delete_task(&mut tx, task_id).await? {
        return Err(AppError::NotFound("Task not found".to_string()));
    }
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Tasks,
                AuditAction::Deleted,
                "task",
                format!("Task {} deleted", task.title),
            )
            .entity(task_id)
            .actor(&ctx.user)
            .metadata(json!({ "projectId": task.project_id })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success_message("Task deleted successfully"))
}
