use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    database::{
        models::{Action, AuditAction, Module, Project, ProjectFilter, ProjectInput},
        repositories::{ProjectRepository, TeamRepository, UserRepository},
    },
    error::AppError,
    handlers::shared::{ApiResponse, Pagination},
    middleware::RequestInfo,
    services::{AuditEntry, AuditLogger, UserContext},
};

pub(crate) async fn find_project(
    repo: &ProjectRepository,
    project_id: Uuid,
) -> Result<Project, AppError> {
    repo.find_by_id(project_id).await?.ok_or_else(|| {
        log::warn!("Project {} not found", project_id);
        AppError::NotFound("Project not found".to_string())
    })
}

async fn check_references(
    input: &ProjectInput,
    user_repo: &UserRepository,
    team_repo: &TeamRepository,
) -> Result<(), AppError> {
    if let Some(owner_id) = input.owner_id {
        if user_repo.find_by_id(owner_id).await?.is_none() {
            return Err(AppError::BadRequest("Project owner not found".to_string()));
        }
    }
    if let Some(team_id) = input.team_id {
        if team_repo.find_by_id(team_id).await?.is_none() {
            return Err(AppError::BadRequest("Project team not found".to_string()));
        }
    }
    Ok(())
}

pub async fn list_projects(
    ctx: UserContext,
    project_repo: web::Data<ProjectRepository>,
    page: web::Query<Pagination>,
    filter: web::Query<ProjectFilter>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Projects, Action::Read)?;

    let projects = project_repo
        .list_projects(&filter, page.limit(), page.offset())
        .await?;

    Ok(ApiResponse::success(projects))
}

pub async fn get_project(
    path: web::Path<Uuid>,
    ctx: UserContext,
    project_repo: web::Data<ProjectRepository>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Projects, Action::Read)?;

    let project = find_project(&project_repo, path.into_inner()).await?;

    Ok(ApiResponse::success(project))
}

pub async fn create_project(
    ctx: UserContext,
    pool: web::Data<PgPool>,
    project_repo: web::Data<ProjectRepository>,
    user_repo: web::Data<UserRepository>,
    team_repo: web::Data<TeamRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<ProjectInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Projects, Action::Create)?;

    let mut input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;
    // creator owns the project unless told otherwise
    input.owner_id.get_or_insert(ctx.user_id());
    check_references(&input, &user_repo, &team_repo).await?;

    let mut tx = pool.begin().await?;
    let project = project_repo.create_project(&mut tx, input).await?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Projects,
                AuditAction::Created,
                "project",
                format!("Project {} created", project.name),
            )
            .entity(project.id)
            .actor(&ctx.user)
            .metadata(json!({ "status": project.status, "teamId": project.team_id })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::created(project))
}

pub async fn update_project(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    project_repo: web::Data<ProjectRepository>,
    user_repo: web::Data<UserRepository>,
    team_repo: web::Data<TeamRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<ProjectInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Projects, Action::Update)?;

    let project_id = path.into_inner();
    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;
    check_references(&input, &user_repo, &team_repo).await?;
    let existing = find_project(&project_repo, project_id).await?;

    let mut tx = pool.begin().await?;
    let project = project_repo
        .update_project(&mut tx, project_id, input)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Projects,
                if existing.status != project.status {
                    AuditAction::StatusChanged
                } else {
                    AuditAction::Updated
                },
                "project",
                format!("Project {} updated", project.name),
            )
            .entity(project.id)
            .actor(&ctx.user)
            .metadata(json!({
                "previousStatus": existing.status,
                "status": project.status,
            })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(project))
}

pub async fn delete_project(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    project_repo: web::Data<ProjectRepository>,
    audit_logger: web::Data<AuditLogger>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Projects, Action::Delete)?;

    let project_id = path.into_inner();
    let project = find_project(&project_repo, project_id).await?;

    let mut tx = pool.begin().await?;
    if !project_repo.delete_project(&mut tx, project_id).await? {
        return Err(AppError::NotFound("Project not found".to_string()));
    }
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Projects,
                AuditAction::Deleted,
                "project",
                format!("Project {} deleted", project.name),
            )
            .entity(project_id)
            .actor(&ctx.user),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success_message("Project deleted successfully"))
}
