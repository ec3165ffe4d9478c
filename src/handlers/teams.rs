use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    database::{
        models::{Action, AuditAction, Module, Team, TeamInput, User},
        repositories::{TeamRepository, UserRepository},
    },
    error::AppError,
    handlers::shared::{ApiResponse, Pagination},
    middleware::RequestInfo,
    services::{AuditEntry, AuditLogger, UserContext},
};

async fn find_team(repo: &TeamRepository, team_id: Uuid) -> Result<Team, AppError> {
    repo.find_by_id(team_id).await?.ok_or_else(|| {
        log::warn!("Team {} not found", team_id);
        AppError::NotFound("Team not found".to_string())
    })
}

async fn find_user(repo: &UserRepository, user_id: Uuid) -> Result<User, AppError> {
    repo.find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn list_teams(
    ctx: UserContext,
    team_repo: web::Data<TeamRepository>,
    page: web::Query<Pagination>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Teams, Action::Read)?;

    let teams = team_repo.list_teams(page.limit(), page.offset()).await?;

    Ok(ApiResponse::success(teams))
}

pub async fn get_team(
    path: web::Path<Uuid>,
    ctx: UserContext,
    team_repo: web::Data<TeamRepository>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Teams, Action::Read)?;

    let team = find_team(&team_repo, path.into_inner()).await?;

    Ok(ApiResponse::success(team))
}

pub async fn create_team(
    ctx: UserContext,
    pool: web::Data<PgPool>,
    team_repo: web::Data<TeamRepository>,
    user_repo: web::Data<UserRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<TeamInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Teams, Action::Create)?;

    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;
    if let Some(lead_id) = input.lead_id {
        find_user(&user_repo, lead_id).await?;
    }

    let mut tx = pool.begin().await?;
    let team = team_repo.create_team(&mut tx, input).await?;
    // the lead is always a member
    if let Some(lead_id) = team.lead_id {
        team_repo.add_member(&mut tx, team.id, lead_id).await?;
    }
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Teams,
                AuditAction::Created,
                "team",
                format!("Team {} created", team.name),
            )
            .entity(team.id)
            .actor(&ctx.user),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::created(team))
}

pub async fn update_team(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    team_repo: web::Data<TeamRepository>,
    user_repo: web::Data<UserRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<TeamInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Teams, Action::Update)?;

    let team_id = path.into_inner();
    let input = input.into_inner();
    input.validate().map_err(AppError::BadRequest)?;
    if let Some(lead_id) = input.lead_id {
        find_user(&user_repo, lead_id).await?;
    }
    let existing = find_team(&team_repo, team_id).await?;

    let mut tx = pool.begin().await?;
    let team = team_repo
        .update_team(&mut tx, team_id, input)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".to_string()))?;
    if let Some(lead_id) = team.lead_id {
        team_repo.add_member(&mut tx, team.id, lead_id).await?;
    }
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Teams,
                AuditAction::Updated,
                "team",
                format!("Team {} updated", team.name),
            )
            .entity(team.id)
            .actor(&ctx.user)
            .metadata(json!({
                "previousName": existing.name,
                "previousLeadId": existing.lead_id,
                "leadId": team.lead_id,
            })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(team))
}

pub async fn delete_team(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    team_repo: web::Data<TeamRepository>,
    audit_logger: web::Data<AuditLogger>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Teams, Action::Delete)?;

    let team_id = path.into_inner();
    let team = find_team(&team_repo, team_id).await?;

    let mut tx = pool.begin().await?;
    if !team_repo.delete_team(&mut tx, team_id).await? {
        return Err(AppError::NotFound("Team not found".to_string()));
    }
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Teams,
                AuditAction::Deleted,
                "team",
                format!("Team {} deleted", team.name),
            )
            .entity(team_id)
            .actor(&ctx.user),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success_message("Team deleted successfully"))
}

pub async fn get_team_members(
    path: web::Path<Uuid>,
    ctx: UserContext,
    team_repo: web::Data<TeamRepository>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Teams, Action::Read)?;

    let team = find_team(&team_repo, path.into_inner()).await?;
    let members = team_repo.get_members(team.id).await?;

    Ok(ApiResponse::success(members))
}

pub async fn add_team_member(
    path: web::Path<(Uuid, Uuid)>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    team_repo: web::Data<TeamRepository>,
    user_repo: web::Data<UserRepository>,
    audit_logger: web::Data<AuditLogger>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Teams, Action::Update)?;

    let (team_id, user_id) = path.into_inner();
    let team = find_team(&team_repo, team_id).await?;
    let user = find_user(&user_repo, user_id).await?;

    let mut tx = pool.begin().await?;
    if !team_repo.add_member(&mut tx, team_id, user_id).await? {
        return Err(AppError::Conflict(
            "User is already a member of this team".to_string(),
        ));
    }
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Teams,
                AuditAction::MemberAdded,
                "team",
                format!("{} added to team {}", user.email, team.name),
            )
            .entity(team_id)
            .actor(&ctx.user)
            .metadata(json!({ "userId": user_id })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success_message("Member added successfully"))
}

pub async fn remove_team_member(
    path: web::Path<(Uuid, Uuid)>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    team_repo: web::Data<TeamRepository>,
    audit_logger: web::Data<AuditLogger>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Teams, Action::Update)?;

    let (team_id, user_id) = path.into_inner();
    let team = find_team(&team_repo, team_id).await?;
    if team.lead_id == Some(user_id) {
        return Err(AppError::BadRequest(
            "Assign a new team lead before removing the current one".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;
    if !team_repo.remove_member(&mut tx, team_id, user_id).await? {
        return Err(AppError::NotFound(
            "User is not a member of this team".to_string(),
        ));
    }
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Teams,
                AuditAction::MemberRemoved,
                "team",
                format!("Member removed from team {}", team.name),
            )
            .entity(team_id)
            .actor(&ctx.user)
            .metadata(json!({ "userId": user_id })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success_message("Member removed successfully"))
}
