use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    database::{
        models::{
            Action, AuditAction, FinanceSummary, FinanceTransaction, Module, TransactionFilter,
            TransactionInput,
        },
        repositories::{FinanceRepository, ProjectRepository},
    },
    error::AppError,
    handlers::{
        projects::find_project,
        shared::{ApiResponse, Pagination},
    },
    middleware::RequestInfo,
    services::{AuditEntry, AuditLogger, UserContext},
};

async fn find_transaction(
    repo: &FinanceRepository,
    transaction_id: Uuid,
) -> Result<FinanceTransaction, AppError> {
    repo.find_by_id(transaction_id).await?.ok_or_else(|| {
        log::warn!("Finance transaction {} not found", transaction_id);
        AppError::NotFound("Transaction not found".to_string())
    })
}

async fn validate_input(
    input: &TransactionInput,
    project_repo: &ProjectRepository,
) -> Result<(), AppError> {
    input.validate().map_err(AppError::BadRequest)?;
    if let Some(project_id) = input.project_id {
        find_project(project_repo, project_id).await?;
    }
    Ok(())
}

pub async fn list_transactions(
    ctx: UserContext,
    finance_repo: web::Data<FinanceRepository>,
    page: web::Query<Pagination>,
    filter: web::Query<TransactionFilter>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Finance, Action::Read)?;

    let transactions = finance_repo
        .list_transactions(&filter, page.limit(), page.offset())
        .await?;

    Ok(ApiResponse::success(transactions))
}

pub async fn get_transaction(
    path: web::Path<Uuid>,
    ctx: UserContext,
    finance_repo: web::Data<FinanceRepository>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Finance, Action::Read)?;

    let transaction = find_transaction(&finance_repo, path.into_inner()).await?;

    Ok(ApiResponse::success(transaction))
}

pub async fn summary(
    ctx: UserContext,
    finance_repo: web::Data<FinanceRepository>,
    filter: web::Query<TransactionFilter>,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Finance, Action::Read)?;

    let summary: Vec<FinanceSummary> = finance_repo
        .summarize(&filter)
        .await?
        .into_iter()
        .map(FinanceSummary::from)
        .collect();

    Ok(ApiResponse::success(summary))
}

pub async fn create_transaction(
    ctx: UserContext,
    pool: web::Data<PgPool>,
    finance_repo: web::Data<FinanceRepository>,
    project_repo: web::Data<ProjectRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<TransactionInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Finance, Action::Create)?;

    let input = input.into_inner();
    validate_input(&input, &project_repo).await?;

    let mut tx = pool.begin().await?;
    let transaction = finance_repo
        .create_transaction(&mut tx, input, ctx.user_id())
        .await?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Finance,
                AuditAction::Created,
                "finance_transaction",
                format!(
                    "{} of {} {} recorded ({})",
                    transaction.kind,
                    transaction.amount,
                    transaction.currency,
                    transaction.category
                ),
            )
            .entity(transaction.id)
            .actor(&ctx.user)
            .metadata(json!({
                "kind": transaction.kind,
                "amount": transaction.amount,
                "currency": transaction.currency,
            })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::created(transaction))
}

pub async fn update_transaction(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    finance_repo: web::Data<FinanceRepository>,
    project_repo: web::Data<ProjectRepository>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<TransactionInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Finance, Action::Update)?;

    let transaction_id = path.into_inner();
    let input = input.into_inner();
    validate_input(&input, &project_repo).await?;
    let existing = find_transaction(&finance_repo, transaction_id).await?;

    let mut tx = pool.begin().await?;
    let transaction = finance_repo
        .update_transaction(&mut tx, transaction_id, input)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Finance,
                AuditAction::Updated,
                "finance_transaction",
                "Finance transaction updated",
            )
            .entity(transaction.id)
            .actor(&ctx.user)
            .metadata(json!({
                "previous": {
                    "kind": existing.kind,
                    "amount": existing.amount,
                    "currency": existing.currency,
                },
                "current": {
                    "kind": transaction.kind,
                    "amount": transaction.amount,
                    "currency": transaction.currency,
                },
            })),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(transaction))
}

pub async fn delete_transaction(
    path: web::Path<Uuid>,
    ctx: UserContext,
    pool: web::Data<PgPool>,
    finance_repo: web::Data<FinanceRepository>,
    audit_logger: web::Data<AuditLogger>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    ctx.check_permission(Module::Finance, Action::Delete)?;

    let transaction_id = path.into_inner();
    let existing = find_transaction(&finance_repo, transaction_id).await?;

    let mut tx = pool.begin().await?;
    if !finance_repo.delete_transaction(&mut tx, transaction_id).await? {
        return Err(AppError::NotFound("Transaction not found".to_string()));
    }
    audit_logger
        .record(
            &mut tx,
            &req_info,
            AuditEntry::new(
                Module::Finance,
                AuditAction::Deleted,
                "finance_transaction",
                format!(
                    "{} of {} {} deleted",
                    existing.kind, existing.amount, existing.currency
                ),
            )
            .entity(transaction_id)
            .actor(&ctx.user),
        )
        .await?;
    tx.commit().await?;

    Ok(ApiResponse::success_message("Transaction deleted successfully"))
}
