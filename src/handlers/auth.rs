use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::{
    config::Config,
    database::models::{
        AuditAction, ChangePasswordInput, CreateUserInput, ForgotPasswordInput, LoginInput,
        MeResponse, Module, ResetPasswordInput,
    },
    error::AppError,
    handlers::shared::ApiResponse,
    middleware::RequestInfo,
    services::{AuditEntry, AuditLogger, AuthService, UserContext},
};

pub async fn register(
    auth_service: web::Data<AuthService>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<CreateUserInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let response = auth_service.register(input.into_inner()).await?;

    audit_logger
        .record_detached(
            &req_info,
            AuditEntry::new(
                Module::Users,
                AuditAction::Registered,
                "user",
                format!("User {} registered", response.user.email),
            )
            .entity(response.user.id)
            .actor_email(&response.user.email),
        )
        .await;

    Ok(ApiResponse::created(response))
}

pub async fn login(
    auth_service: web::Data<AuthService>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<LoginInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let input = input.into_inner();
    let email = input.email.trim().to_lowercase();

    match auth_service.login(input).await {
        Ok((response, user)) => {
            audit_logger
                .record_detached(
                    &req_info,
                    AuditEntry::new(
                        Module::Users,
                        AuditAction::Login,
                        "user",
                        format!("User {} logged in", user.email),
                    )
                    .entity(user.id)
                    .actor(&user),
                )
                .await;

            Ok(ApiResponse::success(response))
        }
        Err(err @ (AppError::Unauthorized | AppError::Forbidden(_))) => {
            log::warn!("Failed login for {} from {}", email, req_info.ip_address);
            audit_logger
                .record_detached(
                    &req_info,
                    AuditEntry::new(
                        Module::Users,
                        AuditAction::LoginFailed,
                        "user",
                        format!("Failed login attempt for {email}"),
                    )
                    .actor_email(&email),
                )
                .await;

            Err(err)
        }
        Err(err) => Err(err),
    }
}

pub async fn me(ctx: UserContext) -> Result<HttpResponse, AppError> {
    let response = MeResponse {
        role: ctx.role_name().map(str::to_string),
        is_super_admin: ctx.is_super_admin(),
        permissions: ctx.effective_permissions(),
        user: ctx.user.into(),
    };

    Ok(ApiResponse::success(response))
}

pub async fn forgot_password(
    auth_service: web::Data<AuthService>,
    audit_logger: web::Data<AuditLogger>,
    config: web::Data<Config>,
    input: web::Json<ForgotPasswordInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let issued = auth_service.forgot_password(&input.email).await?;
    let message = "If the email is registered, a password reset link has been sent.";

    let Some((user, reset_token)) = issued else {
        return Ok(ApiResponse::success_message(message));
    };

    audit_logger
        .record_detached(
            &req_info,
            AuditEntry::new(
                Module::Users,
                AuditAction::PasswordResetRequested,
                "user",
                format!("Password reset requested for {}", user.email),
            )
            .entity(user.id)
            .actor(&user),
        )
        .await;

    if config.is_production() {
        return Ok(ApiResponse::success_message(message));
    }

    Ok(ApiResponse::success_with_message(
        json!({ "token": reset_token.token, "expiresAt": reset_token.expires_at }),
        message,
    ))
}

pub async fn reset_password(
    auth_service: web::Data<AuthService>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<ResetPasswordInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let user = auth_service
        .reset_password(&input.token, &input.new_password)
        .await?;

    audit_logger
        .record_detached(
            &req_info,
            AuditEntry::new(
                Module::Users,
                AuditAction::PasswordReset,
                "user",
                format!("Password reset for {}", user.email),
            )
            .entity(user.id)
            .actor(&user),
        )
        .await;

    Ok(ApiResponse::success_message(
        "Password has been reset successfully.",
    ))
}

pub async fn change_password(
    ctx: UserContext,
    auth_service: web::Data<AuthService>,
    audit_logger: web::Data<AuditLogger>,
    input: web::Json<ChangePasswordInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    auth_service
        .change_password(&ctx.user, &input.current_password, &input.new_password)
        .await?;

    audit_logger
        .record_detached(
            &req_info,
            AuditEntry::new(
                Module::Users,
                AuditAction::PasswordChanged,
                "user",
                format!("User {} changed their password", ctx.user_email()),
            )
            .entity(ctx.user_id())
            .actor(&ctx.user),
        )
        .await;

    Ok(ApiResponse::success_message(
        "Password changed successfully.",
    ))
}
