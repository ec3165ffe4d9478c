use actix_web::web;
use sqlx::PgPool;

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;
pub use services::{AuditLogger, AuthService, RoleCache};

use database::repositories::{
    AnalyticsRepository, AttendanceRepository, AuditLogRepository, ContentRepository,
    EmployeeRepository, FinanceRepository, LeaveRepository, PasswordResetTokenRepository,
    PayrollRepository, ProjectRepository, RoleRepository, TaskRepository, TeamRepository,
    UserRepository,
};

/// Shared application data, built once and cloned into every worker.
#[derive(Clone)]
pub struct AppState {
    pub pool: web::Data<PgPool>,
    pub config: web::Data<Config>,
    pub auth_service: web::Data<AuthService>,
    pub audit_logger: web::Data<AuditLogger>,
    pub role_cache: web::Data<RoleCache>,
    pub user_repository: web::Data<UserRepository>,
    pub role_repository: web::Data<RoleRepository>,
    pub employee_repository: web::Data<EmployeeRepository>,
    pub attendance_repository: web::Data<AttendanceRepository>,
    pub leave_repository: web::Data<LeaveRepository>,
    pub payroll_repository: web::Data<PayrollRepository>,
    pub team_repository: web::Data<TeamRepository>,
    pub project_repository: web::Data<ProjectRepository>,
    pub task_repository: web::Data<TaskRepository>,
    pub finance_repository: web::Data<FinanceRepository>,
    pub content_repository: web::Data<ContentRepository>,
    pub analytics_repository: web::Data<AnalyticsRepository>,
    pub audit_log_repository: web::Data<AuditLogRepository>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let user_repository = UserRepository::new(pool.clone());
        let role_repository = RoleRepository::new(pool.clone());
        let audit_log_repository = AuditLogRepository::new(pool.clone());

        let auth_service = AuthService::new(
            pool.clone(),
            user_repository.clone(),
            role_repository.clone(),
            PasswordResetTokenRepository::new(pool.clone()),
            config.clone(),
        );
        let role_cache = RoleCache::new(role_repository.clone(), config.role_cache_ttl_seconds);
        let audit_logger = AuditLogger::new(audit_log_repository.clone());

        Self {
            config: web::Data::new(config),
            auth_service: web::Data::new(auth_service),
            audit_logger: web::Data::new(audit_logger),
            role_cache: web::Data::new(role_cache),
            user_repository: web::Data::new(user_repository),
            role_repository: web::Data::new(role_repository),
            employee_repository: web::Data::new(EmployeeRepository::new(pool.clone())),
            attendance_repository: web::Data::new(AttendanceRepository::new(pool.clone())),
            leave_repository: web::Data::new(LeaveRepository::new(pool.clone())),
            payroll_repository: web::Data::new(PayrollRepository::new(pool.clone())),
            team_repository: web::Data::new(TeamRepository::new(pool.clone())),
            project_repository: web::Data::new(ProjectRepository::new(pool.clone())),
            task_repository: web::Data::new(TaskRepository::new(pool.clone())),
            finance_repository: web::Data::new(FinanceRepository::new(pool.clone())),
            content_repository: web::Data::new(ContentRepository::new(pool.clone())),
            analytics_repository: web::Data::new(AnalyticsRepository::new(pool.clone())),
            audit_log_repository: web::Data::new(audit_log_repository),
            pool: web::Data::new(pool),
        }
    }

    /// Registers every shared value as app data.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.pool.clone())
            .app_data(self.config.clone())
            .app_data(self.auth_service.clone())
            .app_data(self.audit_logger.clone())
            .app_data(self.role_cache.clone())
            .app_data(self.user_repository.clone())
            .app_data(self.role_repository.clone())
            .app_data(self.employee_repository.clone())
            .app_data(self.attendance_repository.clone())
            .app_data(self.leave_repository.clone())
            .app_data(self.payroll_repository.clone())
            .app_data(self.team_repository.clone())
            .app_data(self.project_repository.clone())
            .app_data(self.task_repository.clone())
            .app_data(self.finance_repository.clone())
            .app_data(self.content_repository.clone())
            .app_data(self.analytics_repository.clone())
            .app_data(self.audit_log_repository.clone());
    }
}
