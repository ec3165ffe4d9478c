pub mod analytics;
pub mod attendance;
pub mod audit_log;
pub mod content;
pub mod employee;
pub mod finance;
pub mod leave;
pub mod password_reset;
pub mod payroll;
pub mod project;
pub mod role;
pub mod task;
pub mod team;
pub mod user;

// Re-export all repositories for easy importing
pub use analytics::AnalyticsRepository;
pub use attendance::AttendanceRepository;
pub use audit_log::AuditLogRepository;
pub use content::ContentRepository;
pub use employee::EmployeeRepository;
pub use finance::FinanceRepository;
pub use leave::LeaveRepository;
pub use password_reset::PasswordResetTokenRepository;
pub use payroll::PayrollRepository;
pub use project::ProjectRepository;
pub use role::RoleRepository;
pub use task::TaskRepository;
pub use team::TeamRepository;
pub use user::UserRepository;
