pub mod analytics;
pub mod attendance;
pub mod audit_logs;
pub mod auth;
pub mod content;
pub mod employees;
pub mod finance;
pub mod leaves;
pub mod payroll;
pub mod projects;
pub mod roles;
pub mod shared;
pub mod tasks;
pub mod teams;
pub mod users;
