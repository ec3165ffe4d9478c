mod macros;
mod money;

pub mod analytics;
pub mod attendance;
pub mod audit_log;
pub mod auth;
pub mod content;
pub mod employee;
pub mod finance;
pub mod leave;
pub mod payroll;
pub mod project;
pub mod role;
pub mod task;
pub mod team;
pub mod user;

// Re-export all models for easy importing
pub use analytics::*;
pub use attendance::*;
pub use audit_log::*;
pub use auth::*;
pub use content::*;
pub use employee::*;
pub use finance::*;
pub use leave::*;
pub use payroll::*;
pub use project::*;
pub use role::*;
pub use task::*;
pub use team::*;
pub use user::*;
