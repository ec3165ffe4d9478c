pub mod audit_logger;
pub mod auth;
pub mod permissions;
pub mod role_cache;
pub mod user_context;

pub use audit_logger::{AuditEntry, AuditLogger};
pub use auth::{AuthService, Claims};
pub use permissions::PermissionSet;
pub use role_cache::RoleCache;
pub use user_context::UserContext;
