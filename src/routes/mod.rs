use actix_web::web;

use crate::middleware::RateLimitStores;

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
pub mod tasks;
pub mod teams;
pub mod users;

pub fn configure(cfg: &mut web::ServiceConfig, limits: &RateLimitStores) {
    cfg.service(
        web::scope("/api/v1")
            .configure(|cfg| auth::configure(cfg, limits))
            .configure(users::configure)
            .configure(roles::configure)
            .configure(employees::configure)
            .configure(attendance::configure)
            .configure(leaves::configure)
            .configure(payroll::configure)
            .configure(teams::configure)
            .configure(projects::configure)
            .configure(tasks::configure)
            .configure(finance::configure)
            .configure(content::configure)
            .configure(analytics::configure)
            .configure(audit_logs::configure),
    );
}
