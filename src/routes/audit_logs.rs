use actix_web::web;

use crate::handlers::audit_logs;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/audit-logs")
            .route("", web::get().to(audit_logs::list_audit_logs))
            .route("/{id}", web::get().to(audit_logs::get_audit_log)),
    );
}
