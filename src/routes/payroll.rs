use actix_web::web;

use crate::handlers::payroll;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payroll")
            .route("/me", web::get().to(payroll::my_payroll))
            .route("", web::get().to(payroll::list_payroll))
            .route("", web::post().to(payroll::create_payroll))
            .route("/{id}", web::get().to(payroll::get_payroll))
            .route("/{id}", web::put().to(payroll::update_payroll))
            .route("/{id}", web::delete().to(payroll::delete_payroll))
            .route("/{id}/status", web::put().to(payroll::update_payroll_status)),
    );
}
