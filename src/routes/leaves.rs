use actix_web::web;

use crate::handlers::leaves;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/leaves")
            .route("/me", web::get().to(leaves::my_leaves))
            .route("", web::get().to(leaves::list_leaves))
            .route("", web::post().to(leaves::create_leave))
            .route("/{id}", web::get().to(leaves::get_leave))
            .route("/{id}/approve", web::post().to(leaves::approve_leave))
            .route("/{id}/reject", web::post().to(leaves::reject_leave))
            .route("/{id}/cancel", web::post().to(leaves::cancel_leave)),
    );
}
