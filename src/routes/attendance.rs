use actix_web::web;

use crate::handlers::attendance;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/attendance")
            .route("/check-in", web::post().to(attendance::check_in))
            .route("/check-out", web::post().to(attendance::check_out))
            .route("/me", web::get().to(attendance::my_attendance))
            .route("", web::get().to(attendance::list_attendance))
            .route("", web::post().to(attendance::create_attendance))
            .route("/{id}", web::get().to(attendance::get_attendance))
            .route("/{id}", web::put().to(attendance::update_attendance))
            .route("/{id}", web::delete().to(attendance::delete_attendance)),
    );
}
