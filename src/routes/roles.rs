use actix_web::web;

use crate::handlers::roles;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/roles")
            // registered before /{id} so "modules" is not parsed as an id
            .route("/modules", web::get().to(roles::list_modules))
            .route("", web::get().to(roles::list_roles))
            .route("", web::post().to(roles::create_role))
            .route("/{id}", web::get().to(roles::get_role))
            .route("/{id}", web::put().to(roles::update_role))
            .route("/{id}", web::delete().to(roles::delete_role)),
    );
}
