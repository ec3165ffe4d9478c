use actix_web::web;

use crate::handlers::users;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("", web::get().to(users::list_users))
            .route("", web::post().to(users::create_user))
            .route("/{id}", web::get().to(users::get_user))
            .route("/{id}", web::put().to(users::update_user))
            .route("/{id}", web::delete().to(users::delete_user))
            .route("/{id}/role", web::put().to(users::assign_role))
            .route("/{id}/permissions", web::get().to(users::get_user_permissions))
            .route("/{id}/permissions", web::put().to(users::set_user_permissions))
            .route(
                "/{id}/permissions",
                web::delete().to(users::clear_user_permissions),
            ),
    );
}
