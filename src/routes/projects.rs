use actix_web::web;

use crate::handlers::projects;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/projects")
            .route("", web::get().to(projects::list_projects))
            .route("", web::post().to(projects::create_project))
            .route("/{id}", web::get().to(projects::get_project))
            .route("/{id}", web::put().to(projects::update_project))
            .route("/{id}", web::delete().to(projects::delete_project)),
    );
}
