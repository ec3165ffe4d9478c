use actix_web::web;

use crate::handlers::content;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/content")
            .route("", web::get().to(content::list_content))
            .route("", web::post().to(content::create_content))
            .route("/{id}", web::get().to(content::get_content))
            .route("/{id}", web::put().to(content::update_content))
            .route("/{id}", web::delete().to(content::delete_content))
            .route("/{id}/status", web::put().to(content::update_content_status)),
    );
}
