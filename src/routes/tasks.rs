use actix_web::web;

use crate::handlers::tasks;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tasks")
            .route("", web::get().to(tasks::list_tasks))
            .route("", web::post().to(tasks::create_task))
            .route("/{id}", web::get().to(tasks::get_task))
            .route("/{id}", web::put().to(tasks::update_task))
            .route("/{id}", web::delete().to(tasks::delete_task))
            .route("/{id}/status", web::put().to(tasks::update_task_status)),
    );
}
