use actix_web::web;

use crate::handlers::analytics;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/analytics").route("/overview", web::get().to(analytics::overview)));
}
