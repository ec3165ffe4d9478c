use actix_web::web;

use crate::handlers::finance;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/finance")
            .route("/summary", web::get().to(finance::summary))
            .route("/transactions", web::get().to(finance::list_transactions))
            .route("/transactions", web::post().to(finance::create_transaction))
            .route("/transactions/{id}", web::get().to(finance::get_transaction))
            .route(
                "/transactions/{id}",
                web::put().to(finance::update_transaction),
            )
            .route(
                "/transactions/{id}",
                web::delete().to(finance::delete_transaction),
            ),
    );
}
