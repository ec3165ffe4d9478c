use actix_web::web;

use crate::handlers::teams;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/teams")
            .route("", web::get().to(teams::list_teams))
            .route("", web::post().to(teams::create_team))
            .route("/{id}", web::get().to(teams::get_team))
            .route("/{id}", web::put().to(teams::update_team))
            .route("/{id}", web::delete().to(teams::delete_team))
            .route("/{id}/members", web::get().to(teams::get_team_members))
            .route(
                "/{team_id}/members/{user_id}",
                web::post().to(teams::add_team_member),
            )
            .route(
                "/{team_id}/members/{user_id}",
                web::delete().to(teams::remove_team_member),
            ),
    );
}
