use actix_web::web;

use crate::{
    handlers::auth,
    middleware::{AuthRateLimiter, RateLimitStores},
};

pub fn configure(cfg: &mut web::ServiceConfig, limits: &RateLimitStores) {
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/register")
                    .wrap(AuthRateLimiter::registration(limits.registration.clone()))
                    .route(web::post().to(auth::register)),
            )
            .service(
                web::resource("/login")
                    .wrap(AuthRateLimiter::login(limits.login.clone()))
                    .route(web::post().to(auth::login)),
            )
            .service(
                web::resource("/forgot-password")
                    .wrap(AuthRateLimiter::password_reset(limits.password_reset.clone()))
                    .route(web::post().to(auth::forgot_password)),
            )
            .service(
                web::resource("/reset-password")
                    .wrap(AuthRateLimiter::password_reset(limits.password_reset.clone()))
                    .route(web::post().to(auth::reset_password)),
            )
            .route("/me", web::get().to(auth::me))
            .route("/change-password", web::put().to(auth::change_password)),
    );
}
