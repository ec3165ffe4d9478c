use std::net::SocketAddr;

use actix_web::{App, HttpResponse, http::StatusCode, test, web};
use creatorbase::{
    Config,
    middleware::{AuthRateLimiter, GlobalRateLimiter, RateLimitStore, RateLimitStores},
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use uuid::Uuid;

mod common;

async fn ok() -> HttpResponse {
    HttpResponse::Ok().finish()
}

fn peer(ip: &str) -> SocketAddr {
    format!("{ip}:40000").parse().unwrap()
}

#[actix_web::test]
async fn test_login_limit_blocks_sixth_attempt() {
    common::setup_test_env();
    let store = RateLimitStore::new();
    let app = test::init_service(
        App::new().service(
            web::resource("/login")
                .wrap(AuthRateLimiter::login(store.clone()))
                .route(web::post().to(ok)),
        ),
    )
    .await;

    for _ in 0..5 {
        let req = test::TestRequest::post()
            .uri("/login")
            .peer_addr(peer("10.0.0.1"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::post()
        .uri("/login")
        .peer_addr(peer("10.0.0.1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Too many login attempts. Please try again in 5 minutes."
    );

    // other clients keep their own window
    let req = test::TestRequest::post()
        .uri("/login")
        .peer_addr(peer("10.0.0.2"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(store.tracked_clients(), 2);
}

#[actix_web::test]
async fn test_store_is_shared_between_app_instances() {
    common::setup_test_env();
    let store = RateLimitStore::new();

    // two workers built from the same store
    let first = test::init_service(
        App::new().service(
            web::resource("/register")
                .wrap(AuthRateLimiter::registration(store.clone()))
                .route(web::post().to(ok)),
        ),
    )
    .await;
    let second = test::init_service(
        App::new().service(
            web::resource("/register")
                .wrap(AuthRateLimiter::registration(store.clone()))
                .route(web::post().to(ok)),
        ),
    )
    .await;

    let register = || {
        test::TestRequest::post()
            .uri("/register")
            .peer_addr(peer("192.168.1.7"))
            .to_request()
    };
    assert_eq!(test::call_service(&first, register()).await.status(), StatusCode::OK);
    assert_eq!(test::call_service(&second, register()).await.status(), StatusCode::OK);
    assert_eq!(test::call_service(&first, register()).await.status(), StatusCode::OK);

    assert_eq!(
        test::call_service(&second, register()).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[actix_web::test]
async fn test_general_limiter_counts_authenticated_user_across_ips() {
    common::setup_test_env();
    let config = Config::test_config();
    let user_id = Uuid::new_v4();
    let token = common::token_for(user_id, "ada@example.com", &config);

    let store = RateLimitStore::new();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(config))
            .wrap(GlobalRateLimiter::general(store.clone()))
            .route("/ping", web::get().to(ok)),
    )
    .await;

    let mut last = StatusCode::OK;
    for i in 0..101 {
        // a new address every call, so only the per-user counter can trip
        let req = test::TestRequest::get()
            .uri("/ping")
            .peer_addr(peer(&format!("10.1.{}.{}", i / 250, i % 250 + 1)))
            .insert_header(common::bearer(&token))
            .to_request();
        last = test::call_service(&app, req).await.status();
    }

    assert_eq!(last, StatusCode::TOO_MANY_REQUESTS);
}

#[actix_web::test]
async fn test_login_route_is_limited_in_full_app() {
    common::setup_test_env();
    let limits = RateLimitStores::default();
    let state = common::lazy_state();
    let app = test::init_service(
        App::new()
            .configure(|cfg| state.configure(cfg))
            .configure(|cfg| creatorbase::routes::configure(cfg, &limits)),
    )
    .await;

    // malformed bodies fail validation without a database, but still count
    for _ in 0..5 {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .peer_addr(peer("172.16.0.9"))
            .set_json(json!({ "email": "x" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .peer_addr(peer("172.16.0.9"))
        .set_json(json!({ "email": "x" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limits.login.tracked_clients() > 0);
}

#[actix_web::test]
async fn test_stores_cover_every_limiter() {
    let stores = RateLimitStores::default();
    assert_eq!(stores.all().len(), 4);
    stores.general.cleanup_expired(3600);
    assert_eq!(stores.general.tracked_clients(), 0);
}
