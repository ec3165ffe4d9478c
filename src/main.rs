use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware::Logger};
use anyhow::Result;

use creatorbase::{
    AppState, Config,
    database::init_database,
    middleware::{
        GlobalRateLimiter, RateLimitStores, RequestId, RequestInfoMiddleware, cleanup_rate_limits,
    },
    routes,
};

const RATE_LIMIT_CLEANUP_INTERVAL_SECONDS: u64 = 300;

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().body("CreatorBase API v1.0")
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now()
    }))
}

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init();

    log::info!("Starting CreatorBase API server...");

    let config = Config::from_env()?;
    log::info!("Configuration loaded (environment: {})", config.environment);

    let pool = init_database(&config).await?;
    log::info!("Database initialized");

    let state = AppState::new(pool, config.clone());

    // Counters live outside the worker factory so all workers share them
    let rate_limits = RateLimitStores::default();
    tokio::spawn(cleanup_rate_limits(
        rate_limits.all(),
        RATE_LIMIT_CLEANUP_INTERVAL_SECONDS,
    ));

    let server_address = config.server_address();
    let allowed_origin = config.client_base_url.clone();
    log::info!("Server starting on http://{}", server_address);

    HttpServer::new(move || {
        App::new()
            .configure(|cfg| state.configure(cfg))
            .wrap(GlobalRateLimiter::general(rate_limits.general.clone()))
            .wrap(RequestInfoMiddleware)
            .wrap(
                Cors::default()
                    .allowed_origin(&allowed_origin)
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        "Authorization",
                        "Content-Type",
                        "Accept",
                        "X-Requested-With",
                        "X-Correlation-ID",
                    ])
                    .expose_headers(vec!["X-Correlation-ID"])
                    .max_age(3600),
            )
            .wrap(RequestId)
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T correlation_id=%{x-correlation-id}o"#,
            ))
            .service(hello)
            .service(health)
            .configure(|cfg| routes::configure(cfg, &rate_limits))
    })
    .bind(&server_address)?
    .run()
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
