#![allow(dead_code)]

use std::env;

use chrono::{Duration, Utc};
use creatorbase::{AppState, Config, services::Claims};
use jsonwebtoken::{EncodingKey, Header, encode};
use sqlx::{PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

pub fn setup_test_env() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// State over a pool that never connects. Good for anything rejected
/// before the first query.
pub fn lazy_state() -> AppState {
    let config = Config::test_config();
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(std::time::Duration::from_millis(200))
        .connect_lazy(&config.database_url)
        .expect("lazy pool accepts the test url");
    AppState::new(pool, config)
}

/// Migrated pool when `TEST_DATABASE_URL` is set; tests skip otherwise.
pub async fn database() -> Option<PgPool> {
    let url = env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    Some(pool)
}

pub fn token_for(user_id: Uuid, email: &str, config: &Config) -> String {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role: None,
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .expect("encode test token")
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// Full application as `main` wires it, minus CORS and logging.
macro_rules! init_app {
    ($state:expr) => {{
        let state: creatorbase::AppState = $state;
        let limits = creatorbase::middleware::RateLimitStores::default();
        actix_web::test::init_service(
            actix_web::App::new()
                .configure(|cfg| state.configure(cfg))
                .wrap(creatorbase::middleware::RequestInfoMiddleware)
                .wrap(creatorbase::middleware::RequestId)
                .configure(|cfg| creatorbase::routes::configure(cfg, &limits)),
        )
        .await
    }};
}

#[allow(unused_imports)]
pub(crate) use init_app;

macro_rules! skip_without_database {
    () => {
        match common::database().await {
            Some(pool) => pool,
            None => {
                eprintln!("TEST_DATABASE_URL not set; skipping");
                return;
            }
        }
    };
}

#[allow(unused_imports)]
pub(crate) use skip_without_database;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Inserts an active user holding `role` (by name) and returns it with a token.
pub async fn seed_user(
    pool: &PgPool,
    role: Option<&str>,
) -> (creatorbase::database::models::User, String) {
    use creatorbase::database::{
        models::User,
        repositories::{RoleRepository, UserRepository},
    };
    use fake::{Fake, faker::name::en::Name};

    let config = Config::test_config();
    let role_id = match role {
        Some(name) => Some(
            RoleRepository::new(pool.clone())
                .find_by_name(name)
                .await
                .expect("query role")
                .expect("seeded role exists")
                .id,
        ),
        None => None,
    };

    let email = format!("{}@creatorbase.test", Uuid::new_v4().simple());
    let hash = bcrypt::hash(TEST_PASSWORD, config.bcrypt_cost).expect("hash password");
    let name: String = Name().fake();
    let user = User::new(email, hash, name, role_id);

    let mut tx = pool.begin().await.expect("begin");
    let user = UserRepository::new(pool.clone())
        .create_user(&mut tx, &user)
        .await
        .expect("insert user");
    tx.commit().await.expect("commit");

    let token = token_for(user.id, &user.email, &config);
    (user, token)
}

/// State over a real pool with the test configuration.
pub fn state_for(pool: &PgPool) -> AppState {
    AppState::new(pool.clone(), Config::test_config())
}

/// Inserts a custom role with `permissions` and returns its generated name.
pub async fn seed_role(
    pool: &PgPool,
    permissions: Vec<creatorbase::database::models::Permission>,
) -> String {
    use creatorbase::database::repositories::RoleRepository;

    let name = format!("test_{}", &Uuid::new_v4().simple().to_string()[..12]);
    let mut tx = pool.begin().await.expect("begin");
    RoleRepository::new(pool.clone())
        .create_role(&mut tx, &name, Some("Created by tests"), permissions)
        .await
        .expect("insert role");
    tx.commit().await.expect("commit");
    name
}

/// Minimal employee payload, linked to `user_id` when given.
pub fn employee_body(user_id: Option<Uuid>) -> serde_json::Value {
    let code = format!("EMP-{}", &Uuid::new_v4().simple().to_string()[..8]);
    serde_json::json!({
        "userId": user_id,
        "employeeCode": code,
        "firstName": "Test",
        "lastName": "Person",
        "email": format!("{}@creatorbase.test", code.to_lowercase()),
        "dateOfJoining": "2025-06-01",
    })
}
