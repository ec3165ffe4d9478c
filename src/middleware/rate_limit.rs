use actix_web::{
    Error, HttpResponse, Result,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    web::Data,
};
use chrono::{DateTime, Duration, Utc};
use futures_util::future::LocalBoxFuture;
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    rc::Rc,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use uuid::Uuid;

use crate::{config::Config, handlers::shared::ApiResponse, services::auth::decode_token};

/// Rate limit configuration
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Window duration in seconds
    pub window_seconds: i64,
    /// Message to return when rate limit is exceeded
    pub message: String,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_seconds: i64) -> Self {
        Self {
            max_requests,
            window_seconds,
            message: "Rate limit exceeded. Please try again later.".to_string(),
        }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(100, 60)
    }
}

#[derive(Debug, Clone)]
struct RequestTracker {
    count: u32,
    window_start: DateTime<Utc>,
}

impl RequestTracker {
    fn new() -> Self {
        Self {
            count: 0,
            window_start: Utc::now(),
        }
    }

    fn is_expired(&self, window_seconds: i64) -> bool {
        let window_duration =
            Duration::try_seconds(window_seconds).unwrap_or(Duration::seconds(60));
        Utc::now() > self.window_start + window_duration
    }

    /// Counts one request; false once the window is full.
    fn hit(&mut self, config: &RateLimitConfig) -> bool {
        if self.is_expired(config.window_seconds) {
            self.count = 1;
            self.window_start = Utc::now();
            true
        } else if self.count >= config.max_requests {
            false
        } else {
            self.count += 1;
            true
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic mid-update leaves counters that are still usable
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Request counters, shared by every worker that holds a clone.
#[derive(Clone, Default)]
pub struct RateLimitStore {
    ip_trackers: Arc<Mutex<HashMap<IpAddr, RequestTracker>>>,
    user_trackers: Arc<Mutex<HashMap<Uuid, RequestTracker>>>,
}

impl RateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_and_update_ip(&self, ip: IpAddr, config: &RateLimitConfig) -> bool {
        lock(&self.ip_trackers)
            .entry(ip)
            .or_insert_with(RequestTracker::new)
            .hit(config)
    }

    fn check_and_update_user(&self, user_id: Uuid, config: &RateLimitConfig) -> bool {
        lock(&self.user_trackers)
            .entry(user_id)
            .or_insert_with(RequestTracker::new)
            .hit(config)
    }

    /// Clean up expired entries to prevent memory leaks
    pub fn cleanup_expired(&self, window_seconds: i64) {
        lock(&self.ip_trackers).retain(|_, tracker| !tracker.is_expired(window_seconds));
        lock(&self.user_trackers).retain(|_, tracker| !tracker.is_expired(window_seconds));
    }

    pub fn tracked_clients(&self) -> usize {
        lock(&self.ip_trackers).len() + lock(&self.user_trackers).len()
    }
}

fn client_ip(req: &ServiceRequest) -> Option<IpAddr> {
    let conn = req.connection_info();
    let addr = conn.peer_addr()?;
    addr.parse::<SocketAddr>()
        .map(|socket| socket.ip())
        .or_else(|_| addr.parse::<IpAddr>())
        .ok()
}

/// Subject of a valid bearer token, if the request carries one.
fn authenticated_user(req: &ServiceRequest) -> Option<Uuid> {
    let config = req.app_data::<Data<Config>>()?;
    let token = req
        .headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;

    decode_token(token.trim(), &config.jwt_secret)
        .ok()
        .map(|claims| claims.user_id())
}

/// Rate limiting middleware
pub struct RateLimitMiddleware {
    store: RateLimitStore,
    config: RateLimitConfig,
    apply_to_authenticated: bool,
}

impl RateLimitMiddleware {
    pub fn new(config: RateLimitConfig, store: RateLimitStore) -> Self {
        Self {
            store,
            config,
            apply_to_authenticated: false,
        }
    }

    /// Also count requests per authenticated user, across IPs
    pub fn with_authenticated_users(mut self) -> Self {
        self.apply_to_authenticated = true;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitService<S>;
    type InitError = ();
    type Future = futures_util::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        futures_util::future::ready(Ok(RateLimitService {
            service: Rc::new(service),
            store: self.store.clone(),
            config: self.config.clone(),
            apply_to_authenticated: self.apply_to_authenticated,
        }))
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    store: RateLimitStore,
    config: RateLimitConfig,
    apply_to_authenticated: bool,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let store = self.store.clone();
        let config = self.config.clone();
        let apply_to_authenticated = self.apply_to_authenticated;

        Box::pin(async move {
            let ip = client_ip(&req);
            let user_id = if apply_to_authenticated {
                authenticated_user(&req)
            } else {
                None
            };

            let allowed_ip = ip.is_none_or(|ip| store.check_and_update_ip(ip, &config));
            let allowed_user =
                user_id.is_none_or(|user_id| store.check_and_update_user(user_id, &config));

            if !(allowed_ip && allowed_user) {
                log::warn!(
                    "Rate limit exceeded for {} {} (ip: {:?}, user: {:?})",
                    req.method(),
                    req.path(),
                    ip,
                    user_id
                );
                let response = HttpResponse::TooManyRequests()
                    .json(ApiResponse::<()>::error(&config.message));
                return Ok(req.into_response(response).map_into_right_body());
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

/// Limits for the public authentication endpoints.
pub struct AuthRateLimiter;

impl AuthRateLimiter {
    pub fn login(store: RateLimitStore) -> RateLimitMiddleware {
        RateLimitMiddleware::new(
            RateLimitConfig::new(5, 300)
                .with_message("Too many login attempts. Please try again in 5 minutes."),
            store,
        )
    }

    pub fn registration(store: RateLimitStore) -> RateLimitMiddleware {
        RateLimitMiddleware::new(
            RateLimitConfig::new(3, 3600)
                .with_message("Too many registration attempts. Please try again later."),
            store,
        )
    }

    pub fn password_reset(store: RateLimitStore) -> RateLimitMiddleware {
        RateLimitMiddleware::new(
            RateLimitConfig::new(3, 900)
                .with_message("Too many password reset attempts. Please try again in 15 minutes."),
            store,
        )
    }
}

pub struct GlobalRateLimiter;

impl GlobalRateLimiter {
    /// 100 requests per minute per IP and per user.
    pub fn general(store: RateLimitStore) -> RateLimitMiddleware {
        RateLimitMiddleware::new(RateLimitConfig::new(100, 60), store).with_authenticated_users()
    }
}

/// One store per limiter, created before the server starts so every worker
/// counts against the same window.
#[derive(Clone, Default)]
pub struct RateLimitStores {
    pub general: RateLimitStore,
    pub login: RateLimitStore,
    pub registration: RateLimitStore,
    pub password_reset: RateLimitStore,
}

impl RateLimitStores {
    pub fn all(&self) -> Vec<RateLimitStore> {
        vec![
            self.general.clone(),
            self.login.clone(),
            self.registration.clone(),
            self.password_reset.clone(),
        ]
    }
}

/// Background task to clean up expired rate limit entries
pub async fn cleanup_rate_limits(stores: Vec<RateLimitStore>, interval_seconds: u64) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_seconds));

    loop {
        interval.tick().await;
        for store in &stores {
            store.cleanup_expired(3600);
        }
        log::debug!("Cleaned up expired rate limit entries");
    }
}
