pub mod rate_limit;
pub mod request_id;
pub mod request_info;

pub use rate_limit::{
    AuthRateLimiter, GlobalRateLimiter, RateLimitConfig, RateLimitStore, RateLimitStores,
    cleanup_rate_limits,
};
pub use request_id::{RequestId, RequestIdExt};
pub use request_info::{RequestInfo, RequestInfoMiddleware};
