//! Rate limiting middleware using actix-governor.
//!
//! Each peer IP gets its own token bucket. The bucket size and refill
//! interval come from `RATE_LIMIT_BURST` and `RATE_LIMIT_REPLENISH_SECS`.

use actix_governor::governor::middleware::NoOpMiddleware;
use actix_governor::{Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor};

/// Type alias for the rate limiter configuration.
pub type RateLimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Type alias for the rate limiter.
pub type RateLimiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Builds the governor configuration.
///
/// Returns `None` when either value is zero, which governor rejects.
pub fn rate_limiter_config(burst: u32, replenish_secs: u64) -> Option<RateLimiterConfig> {
    GovernorConfigBuilder::default()
        .per_second(replenish_secs)
        .burst_size(burst)
        .finish()
}

/// Creates a per-IP rate limiter from a validated configuration.
///
/// `Governor` is built per worker, so the configuration is built once and
/// shared.
///
/// # Example
///
/// ```ignore
/// let limits = rate_limiter_config(30, 1).expect("non-zero limits");
///
/// HttpServer::new(move || {
///     App::new()
///         .wrap(create_rate_limiter(&limits))
///         .route("/api/endpoint", web::get().to(handler))
/// })
/// ```
pub fn create_rate_limiter(config: &RateLimiterConfig) -> RateLimiter {
    Governor::new(config)
}
