use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

pub type RequestLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// HTTP client shared by every remote call.
pub fn default_http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .timeout(timeout)
        .user_agent(concat!("stateboard/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// `None` (no limit) when `requests_per_second` is absent or zero.
pub fn request_limiter(requests_per_second: Option<u32>) -> Option<Arc<RequestLimiter>> {
    requests_per_second
        .and_then(NonZeroU32::new)
        .map(|nz| Arc::new(RateLimiter::direct(Quota::per_second(nz))))
}
