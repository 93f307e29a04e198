use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: u32,
    window_start: Instant,
}

/// Fixed-window request counter, one bucket per client key. The DashMap
/// entry lock makes same-key check-and-increment atomic, so concurrent
/// requests never undercount.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            buckets: DashMap::new(),
        }
    }

    /// True when the request is within budget. A fresh key or an elapsed
    /// window starts a new bucket at count 1.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut bucket = self.buckets.entry(key.to_owned()).or_insert(Bucket {
            count: 0,
            window_start: now,
        });

        if now.duration_since(bucket.window_start) >= self.window {
            bucket.count = 1;
            bucket.window_start = now;
            return true;
        }
        if bucket.count >= self.max_requests {
            return false;
        }
        bucket.count += 1;
        true
    }
}

/// Applied over the whole API; every request is counted against the client
/// socket address before routing.
pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !state.rate_limiter.check(&key) {
        tracing::warn!(client = %key, "rate limit exceeded");
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denies_the_request_over_the_maximum() {
        let limiter = RateLimiter::new(100, Duration::from_secs(3600));
        let now = Instant::now();
        for _ in 0..100 {
            assert!(limiter.check_at("10.0.0.1", now));
        }
        assert!(!limiter.check_at("10.0.0.1", now));
    }

    #[test]
    fn elapsed_window_resets_the_counter() {
        let limiter = RateLimiter::new(2, Duration::from_secs(3600));
        let start = Instant::now();
        assert!(limiter.check_at("10.0.0.1", start));
        assert!(limiter.check_at("10.0.0.1", start));
        assert!(!limiter.check_at("10.0.0.1", start));

        let later = start + Duration::from_secs(3601);
        assert!(limiter.check_at("10.0.0.1", later));
        assert!(limiter.check_at("10.0.0.1", later));
        assert!(!limiter.check_at("10.0.0.1", later));
    }

    #[test]
    fn keys_are_counted_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at("10.0.0.1", now));
        assert!(!limiter.check_at("10.0.0.1", now));
        assert!(limiter.check_at("10.0.0.2", now));
    }
}
