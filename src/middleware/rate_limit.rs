use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::error::{AppError, AppResult};

/// Per-key request counter for the current window
#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    count: u32,
    window_start_ms: i64,
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limited: bool,
    /// Requests seen in the current window, including this one
    pub count: u32,
    /// Milliseconds until the current window resets
    pub remaining_ms: i64,
    /// Unix timestamp (ms) at which the current window resets
    pub reset_time_ms: i64,
}

/// Fixed-window rate limiter keyed by an opaque client identifier.
///
/// State is process-local and counters for distinct keys are fully
/// independent. Records are never evicted; under pathological traffic the
/// key map grows unboundedly, which is an accepted limitation at this
/// scale. Deployments with multiple instances do not share counters.
pub struct RateLimiter {
    max_requests: u32,
    window_ms: i64,
    records: Mutex<HashMap<String, WindowRecord>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms: window_ms as i64,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Records a request for `key` and reports whether it exceeds the limit
    pub fn check(&self, key: &str) -> RateLimitStatus {
        self.check_at(key, Utc::now().timestamp_millis())
    }

    /// Clock-injected variant of [`check`](Self::check)
    pub fn check_at(&self, key: &str, now_ms: i64) -> RateLimitStatus {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());

        let window_ms = self.window_ms;
        let record = *records
            .entry(key.to_string())
            .and_modify(|record| {
                if now_ms >= record.window_start_ms + window_ms {
                    // Previous window elapsed; start a fresh one
                    record.count = 1;
                    record.window_start_ms = now_ms;
                } else {
                    record.count += 1;
                }
            })
            .or_insert(WindowRecord {
                count: 1,
                window_start_ms: now_ms,
            });

        let reset_time_ms = record.window_start_ms + self.window_ms;

        RateLimitStatus {
            limited: record.count > self.max_requests,
            count: record.count,
            remaining_ms: reset_time_ms - now_ms,
            reset_time_ms,
        }
    }

    /// Builds the rejection error for a limited request
    pub fn rejection(&self, status: RateLimitStatus) -> AppError {
        AppError::RateLimited {
            count: status.count,
            limit: self.max_requests,
            window_ms: self.window_ms,
            reset_time_ms: status.reset_time_ms,
            retry_after_secs: retry_after_secs(status.remaining_ms),
        }
    }

    /// Enforces the limit for `key`, failing with a classified error
    pub fn enforce(&self, key: &str) -> AppResult<RateLimitStatus> {
        let status = self.check(key);
        if status.limited {
            tracing::warn!(
                client_key = %key,
                count = status.count,
                limit = self.max_requests,
                "Rate limit exceeded"
            );
            return Err(self.rejection(status));
        }
        Ok(status)
    }
}

/// Middleware enforcing the per-client limit on the wrapped routes.
///
/// Allowed responses also carry the `X-RateLimit-*` headers so well-behaved
/// clients can pace themselves before hitting the limit.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_key(request.headers());
    let status = limiter.enforce(&key)?;

    let mut response = next.run(request).await;

    let remaining = limiter.max_requests() as i64 - status.count as i64;
    response.headers_mut().extend(rate_limit_headers(
        limiter.max_requests(),
        remaining,
        status.reset_time_ms,
    ));

    Ok(response)
}

/// Seconds a limited client should wait before retrying, rounded up
fn retry_after_secs(remaining_ms: i64) -> i64 {
    (remaining_ms.max(0) + 999) / 1000
}

/// Standard rate-limit headers derived from limiter state.
///
/// `remaining` is clamped at zero so over-limit counts never surface as
/// negative values; `X-RateLimit-Reset` is a Unix timestamp in seconds.
pub fn rate_limit_headers(limit: u32, remaining: i64, reset_time_ms: i64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let entries = [
        ("x-ratelimit-limit", limit as i64),
        ("x-ratelimit-remaining", remaining.max(0)),
        ("x-ratelimit-reset", reset_time_ms.div_euclid(1000)),
    ];
    for (name, value) in entries {
        if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
            headers.insert(name, value);
        }
    }
    headers
}

/// Derives the rate-limit key for an inbound request.
///
/// Prefers the first entry of `x-forwarded-for`, then `x-real-ip`, then
/// the literal `"unknown"`.
pub fn client_key(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW_MS: u64 = 60_000;

    #[test]
    fn test_allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(5, WINDOW_MS);
        let now = 1_700_000_000_000;

        for i in 1..=5 {
            let status = limiter.check_at("ip-a", now + i);
            assert!(!status.limited, "request {} should be allowed", i);
            assert_eq!(status.count, i as u32);
        }

        let status = limiter.check_at("ip-a", now + 6);
        assert!(status.limited);
        assert_eq!(status.count, 6);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(2, WINDOW_MS);
        let now = 1_700_000_000_000;

        limiter.check_at("ip-a", now);
        limiter.check_at("ip-a", now);
        assert!(limiter.check_at("ip-a", now).limited);

        // Key B still has its full budget
        assert!(!limiter.check_at("ip-b", now).limited);
    }

    #[test]
    fn test_window_reset() {
        let limiter = RateLimiter::new(1, WINDOW_MS);
        let start = 1_700_000_000_000;

        assert!(!limiter.check_at("ip-a", start).limited);
        assert!(limiter.check_at("ip-a", start + 10).limited);

        // Boundary is inclusive: now == window_start + window starts fresh
        let status = limiter.check_at("ip-a", start + WINDOW_MS as i64);
        assert!(!status.limited);
        assert_eq!(status.count, 1);
        assert_eq!(status.reset_time_ms, start + 2 * WINDOW_MS as i64);
    }

    #[test]
    fn test_reset_time_fixed_within_window() {
        let limiter = RateLimiter::new(10, WINDOW_MS);
        let start = 1_700_000_000_000;

        let first = limiter.check_at("ip-a", start);
        let second = limiter.check_at("ip-a", start + 30_000);
        assert_eq!(first.reset_time_ms, second.reset_time_ms);
        assert_eq!(second.remaining_ms, 30_000);
    }

    #[test]
    fn test_rejection_error_fields() {
        let limiter = RateLimiter::new(1, WINDOW_MS);
        let start = 1_700_000_000_000;
        limiter.check_at("ip-a", start);
        let status = limiter.check_at("ip-a", start + 500);

        match limiter.rejection(status) {
            AppError::RateLimited {
                count,
                limit,
                window_ms,
                reset_time_ms,
                retry_after_secs,
            } => {
                assert_eq!(count, 2);
                assert_eq!(limit, 1);
                assert_eq!(window_ms, WINDOW_MS as i64);
                assert_eq!(reset_time_ms, start + WINDOW_MS as i64);
                // 59.5s remaining rounds up to 60
                assert_eq!(retry_after_secs, 60);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_headers_clamp_negative_remaining() {
        let headers = rate_limit_headers(100, -5, 1_700_000_000_000);
        assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "100");
        assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "0");
        assert_eq!(headers.get("x-ratelimit-reset").unwrap(), "1700000000");
    }

    #[test]
    fn test_client_key_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(client_key(&headers), "203.0.113.7");
    }

    #[test]
    fn test_client_key_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(client_key(&headers), "198.51.100.2");
    }

    #[test]
    fn test_client_key_unknown_without_headers() {
        assert_eq!(client_key(&HeaderMap::new()), "unknown");
    }
}
