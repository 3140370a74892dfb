use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::middleware::rate_limit::rate_limit_headers;

/// Application-level errors, each carrying a stable machine-readable code
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Rate limit exceeded: {count} requests in the current window (limit {limit})")]
    RateLimited {
        count: u32,
        limit: u32,
        window_ms: i64,
        reset_time_ms: i64,
        retry_after_secs: i64,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable error code exposed to clients
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Network(_) => "NETWORK_ERROR",
            AppError::Timeout(_) => "TIMEOUT_ERROR",
            AppError::Agent(_) => "AGENT_ERROR",
            AppError::RateLimited { .. } => "RATE_LIMIT_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the failure is transient and safe to retry automatically
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::Timeout(_))
    }

    /// Annotates a final failure with the number of attempts made
    pub fn with_attempts(self, attempts: u32) -> Self {
        let annotate = |msg: String| format!("{} (after {} attempts)", msg, attempts);
        match self {
            AppError::Network(msg) => AppError::Network(annotate(msg)),
            AppError::Timeout(msg) => AppError::Timeout(annotate(msg)),
            AppError::Agent(msg) => AppError::Agent(annotate(msg)),
            AppError::Internal(msg) => AppError::Internal(annotate(msg)),
            other => other,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Unclassified failures are wrapped, preserving the original message
        match err.downcast::<AppError>() {
            Ok(classified) => classified,
            Err(other) => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Network(_) | AppError::Agent(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
            "retryable": self.is_retryable(),
        }));

        let mut response = (status, body).into_response();

        if let AppError::RateLimited {
            count,
            limit,
            reset_time_ms,
            retry_after_secs,
            ..
        } = self
        {
            let remaining = limit as i64 - count as i64;
            let headers = response.headers_mut();
            headers.extend(rate_limit_headers(limit, remaining, reset_time_ms));
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                headers.insert("retry-after", value);
            }
        }

        response
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_retryability() {
        assert_eq!(AppError::Validation("x".into()).code(), "VALIDATION_ERROR");
        assert_eq!(AppError::Timeout("x".into()).code(), "TIMEOUT_ERROR");
        assert!(AppError::Network("x".into()).is_retryable());
        assert!(AppError::Timeout("x".into()).is_retryable());
        assert!(!AppError::Validation("x".into()).is_retryable());
        assert!(!AppError::Agent("x".into()).is_retryable());
    }

    #[test]
    fn test_with_attempts_annotates_message() {
        let err = AppError::Network("connection refused".into()).with_attempts(4);
        assert!(err.to_string().contains("after 4 attempts"));
    }

    #[test]
    fn test_with_attempts_leaves_validation_untouched() {
        let err = AppError::Validation("bad input".into()).with_attempts(2);
        assert!(!err.to_string().contains("attempts"));
    }

    #[test]
    fn test_rate_limited_response_headers() {
        let err = AppError::RateLimited {
            count: 12,
            limit: 10,
            window_ms: 60_000,
            reset_time_ms: 1_700_000_060_000,
            retry_after_secs: 42,
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let headers = response.headers();
        assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "10");
        // Over the limit, so remaining clamps to zero
        assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "0");
        assert_eq!(headers.get("x-ratelimit-reset").unwrap(), "1700000060");
        assert_eq!(headers.get("retry-after").unwrap(), "42");
    }
}
