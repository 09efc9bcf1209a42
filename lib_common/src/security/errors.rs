//! # Client Errors
//!
//! `ApiError` is what every market client returns. `safe_api_call` is the
//! outermost wrapper: it logs the failure through the redacting logger and
//! reduces it to an [`ErrorPayload`] that is safe to show to an end user.

use super::rate_limiter::RateLimitExceeded;
use crate::loggers::loggerlocal::LoggerLocal;
use serde::Serialize;
use std::future::Future;
use thiserror::Error;

/// Rejected user input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The symbol failed [`super::validate_ticker`].
    #[error("Invalid ticker symbol: {0:?}")]
    InvalidTicker(String),

    /// The date did not match the expected layout.
    #[error("Invalid date {value:?}, expected format {format}")]
    InvalidDate {
        /// The rejected input.
        value: String,
        /// The chrono format it was checked against.
        format: String,
    },

    /// A numeric argument was outside its allowed range.
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Argument name.
        name: &'static str,
        /// Rejected value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// An alias missing from one of the symbol tables (indices, futures, ETFs).
    #[error("Unknown {table}: {key}. Available: {available:?}")]
    UnknownSymbol {
        /// Which table was searched, e.g. `"index"`.
        table: &'static str,
        /// The requested alias.
        key: String,
        /// Every known alias.
        available: Vec<String>,
    },

    /// A value outside a closed set, such as a chart period or interval.
    #[error("Unsupported {name}: {value:?}")]
    Unsupported {
        /// Argument name.
        name: &'static str,
        /// The rejected input.
        value: String,
    },
}

/// Failure of a market client call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The provider quota is exhausted.
    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),

    /// Input was rejected before any request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Transport-level failure (DNS, TLS, timeout, non-2xx after retries).
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered but reported a business error or no data.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A provider key is required but not configured.
    #[error("Missing API key: set the {0} environment variable")]
    MissingApiKey(&'static str),

    /// The payload did not match the expected schema.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Category reported in the `type` field of an [`ErrorPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Quota exhausted.
    RateLimit,
    /// Bad input.
    Validation,
    /// Missing configuration such as an API key.
    Configuration,
    /// Transport failure.
    Network,
    /// Anything else.
    Unknown,
}

/// User-facing error object: `{ "error": "...", "type": "..." }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    /// Human readable message. Generic for network and unknown failures.
    pub error: String,
    /// Failure category.
    #[serde(rename = "type")]
    pub kind: ErrorKind,
}

impl ApiError {
    /// The payload category for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::RateLimited(_) => ErrorKind::RateLimit,
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::MissingApiKey(_) => ErrorKind::Configuration,
            ApiError::Network(_) => ErrorKind::Network,
            ApiError::Upstream(_) | ApiError::Decode(_) => ErrorKind::Unknown,
        }
    }

    /// Reduces the error to what may be shown to an end user.
    pub fn to_payload(&self) -> ErrorPayload {
        let error = match self.kind() {
            ErrorKind::RateLimit | ErrorKind::Validation | ErrorKind::Configuration => {
                self.to_string()
            }
            ErrorKind::Network => "Network error. Please try again later.".to_string(),
            ErrorKind::Unknown => "An unexpected error occurred.".to_string(),
        };
        ErrorPayload { error, kind: self.kind() }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Network(e.to_string())
    }
}

/// Awaits `fut`, logging and flattening any [`ApiError`] into an [`ErrorPayload`].
///
/// Rate-limit and validation failures are logged as warnings; everything else
/// as an error tagged with `name`.
pub async fn safe_api_call<T, F>(
    logger: &LoggerLocal,
    name: &str,
    fut: F,
) -> Result<T, ErrorPayload>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match fut.await {
        Ok(value) => Ok(value),
        Err(e) => {
            let extras = Some(serde_json::json!({"call": name, "type": e.kind()}));
            match e.kind() {
                ErrorKind::RateLimit => logger.warn(&format!("Rate limit: {}", e), extras).await,
                ErrorKind::Validation => {
                    logger.warn(&format!("Validation error: {}", e), extras).await
                }
                ErrorKind::Network => {
                    logger.error(&format!("Network error in {}: {}", name, e), extras).await
                }
                ErrorKind::Configuration | ErrorKind::Unknown => {
                    logger.error(&format!("Unexpected error in {}: {}", name, e), extras).await
                }
            }
            Err(e.to_payload())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_details_are_hidden() {
        let e = ApiError::Network("dns error: lookup query1.finance.yahoo.com".into());
        let payload = e.to_payload();
        assert_eq!(payload.kind, ErrorKind::Network);
        assert_eq!(payload.error, "Network error. Please try again later.");
    }

    #[test]
    fn test_validation_message_is_kept() {
        let e: ApiError = ValidationError::InvalidTicker("A/B".into()).into();
        let payload = serde_json::to_value(e.to_payload()).unwrap();
        assert_eq!(payload["type"], "validation");
        assert_eq!(payload["error"], "Invalid ticker symbol: \"A/B\"");
    }

    #[test]
    fn test_rate_limit_payload() {
        let e: ApiError =
            RateLimitExceeded { max_calls: 25, period_secs: 86_400, wait_secs: 10 }.into();
        let payload = e.to_payload();
        assert_eq!(payload.kind, ErrorKind::RateLimit);
        assert!(payload.error.starts_with("Rate limit exceeded (25 calls per 86400s)"));
    }

    #[tokio::test]
    async fn test_safe_api_call_passes_success_through() {
        let logger = LoggerLocal::silent("safe_call_test");
        let ok: Result<u32, ErrorPayload> =
            safe_api_call(&logger, "ok", async { Ok::<_, ApiError>(3) }).await;
        assert_eq!(ok, Ok(3));

        let err = safe_api_call(&logger, "upstream", async {
            Err::<u32, _>(ApiError::Upstream("rCode 400".into()))
        })
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.error, "An unexpected error occurred.");
    }
}
