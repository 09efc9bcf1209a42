//! # Security Module
//!
//! Cross-cutting guards composed around every outbound market call:
//!
//! - **`validation`**: ticker, date, number and filename checks applied before
//!   any user input reaches a URL.
//! - **`rate_limiter`**: a sliding-window limiter plus the per-provider presets.
//! - **`errors`**: the client-facing error taxonomy and `safe_api_call`, which
//!   turns failures into a small `{ "error", "type" }` payload without leaking
//!   internals.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Client error taxonomy, user-facing payloads and the `safe_api_call` wrapper.
pub mod errors;
/// Sliding-window rate limiting and provider presets.
pub mod rate_limiter;
/// Input validation and sanitization helpers.
pub mod validation;

pub use errors::{safe_api_call, ApiError, ErrorKind, ErrorPayload, ValidationError};
pub use rate_limiter::{RateLimitExceeded, RateLimiter};
pub use validation::{
    ensure_range, is_safe_filename, sanitize_series_id, sanitize_slug, sanitize_ticker,
    truncate_string, validate_date_string, validate_numeric, validate_ticker,
};
