//! # Alpha Vantage
//!
//! US equity prices, quotes, company fundamentals and the earnings calendar
//! from the Alpha Vantage `query` endpoint. The free tier allows 25 calls a
//! day, enforced by [`crate::security::rate_limiter::ALPHA_VANTAGE_LIMITER`].

/// Alpha Vantage client.
pub mod marketdata;
