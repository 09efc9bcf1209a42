//! # Yahoo Finance
//!
//! Clients for the unofficial Yahoo Finance JSON endpoints. All of them share
//! [`apicallyahoo::ApiCallYahoo`], which adds browser headers and a short
//! linear-backoff retry on top of the workspace HTTP client.

/// GET helper with browser headers and retries.
pub mod apicallyahoo;
/// Earnings history, next report date and beat/miss trend.
pub mod earnings;
/// Options chains for the flow analytics.
pub mod optionschain;
/// Price history, quotes and company metadata.
pub mod pricehistory;
/// Exchange suffixes and alias tables.
pub mod symbols;
