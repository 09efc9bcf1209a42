//! # SEC EDGAR
//!
//! Ticker to CIK resolution and recent company filings from the public
//! EDGAR JSON feeds.

/// EDGAR filings client.
pub mod edgarfilings;
