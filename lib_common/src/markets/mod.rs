//! # Financial Market APIs Module
//!
//! This module groups together the options-flow analytics and the client
//! implementations for the financial data providers they draw on. Its purpose
//! is to abstract the details of interacting with external market services,
//! providing normalized, validated data to the rest of the system.
//!
//! ## Contained Modules:
//!
//! - **`options`**: Pure options-chain analytics: Max Pain, call/put ratios,
//!   sentiment classification, unusual volume and largest positions.
//!
//! - **`yahoo`**: Yahoo Finance clients for options chains, price history,
//!   quotes, company metadata, earnings and the global symbol tables.
//!   Includes browser-mimicking headers and a retry loop.
//!
//! - **`news`**: NewsAPI client and the lexicon-based headline sentiment.
//!
//! - **`sec`**: SEC EDGAR ticker lookup and recent filings.
//!
//! - **`fred`**: FRED series, metadata and the macro dashboard.
//!
//! - **`alphavantage`**: Alpha Vantage prices, quotes, fundamentals and the
//!   earnings calendar.
//!
//! - **`crypto`**: exchange flows, DeFi TVL, gas prices, exchange rankings
//!   and whale transfers.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Options contracts, chains and flow analytics.
pub mod options;
/// Client for Yahoo Finance options, chart and quote endpoints.
pub mod yahoo;
/// Client for NewsAPI with headline sentiment scoring.
pub mod news;
/// Client for SEC EDGAR filings.
pub mod sec;
/// Client for FRED macroeconomic series.
pub mod fred;
/// Client for Alpha Vantage market data and earnings calendar.
pub mod alphavantage;
/// Clients for crypto on-chain and DeFi providers.
pub mod crypto;
