//! # FRED Macro Data
//!
//! Observations and metadata of Federal Reserve Economic Data series, and a
//! fixed dashboard of headline indicators.

/// FRED client and dashboard.
pub mod macrodata;
