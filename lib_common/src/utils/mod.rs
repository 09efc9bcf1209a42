//! # Utilities Module
//!
//! This module serves as a collection point for small, general-purpose helpers
//! shared by the `lib_common` crate: timestamp formatting for log records,
//! epoch-to-date conversion for upstream payloads, and numeric rounding used
//! when shaping report values.
//!
//! ## Contained Modules:
//!
//! - **`misc`**: Miscellaneous helper functions (`utils`).

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Miscellaneous utility functions for time formatting and rounding.
pub mod misc;
