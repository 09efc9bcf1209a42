//! # Configuration Modules
//!
//! Layered runtime settings: built-in defaults, an optional JSON file, `.env`,
//! environment variables and command-line flags.

/// Provides system-level configuration management.
pub mod config_sys;
