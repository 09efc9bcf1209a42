//! # lib_common
//!
//! Shared library of the findata workspace: options-flow analytics, Yahoo
//! Finance and NewsAPI clients, and the validation, rate limiting, logging and
//! configuration layers they are built on. Each top-level module sits behind
//! the cargo feature of the same name; `full` enables all of them.

#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "markets")]
pub mod markets;
#[cfg(feature = "retrieve")]
pub mod retrieve;
#[cfg(feature = "security")]
pub mod security;
#[cfg(feature = "utils")]
pub mod utils;
