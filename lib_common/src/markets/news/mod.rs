//! # Financial News
//!
//! NewsAPI headlines scored with a fixed word lexicon.

/// NewsAPI client.
pub mod apicallnews;
/// Lexicon scoring and summaries.
pub mod newssentiment;
