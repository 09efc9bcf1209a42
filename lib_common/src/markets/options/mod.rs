//! # Options Flow
//!
//! Validated chain types and the pure analytics that turn a chain into an
//! options-flow report: Max Pain, call/put ratios, a sentiment decision
//! table, unusual-volume alerts and the largest open-interest positions.
//!
//! Nothing in this module performs I/O. Chains come from
//! [`crate::markets::yahoo::optionschain::OptionsDataClient`] or are built by
//! hand through [`contract::OptionContract::builder`].

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Max pain, ratios, sentiment, unusual volume and position ranking.
pub mod analytics;
/// Contract and chain records with construction-time validation.
pub mod contract;
/// Report assembly.
pub mod flowreport;

pub use analytics::{
    classify_sentiment, detect_unusual_volume, find_largest_positions, max_pain, ActivitySignal,
    FlowRatio, FlowTotals, PositionSummary, Sentiment, SentimentBias, SentimentStrength,
    UnusualActivity, DEFAULT_VOLUME_THRESHOLD,
};
pub use contract::{ChainError, ContractError, OptionContract, OptionType, OptionsChain};
pub use flowreport::{analyze_chain, build_report, CallPutSummary, FlowAnalysis, OptionsFlowReport};

use crate::security::errors::{ApiError, ValidationError};

impl From<ChainError> for ApiError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::InvalidTicker(t) => ApiError::Validation(ValidationError::InvalidTicker(t)),
            ChainError::Fetch(msg) => ApiError::Network(msg),
            ChainError::NoData { .. }
            | ChainError::NoExpirations { .. }
            | ChainError::InvalidExpiration { .. } => ApiError::Upstream(e.to_string()),
            other => ApiError::Decode(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::errors::ErrorKind;

    #[test]
    fn test_chain_errors_map_to_client_errors() {
        let bad: ApiError = ChainError::InvalidTicker("A;B".into()).into();
        assert_eq!(bad.kind(), ErrorKind::Validation);

        let net: ApiError = ChainError::Fetch("timeout".into()).into();
        assert_eq!(net.kind(), ErrorKind::Network);

        let none: ApiError = ChainError::NoData { ticker: "ZZZZ".into() }.into();
        assert!(matches!(none, ApiError::Upstream(ref m) if m == "No options data found for ZZZZ"));

        let schema: ApiError = ChainError::Schema("missing optionChain".into()).into();
        assert!(matches!(schema, ApiError::Decode(_)));
    }
}
