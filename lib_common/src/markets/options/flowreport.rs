//! # Options Flow Report
//!
//! Assembles the analytics of [`super::analytics`] into the serializable
//! report returned by the options client.

use super::analytics::{
    average_implied_volatility, classify_sentiment, detect_unusual_volume, find_largest_positions,
    max_pain, FlowRatio, FlowTotals, PositionSummary, Sentiment, UnusualActivity,
};
use super::contract::{ChainError, OptionsChain};
use crate::utils::misc::utils::round_to;
use chrono::NaiveDate;
use serde::Serialize;

/// Aggregate block of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowAnalysis {
    pub call_volume: u64,
    pub put_volume: u64,
    pub total_volume: u64,
    /// Rounded to 2 decimals; `"Infinity"` when puts did not trade.
    pub call_put_ratio: FlowRatio,
    pub call_open_interest: u64,
    pub put_open_interest: u64,
    pub total_open_interest: u64,
    /// Percent, 2 decimals.
    pub avg_implied_volatility: f64,
    pub max_pain: f64,
    pub sentiment: Sentiment,
    /// `None` when max pain is 0 or the spot price is unknown.
    pub distance_to_max_pain: Option<f64>,
}

/// Full options-flow report for one expiration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionsFlowReport {
    pub ticker: String,
    pub expiration: NaiveDate,
    pub underlying_price: Option<f64>,
    pub analysis: FlowAnalysis,
    pub unusual_activity: Vec<UnusualActivity>,
    pub largest_positions: Vec<PositionSummary>,
    pub available_expirations: Vec<NaiveDate>,
}

/// Call/put ratio summary for quick lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallPutSummary {
    pub ticker: String,
    pub expiration: NaiveDate,
    pub call_put_volume_ratio: FlowRatio,
    /// `None` when put open interest is 0.
    pub call_put_oi_ratio: Option<f64>,
    pub sentiment: Sentiment,
}

impl CallPutSummary {
    /// Projects a report onto the ratio summary.
    pub fn from_report(report: &OptionsFlowReport) -> Self {
        let a = &report.analysis;
        let call_put_oi_ratio = if a.put_open_interest == 0 {
            None
        } else {
            Some(round_to(a.call_open_interest as f64 / a.put_open_interest as f64, 2))
        };
        Self {
            ticker: report.ticker.clone(),
            expiration: report.expiration,
            call_put_volume_ratio: a.call_put_ratio,
            call_put_oi_ratio,
            sentiment: a.sentiment,
        }
    }
}

/// `|spot - max_pain|` rounded to 2 decimals.
pub fn distance_to_max_pain(underlying_price: Option<f64>, max_pain: f64) -> Option<f64> {
    if max_pain == 0.0 {
        return None;
    }
    underlying_price.map(|spot| round_to((spot - max_pain).abs(), 2))
}

/// Runs every analytic over `chain`.
///
/// The sentiment classifier sees the unrounded ratios; only the reported
/// values are rounded.
pub fn build_report(chain: &OptionsChain, volume_threshold: f64) -> OptionsFlowReport {
    let calls = chain.calls();
    let puts = chain.puts();

    let totals = FlowTotals::from_legs(calls, puts);
    let ratio = totals.call_put_ratio();
    let sentiment = classify_sentiment(ratio.as_f64(), totals.oi_ratio());
    let pain = max_pain(calls, puts);
    let avg_iv = average_implied_volatility(calls, puts);

    let unusual_activity = detect_unusual_volume(calls, puts, volume_threshold);
    let largest_positions = find_largest_positions(calls, puts);

    tracing::debug!(
        ticker = chain.ticker(),
        expiration = %chain.expiration(),
        calls = calls.len(),
        puts = puts.len(),
        max_pain = pain,
        alerts = unusual_activity.len(),
        "options flow analyzed"
    );

    OptionsFlowReport {
        ticker: chain.ticker().to_string(),
        expiration: chain.expiration(),
        underlying_price: chain.underlying_price(),
        analysis: FlowAnalysis {
            call_volume: totals.call_volume,
            put_volume: totals.put_volume,
            total_volume: totals.total_volume(),
            call_put_ratio: ratio.rounded(2),
            call_open_interest: totals.call_open_interest,
            put_open_interest: totals.put_open_interest,
            total_open_interest: totals.total_open_interest(),
            avg_implied_volatility: round_to(avg_iv * 100.0, 2),
            max_pain: pain,
            sentiment,
            distance_to_max_pain: distance_to_max_pain(chain.underlying_price(), pain),
        },
        unusual_activity,
        largest_positions,
        available_expirations: chain.available_expirations().to_vec(),
    }
}

/// Builds the report, forwarding an ingestion error unchanged.
pub fn analyze_chain(
    chain: Result<OptionsChain, ChainError>,
    volume_threshold: f64,
) -> Result<OptionsFlowReport, ChainError> {
    let chain = chain?;
    Ok(build_report(&chain, volume_threshold))
}

/// Max pain of a fetched chain; `0.0` when ingestion failed.
pub fn max_pain_of(chain: Result<&OptionsChain, &ChainError>) -> f64 {
    match chain {
        Ok(c) => max_pain(c.calls(), c.puts()),
        Err(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markets::options::analytics::{
        SentimentBias, SentimentStrength, DEFAULT_VOLUME_THRESHOLD,
    };
    use crate::markets::options::contract::{OptionContract, OptionType};
    use serde_json::json;

    fn exp() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 19).unwrap()
    }

    fn leg(kind: OptionType, rows: &[(f64, u64, u64, f64)]) -> Vec<OptionContract> {
        rows.iter()
            .map(|(strike, vol, oi, iv)| {
                OptionContract::builder(format!("T{}{}", kind, strike), kind, *strike, exp())
                    .prices(1.0, 0.9, 1.1)
                    .activity(*vol, *oi)
                    .implied_volatility(*iv)
                    .build()
                    .unwrap()
            })
            .collect()
    }

    fn sample_chain(spot: Option<f64>) -> OptionsChain {
        let calls = leg(
            OptionType::Call,
            &[(100.0, 40, 50, 0.25), (110.0, 30, 30, 0.30), (120.0, 10, 10, 0.0)],
        );
        let puts = leg(
            OptionType::Put,
            &[(90.0, 20, 20, 0.35), (100.0, 20, 40, 0.40), (110.0, 10, 60, 0.0)],
        );
        let later = NaiveDate::from_ymd_opt(2024, 2, 16).unwrap();
        OptionsChain::new("TEST", exp(), spot, calls, puts, vec![exp(), later]).unwrap()
    }

    #[test]
    fn test_report_fields() {
        let report = build_report(&sample_chain(Some(105.0)), DEFAULT_VOLUME_THRESHOLD);
        let a = &report.analysis;
        assert_eq!(a.call_volume, 80);
        assert_eq!(a.put_volume, 50);
        assert_eq!(a.total_volume, 130);
        assert_eq!(a.call_put_ratio, FlowRatio::Value(1.6));
        assert_eq!(a.call_open_interest, 90);
        assert_eq!(a.put_open_interest, 120);
        assert_eq!(a.total_open_interest, 210);
        // (0.25 + 0.30 + 0.35 + 0.40) / 4
        assert_eq!(a.avg_implied_volatility, 32.5);
        assert_eq!(a.max_pain, 110.0);
        assert_eq!(a.distance_to_max_pain, Some(5.0));
        // 1.6 > 1.2 but OI ratio 0.75 is not > 1.2
        assert_eq!(a.sentiment.bias, SentimentBias::Bullish);
        assert_eq!(a.sentiment.strength, SentimentStrength::Moderate);
        assert_eq!(report.available_expirations.len(), 2);
        assert_eq!(report.largest_positions[0].open_interest, 60);
    }

    #[test]
    fn test_report_serialization_shape() {
        let report = build_report(&sample_chain(Some(105.0)), DEFAULT_VOLUME_THRESHOLD);
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["ticker"], "TEST");
        assert_eq!(v["expiration"], "2024-01-19");
        assert_eq!(v["underlying_price"], json!(105.0));
        assert_eq!(v["analysis"]["call_put_ratio"], json!(1.6));
        assert_eq!(v["analysis"]["sentiment"]["bias"], "BULLISH");
        assert_eq!(v["analysis"]["distance_to_max_pain"], json!(5.0));
        assert_eq!(v["available_expirations"][1], "2024-02-16");
        assert!(v["unusual_activity"].is_array());
        assert_eq!(v["largest_positions"][0]["type"], "PUT");
    }

    #[test]
    fn test_distance_to_max_pain() {
        assert_eq!(distance_to_max_pain(Some(105.0), 0.0), None);
        assert_eq!(distance_to_max_pain(None, 100.0), None);
        assert_eq!(distance_to_max_pain(Some(98.7), 100.0), Some(1.3));
        assert_eq!(distance_to_max_pain(Some(101.0), 100.0), Some(1.0));
    }

    #[test]
    fn test_empty_chain_degrades_gracefully() {
        let chain = OptionsChain::new("EMPTY", exp(), Some(50.0), vec![], vec![], vec![]).unwrap();
        let report = build_report(&chain, DEFAULT_VOLUME_THRESHOLD);
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(report.analysis.max_pain, 0.0);
        assert_eq!(report.analysis.call_put_ratio, FlowRatio::Value(0.0));
        assert_eq!(v["analysis"]["distance_to_max_pain"], serde_json::Value::Null);
        assert!(report.unusual_activity.is_empty());
        assert!(report.largest_positions.is_empty());
        assert_eq!(report.analysis.sentiment.bias, SentimentBias::Bearish);
    }

    #[test]
    fn test_unbounded_ratio_reports_infinity() {
        let calls = leg(OptionType::Call, &[(100.0, 40, 10, 0.2)]);
        let chain = OptionsChain::new("UP", exp(), None, calls, vec![], vec![]).unwrap();
        let report = build_report(&chain, DEFAULT_VOLUME_THRESHOLD);
        assert!(report.analysis.call_put_ratio.is_unbounded());
        assert_eq!(report.analysis.sentiment.strength, SentimentStrength::Strong);
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["analysis"]["call_put_ratio"], "Infinity");
    }

    #[test]
    fn test_analyze_chain_forwards_errors() {
        let err = ChainError::NoData { ticker: "ZZZZ".into() };
        assert_eq!(analyze_chain(Err(err.clone()), 1.5), Err(err.clone()));
        assert_eq!(max_pain_of(Err(&err)), 0.0);

        let chain = sample_chain(None);
        assert_eq!(max_pain_of(Ok(&chain)), 110.0);
        assert!(analyze_chain(Ok(chain), 1.5).is_ok());
    }

    #[test]
    fn test_call_put_summary() {
        let report = build_report(&sample_chain(Some(105.0)), DEFAULT_VOLUME_THRESHOLD);
        let summary = CallPutSummary::from_report(&report);
        assert_eq!(summary.call_put_volume_ratio, FlowRatio::Value(1.6));
        assert_eq!(summary.call_put_oi_ratio, Some(0.75));

        let calls = leg(OptionType::Call, &[(100.0, 40, 10, 0.2)]);
        let chain = OptionsChain::new("UP", exp(), None, calls, vec![], vec![]).unwrap();
        let summary = CallPutSummary::from_report(&build_report(&chain, 1.5));
        assert_eq!(summary.call_put_oi_ratio, None);
    }
}
