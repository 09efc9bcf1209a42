//! # Yahoo Finance Options Chains
//!
//! Fetches single-expiration chains from the `v7/finance/options` endpoint and
//! hands them to the analytics in [`crate::markets::options`].
//!
//! The flow is two requests: the first lists `expirationDates`, the second
//! fetches the chosen expiration with `date={epoch}`. Parsing is kept in free
//! functions so it can be tested against recorded payloads.

use super::apicallyahoo::ApiCallYahoo;
use crate::loggers::loggerlocal::LoggerLocal;
use crate::markets::options::analytics::{max_pain, UnusualActivity};
use crate::markets::options::contract::{
    ChainError, ContractError, OptionContract, OptionType, OptionsChain,
};
use crate::markets::options::flowreport::{analyze_chain, CallPutSummary, OptionsFlowReport};
use crate::security::errors::ApiError;
use crate::security::validation::sanitize_ticker;
use crate::utils::misc::utils::{date_to_epoch, epoch_to_date};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Threshold used by [`OptionsDataClient::get_unusual_options_activity`].
pub const UNUSUAL_ACTIVITY_THRESHOLD: f64 = 2.0;
/// Listed expirations carried in a chain.
pub const MAX_REPORTED_EXPIRATIONS: usize = 10;
/// Listed expirations quoted back in an invalid-expiration error.
pub const MAX_SUGGESTED_EXPIRATIONS: usize = 5;

/// One contract as Yahoo returns it. Every field is optional upstream.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContract {
    contract_symbol: Option<String>,
    strike: Option<f64>,
    expiration: Option<i64>,
    last_price: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
    volume: Option<f64>,
    open_interest: Option<f64>,
    implied_volatility: Option<f64>,
    delta: Option<f64>,
    gamma: Option<f64>,
    theta: Option<f64>,
    vega: Option<f64>,
}

fn count(symbol: &str, field: &'static str, value: Option<f64>) -> Result<u64, ContractError> {
    match value {
        None => Ok(0),
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v as u64),
        Some(v) => Err(ContractError::NegativeCount {
            symbol: symbol.to_string(),
            field,
            value: v,
        }),
    }
}

impl RawContract {
    fn into_contract(
        self,
        option_type: OptionType,
        chain_expiration: NaiveDate,
    ) -> Result<OptionContract, ContractError> {
        let symbol = self
            .contract_symbol
            .ok_or(ContractError::MissingField { symbol: String::new(), field: "contractSymbol" })?;
        let strike = match self.strike {
            Some(s) => s,
            None => return Err(ContractError::MissingField { symbol, field: "strike" }),
        };
        let expiration = self.expiration.and_then(epoch_to_date).unwrap_or(chain_expiration);
        let volume = count(&symbol, "volume", self.volume)?;
        let open_interest = count(&symbol, "openInterest", self.open_interest)?;

        OptionContract::builder(symbol, option_type, strike, expiration)
            .prices(
                self.last_price.unwrap_or_default(),
                self.bid.unwrap_or_default(),
                self.ask.unwrap_or_default(),
            )
            .activity(volume, open_interest)
            .implied_volatility(self.implied_volatility.unwrap_or_default())
            .greeks(self.delta, self.gamma, self.theta, self.vega)
            .build()
    }
}

fn first_result<'a>(payload: &'a Value, ticker: &str) -> Result<&'a Value, ChainError> {
    payload
        .get("optionChain")
        .and_then(|oc| oc.get("result"))
        .and_then(|r| r.get(0))
        .ok_or_else(|| ChainError::NoData { ticker: ticker.to_string() })
}

/// Listed expiration timestamps, in upstream (ascending) order.
pub fn parse_expirations(payload: &Value, ticker: &str) -> Result<Vec<i64>, ChainError> {
    let result = first_result(payload, ticker)?;
    let expirations: Vec<i64> = result
        .get("expirationDates")
        .and_then(Value::as_array)
        .map(|dates| dates.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();
    if expirations.is_empty() {
        return Err(ChainError::NoExpirations { ticker: ticker.to_string() });
    }
    Ok(expirations)
}

/// The requested expiration's timestamp, or the nearest one when `None`.
pub fn select_expiration(
    ticker: &str,
    requested: Option<NaiveDate>,
    expirations: &[i64],
) -> Result<i64, ChainError> {
    match requested {
        None => expirations
            .first()
            .copied()
            .ok_or_else(|| ChainError::NoExpirations { ticker: ticker.to_string() }),
        Some(date) => {
            let ts = date_to_epoch(date);
            if expirations.contains(&ts) {
                Ok(ts)
            } else {
                Err(ChainError::InvalidExpiration {
                    requested: date,
                    available: expirations
                        .iter()
                        .take(MAX_SUGGESTED_EXPIRATIONS)
                        .filter_map(|t| epoch_to_date(*t))
                        .collect(),
                })
            }
        }
    }
}

fn parse_leg(
    options: &Value,
    key: &str,
    option_type: OptionType,
    expiration: NaiveDate,
) -> Result<Vec<OptionContract>, ChainError> {
    let raw: Vec<RawContract> = match options.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|e| ChainError::Schema(format!("{}: {}", key, e)))?,
    };
    raw.into_iter()
        .map(|r| r.into_contract(option_type, expiration).map_err(ChainError::from))
        .collect()
}

/// Builds a chain from the payload of the `date={exp_ts}` request.
pub fn parse_chain(
    payload: &Value,
    ticker: &str,
    exp_ts: i64,
    expirations: &[i64],
) -> Result<OptionsChain, ChainError> {
    let result = first_result(payload, ticker)?;
    let expiration = epoch_to_date(exp_ts).ok_or_else(|| {
        ChainError::Schema(format!("expiration timestamp {} out of range", exp_ts))
    })?;

    let empty = Value::Null;
    let options = result.get("options").and_then(|o| o.get(0)).unwrap_or(&empty);
    let calls = parse_leg(options, "calls", OptionType::Call, expiration)?;
    let puts = parse_leg(options, "puts", OptionType::Put, expiration)?;

    let underlying_price = result
        .get("quote")
        .and_then(|q| q.get("regularMarketPrice"))
        .and_then(Value::as_f64);

    let available = expirations
        .iter()
        .take(MAX_REPORTED_EXPIRATIONS)
        .filter_map(|t| epoch_to_date(*t))
        .collect();

    OptionsChain::new(ticker, expiration, underlying_price, calls, puts, available)
}

/// Options-chain client.
pub struct OptionsDataClient {
    api: ApiCallYahoo,
    logger: Arc<LoggerLocal>,
}

impl OptionsDataClient {
    /// Builds the client on a shared logger.
    pub fn new(logger: Arc<LoggerLocal>, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            api: ApiCallYahoo::new(Arc::clone(&logger), timeout)?,
            logger,
        })
    }

    /// Fetches the chain for `expiration`, or for the nearest listed expiration.
    pub async fn get_options_chain(
        &self,
        ticker: &str,
        expiration: Option<NaiveDate>,
    ) -> Result<OptionsChain, ChainError> {
        let ticker =
            sanitize_ticker(ticker).ok_or_else(|| ChainError::InvalidTicker(ticker.to_string()))?;
        let path = format!("v7/finance/options/{}", ticker);

        let listing = self
            .api
            .fetch_yahoo(&path, &[])
            .await
            .map_err(|e| ChainError::Fetch(e.to_string()))?;
        let expirations = parse_expirations(&listing, &ticker)?;
        let exp_ts = select_expiration(&ticker, expiration, &expirations)?;

        let payload = self
            .api
            .fetch_yahoo(&path, &[("date", exp_ts.to_string())])
            .await
            .map_err(|e| ChainError::Fetch(e.to_string()))?;

        let chain = parse_chain(&payload, &ticker, exp_ts, &expirations);
        match &chain {
            Ok(c) => {
                self.logger
                    .debug(
                        &format!("Options chain loaded for {}", ticker),
                        Some(serde_json::json!({
                            "expiration": c.expiration().to_string(),
                            "calls": c.calls().len(),
                            "puts": c.puts().len(),
                        })),
                    )
                    .await
            }
            Err(e) => {
                self.logger
                    .error(&format!("Options chain rejected for {}: {}", ticker, e), None)
                    .await
            }
        }
        chain
    }

    /// Full options-flow report.
    pub async fn analyze_options_flow(
        &self,
        ticker: &str,
        expiration: Option<NaiveDate>,
        volume_threshold: f64,
    ) -> Result<OptionsFlowReport, ChainError> {
        analyze_chain(self.get_options_chain(ticker, expiration).await, volume_threshold)
    }

    /// Max pain strike of the chain.
    pub async fn get_max_pain(
        &self,
        ticker: &str,
        expiration: Option<NaiveDate>,
    ) -> Result<f64, ChainError> {
        let chain = self.get_options_chain(ticker, expiration).await?;
        Ok(max_pain(chain.calls(), chain.puts()))
    }

    /// Unusual-volume alerts of the nearest expiration, at `threshold`
    /// (default [`UNUSUAL_ACTIVITY_THRESHOLD`]).
    pub async fn get_unusual_options_activity(
        &self,
        ticker: &str,
        threshold: Option<f64>,
    ) -> Result<Vec<UnusualActivity>, ChainError> {
        let report = self
            .analyze_options_flow(ticker, None, threshold.unwrap_or(UNUSUAL_ACTIVITY_THRESHOLD))
            .await?;
        Ok(report.unusual_activity)
    }

    /// Volume and open-interest ratios with the sentiment reading.
    pub async fn get_call_put_ratio(
        &self,
        ticker: &str,
        expiration: Option<NaiveDate>,
    ) -> Result<CallPutSummary, ChainError> {
        let report = self
            .analyze_options_flow(
                ticker,
                expiration,
                crate::markets::options::DEFAULT_VOLUME_THRESHOLD,
            )
            .await?;
        Ok(CallPutSummary::from_report(&report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // 2024-01-19 and 2024-01-26, 00:00 UTC.
    const JAN19: i64 = 1_705_622_400;
    const JAN26: i64 = 1_706_227_200;

    fn jan19() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 19).unwrap()
    }

    fn payload() -> Value {
        json!({
            "optionChain": {
                "result": [{
                    "underlyingSymbol": "AAPL",
                    "expirationDates": [JAN19, JAN26],
                    "quote": {"regularMarketPrice": 191.56},
                    "options": [{
                        "expirationDate": JAN19,
                        "calls": [
                            {"contractSymbol": "AAPL240119C00190000", "strike": 190.0,
                             "expiration": JAN19, "lastPrice": 3.1, "bid": 3.0, "ask": 3.2,
                             "volume": 1200, "openInterest": 5400, "impliedVolatility": 0.2412},
                            {"contractSymbol": "AAPL240119C00200000", "strike": 200.0,
                             "expiration": JAN19,
                             "lastPrice": 0.4, "bid": 0.39, "ask": 0.41, "openInterest": 8000,
                             "impliedVolatility": 0.22}
                        ],
                        "puts": [
                            {"contractSymbol": "AAPL240119P00185000", "strike": 185.0,
                             "expiration": JAN19, "lastPrice": 0.9, "bid": 0.88, "ask": 0.92,
                             "volume": 700, "openInterest": 3000, "impliedVolatility": 0.25,
                             "delta": -0.21}
                        ]
                    }]
                }],
                "error": null
            }
        })
    }

    #[test]
    fn test_parse_expirations() {
        assert_eq!(parse_expirations(&payload(), "AAPL").unwrap(), vec![JAN19, JAN26]);

        let empty = json!({"optionChain": {"result": [], "error": null}});
        assert_eq!(
            parse_expirations(&empty, "ZZZZ"),
            Err(ChainError::NoData { ticker: "ZZZZ".into() })
        );

        let no_dates = json!({"optionChain": {"result": [{"expirationDates": []}]}});
        assert_eq!(
            parse_expirations(&no_dates, "ZZZZ"),
            Err(ChainError::NoExpirations { ticker: "ZZZZ".into() })
        );

        assert!(matches!(parse_expirations(&json!({}), "X"), Err(ChainError::NoData { .. })));
    }

    #[test]
    fn test_select_expiration() {
        let listed = [JAN19, JAN26];
        assert_eq!(select_expiration("AAPL", None, &listed), Ok(JAN19));
        assert_eq!(
            select_expiration("AAPL", NaiveDate::from_ymd_opt(2024, 1, 26), &listed),
            Ok(JAN26)
        );

        let err = select_expiration("AAPL", NaiveDate::from_ymd_opt(2024, 3, 15), &listed)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid expiration 2024-03-15. Available: 2024-01-19, 2024-01-26"
        );
    }

    #[test]
    fn test_invalid_expiration_lists_at_most_five() {
        let listed: Vec<i64> = (0..8).map(|w| JAN19 + w * 7 * 86_400).collect();
        match select_expiration("AAPL", NaiveDate::from_ymd_opt(2030, 1, 1), &listed) {
            Err(ChainError::InvalidExpiration { available, .. }) => assert_eq!(available.len(), 5),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_chain() {
        let chain = parse_chain(&payload(), "AAPL", JAN19, &[JAN19, JAN26]).unwrap();
        assert_eq!(chain.ticker(), "AAPL");
        assert_eq!(chain.expiration(), jan19());
        assert_eq!(chain.underlying_price(), Some(191.56));
        assert_eq!(chain.calls().len(), 2);
        assert_eq!(chain.puts().len(), 1);
        assert_eq!(chain.available_expirations().len(), 2);

        let missing_volume = &chain.calls()[1];
        assert_eq!(missing_volume.volume(), 0);
        assert_eq!(missing_volume.open_interest(), 8000);

        let put = &chain.puts()[0];
        assert_eq!(put.option_type(), OptionType::Put);
        assert_eq!(put.delta(), Some(-0.21));
        assert_eq!(put.gamma(), None);
    }

    #[test]
    fn test_parse_chain_rejects_bad_records() {
        let mut bad_strike = payload();
        bad_strike["optionChain"]["result"][0]["options"][0]["calls"][0]["strike"] = json!(0.0);
        assert!(matches!(
            parse_chain(&bad_strike, "AAPL", JAN19, &[JAN19]),
            Err(ChainError::Contract(ContractError::NonPositiveStrike { .. }))
        ));

        let mut no_symbol = payload();
        no_symbol["optionChain"]["result"][0]["options"][0]["puts"][0]
            .as_object_mut()
            .unwrap()
            .remove("contractSymbol");
        assert!(matches!(
            parse_chain(&no_symbol, "AAPL", JAN19, &[JAN19]),
            Err(ChainError::Contract(ContractError::MissingField { field: "contractSymbol", .. }))
        ));

        let mut negative = payload();
        negative["optionChain"]["result"][0]["options"][0]["puts"][0]["volume"] = json!(-3);
        assert!(matches!(
            parse_chain(&negative, "AAPL", JAN19, &[JAN19]),
            Err(ChainError::Contract(ContractError::NegativeCount { field: "volume", .. }))
        ));

        let mut mixed = payload();
        mixed["optionChain"]["result"][0]["options"][0]["calls"][0]["expiration"] = json!(JAN26);
        assert!(matches!(
            parse_chain(&mixed, "AAPL", JAN19, &[JAN19, JAN26]),
            Err(ChainError::MixedExpiration { .. })
        ));

        let mut wrong_shape = payload();
        wrong_shape["optionChain"]["result"][0]["options"][0]["calls"] = json!("oops");
        assert!(matches!(
            parse_chain(&wrong_shape, "AAPL", JAN19, &[JAN19]),
            Err(ChainError::Schema(_))
        ));
    }

    #[test]
    fn test_parse_chain_without_quote_or_options() {
        let bare = json!({"optionChain": {"result": [{"expirationDates": [JAN19]}]}});
        let chain = parse_chain(&bare, "AAPL", JAN19, &[JAN19]).unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.underlying_price(), None);
    }

    #[test]
    fn test_parsed_chain_feeds_the_report() {
        let chain = parse_chain(&payload(), "AAPL", JAN19, &[JAN19, JAN26]);
        let report = analyze_chain(chain, 1.5).unwrap();
        assert_eq!(report.analysis.call_volume, 1200);
        assert_eq!(report.analysis.put_volume, 700);
        assert_eq!(report.largest_positions[0].strike, 200.0);
    }
}
