//! # Yahoo Finance Price History and Quotes
//!
//! OHLCV history and the latest quote for any Yahoo symbol, through the
//! `v8/finance/chart` endpoint, plus company metadata from `quoteSummary`.
//! Works for US listings as well as suffixed foreign listings, indices and
//! futures (see [`super::symbols`]).

use super::apicallyahoo::{quote_summary_path, quote_summary_result, raw_number, ApiCallYahoo};
use super::symbols::{commodity_etf_symbol, future_symbol, index_symbol, market_symbol, Market};
use crate::loggers::loggerlocal::LoggerLocal;
use crate::security::errors::{ApiError, ValidationError};
use crate::security::validation::sanitize_ticker;
use crate::utils::misc::utils::epoch_to_date;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Lookback window of a history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    const ALL: [Period; 10] = [
        Period::OneDay,
        Period::FiveDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
        Period::YearToDate,
        Period::Max,
    ];

    /// Yahoo spelling, e.g. `"1mo"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }

    /// First instant of the window ending at `now`. Months count as 30 days
    /// and `max` as twenty 365-day years.
    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let days = match self {
            Period::OneDay => 1,
            Period::FiveDays => 5,
            Period::OneMonth => 30,
            Period::ThreeMonths => 90,
            Period::SixMonths => 180,
            Period::OneYear => 365,
            Period::TwoYears => 730,
            Period::FiveYears => 1825,
            Period::Max => 365 * 20,
            Period::YearToDate => {
                return Utc
                    .with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
                    .single()
                    .unwrap_or(now);
            }
        };
        now - ChronoDuration::days(days)
    }
}

impl FromStr for Period {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ValidationError::Unsupported { name: "period", value: s.to_string() })
    }
}

/// Bar size of a history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "2m")]
    TwoMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "60m")]
    SixtyMinutes,
    #[serde(rename = "90m")]
    NinetyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
}

impl Interval {
    const ALL: [Interval; 13] = [
        Interval::OneMinute,
        Interval::TwoMinutes,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::ThirtyMinutes,
        Interval::SixtyMinutes,
        Interval::NinetyMinutes,
        Interval::OneHour,
        Interval::OneDay,
        Interval::FiveDays,
        Interval::OneWeek,
        Interval::OneMonth,
        Interval::ThreeMonths,
    ];

    /// Yahoo spelling, e.g. `"1wk"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::TwoMinutes => "2m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::SixtyMinutes => "60m",
            Interval::NinetyMinutes => "90m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::FiveDays => "5d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
            Interval::ThreeMonths => "3mo",
        }
    }
}

impl FromStr for Interval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| ValidationError::Unsupported { name: "interval", value: s.to_string() })
    }
}

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockPrice {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adjusted_close: f64,
}

/// Latest quote from the chart metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Option<f64>,
    pub previous_close: Option<f64>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub market_state: Option<String>,
}

/// Company metadata from the `assetProfile`, `summaryDetail` and `price`
/// quoteSummary modules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockInfo {
    pub symbol: String,
    pub name: String,
    pub currency: String,
    pub market: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    #[serde(rename = "52_week_high")]
    pub fifty_two_week_high: Option<f64>,
    #[serde(rename = "52_week_low")]
    pub fifty_two_week_low: Option<f64>,
}

/// Modules requested by [`YahooFinanceClient::get_stock_info`].
pub const STOCK_INFO_MODULES: &str = "assetProfile,summaryDetail,price";

fn chart_result(payload: &Value) -> Option<&Value> {
    payload.get("chart")?.get("result")?.get(0)
}

fn series<'a>(block: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    block.get(key).and_then(Value::as_array)
}

/// Builds the bars of a chart payload.
///
/// A missing result is an empty history. Null points become `0`; rows whose
/// series are shorter than the timestamp list are skipped.
pub fn parse_price_history(payload: &Value) -> Vec<StockPrice> {
    let Some(result) = chart_result(payload) else {
        return Vec::new();
    };
    let Some(timestamps) = series(result, "timestamp") else {
        return Vec::new();
    };

    let null = Value::Null;
    let indicators = result.get("indicators").unwrap_or(&null);
    let quote = indicators.get("quote").and_then(|q| q.get(0)).unwrap_or(&null);
    let adjclose = indicators
        .get("adjclose")
        .and_then(|a| a.get(0))
        .and_then(|a| series(a, "adjclose"));

    let point = |key: &str, i: usize| -> Option<f64> {
        series(quote, key).and_then(|s| s.get(i)).map(|v| v.as_f64().unwrap_or(0.0))
    };

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let date = ts.as_i64().and_then(epoch_to_date)?;
            let close = point("close", i)?;
            let adjusted_close = adjclose
                .and_then(|a| a.get(i))
                .and_then(Value::as_f64)
                .unwrap_or(close);
            Some(StockPrice {
                date,
                open: point("open", i)?,
                high: point("high", i)?,
                low: point("low", i)?,
                close,
                volume: point("volume", i)?.max(0.0) as u64,
                adjusted_close,
            })
        })
        .collect()
}

/// Reads the quote from the chart metadata; `None` without a chart result.
pub fn parse_quote(symbol: &str, payload: &Value) -> Option<Quote> {
    let meta = chart_result(payload)?.get("meta")?;
    let text = |key: &str| meta.get(key).and_then(Value::as_str).map(str::to_string);
    Some(Quote {
        symbol: symbol.to_string(),
        price: meta.get("regularMarketPrice").and_then(Value::as_f64),
        previous_close: meta
            .get("previousClose")
            .or_else(|| meta.get("chartPreviousClose"))
            .and_then(Value::as_f64),
        currency: text("currency"),
        exchange: text("exchangeName"),
        market_state: text("marketState"),
    })
}

/// Reads [`StockInfo`] from a quoteSummary payload; `None` without a result.
///
/// The name falls back from `longName` to `shortName` to the symbol.
pub fn parse_stock_info(symbol: &str, payload: &Value) -> Option<StockInfo> {
    let result = quote_summary_result(payload)?;
    let null = Value::Null;
    let profile = result.get("assetProfile").unwrap_or(&null);
    let summary = result.get("summaryDetail").unwrap_or(&null);
    let price = result.get("price").unwrap_or(&null);
    let text = |block: &Value, key: &str| {
        block.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
    };

    Some(StockInfo {
        symbol: symbol.to_string(),
        name: text(price, "longName")
            .or_else(|| text(price, "shortName"))
            .unwrap_or_else(|| symbol.to_string()),
        currency: text(price, "currency").unwrap_or_else(|| "USD".to_string()),
        market: text(price, "exchangeName").unwrap_or_else(|| "Unknown".to_string()),
        sector: text(profile, "sector"),
        industry: text(profile, "industry"),
        market_cap: raw_number(summary.get("marketCap")),
        pe_ratio: raw_number(summary.get("trailingPE")),
        dividend_yield: raw_number(summary.get("dividendYield")),
        fifty_two_week_high: raw_number(summary.get("fiftyTwoWeekHigh")),
        fifty_two_week_low: raw_number(summary.get("fiftyTwoWeekLow")),
    })
}

/// Global price client.
pub struct YahooFinanceClient {
    api: ApiCallYahoo,
    logger: Arc<LoggerLocal>,
}

impl YahooFinanceClient {
    /// Builds the client on a shared logger.
    pub fn new(logger: Arc<LoggerLocal>, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            api: ApiCallYahoo::new(Arc::clone(&logger), timeout)?,
            logger,
        })
    }

    fn checked(symbol: &str) -> Result<String, ApiError> {
        sanitize_ticker(symbol)
            .ok_or_else(|| ValidationError::InvalidTicker(symbol.to_string()).into())
    }

    /// Daily (or finer) bars for `symbol` over `period`.
    pub async fn get_price_history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<StockPrice>, ApiError> {
        let symbol = Self::checked(symbol)?;
        let now = Utc::now();
        let query = [
            ("period1", period.start(now).timestamp().to_string()),
            ("period2", now.timestamp().to_string()),
            ("interval", interval.as_str().to_string()),
            ("events", "history".to_string()),
            ("includeAdjustedClose", "true".to_string()),
        ];

        let payload = self.api.fetch_yahoo(&format!("v8/finance/chart/{}", symbol), &query).await?;
        let prices = parse_price_history(&payload);
        if prices.is_empty() {
            self.logger.warn(&format!("No data found for {}", symbol), None).await;
        }
        Ok(prices)
    }

    /// Latest quote for `symbol`.
    pub async fn get_current_price(&self, symbol: &str) -> Result<Option<Quote>, ApiError> {
        let symbol = Self::checked(symbol)?;
        let query = [("interval", "1d".to_string()), ("range", "1d".to_string())];
        let payload = self.api.fetch_yahoo(&format!("v8/finance/chart/{}", symbol), &query).await?;
        Ok(parse_quote(&symbol, &payload))
    }

    /// Company name, sector and valuation figures for `symbol`.
    pub async fn get_stock_info(&self, symbol: &str) -> Result<Option<StockInfo>, ApiError> {
        let symbol = Self::checked(symbol)?;
        let query = [("modules", STOCK_INFO_MODULES.to_string())];
        let payload = self.api.fetch_yahoo(&quote_summary_path(&symbol), &query).await?;
        let info = parse_stock_info(&symbol, &payload);
        if info.is_none() {
            self.logger.warn(&format!("No quoteSummary result for {}", symbol), None).await;
        }
        Ok(info)
    }

    /// History of a local code on a foreign exchange.
    pub async fn get_market_history(
        &self,
        market: Market,
        code: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<StockPrice>, ApiError> {
        self.get_price_history(&market_symbol(market, code), period, interval).await
    }

    /// History of a major index alias such as `"sp500"`.
    pub async fn get_index(
        &self,
        key: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<StockPrice>, ApiError> {
        self.get_price_history(index_symbol(key)?, period, interval).await
    }

    /// History of a futures alias such as `"crude_oil"`.
    pub async fn get_future(
        &self,
        key: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<StockPrice>, ApiError> {
        self.get_price_history(future_symbol(key)?, period, interval).await
    }

    /// History of a commodity ETF alias such as `"gold_spot"`.
    pub async fn get_commodity_etf(
        &self,
        key: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<StockPrice>, ApiError> {
        self.get_price_history(commodity_etf_symbol(key)?, period, interval).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_period_and_interval_parsing() {
        assert_eq!("1mo".parse::<Period>(), Ok(Period::OneMonth));
        assert_eq!("max".parse::<Period>(), Ok(Period::Max));
        assert_eq!("1wk".parse::<Interval>(), Ok(Interval::OneWeek));
        assert_eq!(
            "7y".parse::<Period>(),
            Err(ValidationError::Unsupported { name: "period", value: "7y".into() })
        );
        assert!("2h".parse::<Interval>().is_err());
        for p in Period::ALL {
            assert_eq!(p.as_str().parse::<Period>(), Ok(p));
        }
    }

    #[test]
    fn test_period_start() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        assert_eq!(
            Period::OneMonth.start(now),
            Utc.with_ymd_and_hms(2024, 5, 16, 12, 0, 0).unwrap()
        );
        assert_eq!(
            Period::YearToDate.start(now),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!((now - Period::Max.start(now)).num_days(), 7300);
    }

    #[test]
    fn test_parse_price_history() {
        let payload = json!({
            "chart": {
                "result": [{
                    "meta": {"symbol": "0700.HK"},
                    "timestamp": [1_705_622_400, 1_705_881_600, 1_705_968_000],
                    "indicators": {
                        "quote": [{
                            "open": [300.0, null, 302.0],
                            "high": [305.0, 306.0, 307.0],
                            "low": [299.0, 298.0, 301.0],
                            "close": [304.0, 303.0],
                            "volume": [1000, null, 1200]
                        }],
                        "adjclose": [{"adjclose": [303.5]}]
                    }
                }],
                "error": null
            }
        });
        let prices = parse_price_history(&payload);
        // Third row has no close and is skipped.
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].date, NaiveDate::from_ymd_opt(2024, 1, 19).unwrap());
        assert_eq!(prices[0].adjusted_close, 303.5);
        assert_eq!(prices[1].open, 0.0);
        assert_eq!(prices[1].volume, 0);
        assert_eq!(prices[1].adjusted_close, 303.0);
    }

    #[test]
    fn test_parse_price_history_without_result() {
        let missing = json!({"chart": {"result": null, "error": {"code": "Not Found"}}});
        assert!(parse_price_history(&missing).is_empty());
        assert!(parse_price_history(&json!({})).is_empty());
    }

    #[test]
    fn test_parse_quote() {
        let payload = json!({
            "chart": {"result": [{"meta": {
                "regularMarketPrice": 191.56,
                "chartPreviousClose": 188.63,
                "currency": "USD",
                "exchangeName": "NMS",
                "marketState": "REGULAR"
            }}]}
        });
        let quote = parse_quote("AAPL", &payload).unwrap();
        assert_eq!(quote.price, Some(191.56));
        assert_eq!(quote.previous_close, Some(188.63));
        assert_eq!(quote.exchange.as_deref(), Some("NMS"));
        assert!(parse_quote("AAPL", &json!({"chart": {"result": []}})).is_none());
    }

    #[test]
    fn test_parse_stock_info() {
        let payload = json!({"quoteSummary": {"result": [{
            "assetProfile": {"sector": "Technology", "industry": "Consumer Electronics"},
            "summaryDetail": {
                "marketCap": {"raw": 2_950_000_000_000_u64, "fmt": "2.95T"},
                "trailingPE": {"raw": 29.7, "fmt": "29.70"},
                "dividendYield": {},
                "fiftyTwoWeekHigh": 199.62,
                "fiftyTwoWeekLow": {"raw": 143.9}
            },
            "price": {"shortName": "Apple Inc.", "currency": "USD", "exchangeName": "NasdaqGS"}
        }], "error": null}});
        let info = parse_stock_info("AAPL", &payload).unwrap();
        assert_eq!(info.name, "Apple Inc.");
        assert_eq!(info.market, "NasdaqGS");
        assert_eq!(info.market_cap, Some(2.95e12));
        assert_eq!(info.dividend_yield, None);
        assert_eq!(info.fifty_two_week_high, Some(199.62));

        let v = serde_json::to_value(&info).unwrap();
        assert_eq!(v["52_week_low"], json!(143.9));
        assert_eq!(v["sector"], "Technology");
    }

    #[test]
    fn test_parse_stock_info_defaults() {
        let bare = json!({"quoteSummary": {"result": [{}]}});
        let info = parse_stock_info("0700.HK", &bare).unwrap();
        assert_eq!(info.name, "0700.HK");
        assert_eq!(info.currency, "USD");
        assert_eq!(info.market, "Unknown");
        assert!(parse_stock_info("AAPL", &json!({"quoteSummary": {"result": []}})).is_none());
    }
}
