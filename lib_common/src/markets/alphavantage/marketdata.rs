use crate::loggers::loggerlocal::LoggerLocal;
use crate::retrieve::ky_http::ApiClient;
use crate::security::errors::{ApiError, ValidationError};
use crate::security::rate_limiter::{RateLimiter, ALPHA_VANTAGE_LIMITER};
use crate::security::validation::{ensure_range, sanitize_ticker};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Alpha Vantage root; every function goes through `query`.
pub const ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co/";
/// Environment variable holding the key.
pub const ALPHA_VANTAGE_KEY_VAR: &str = "ALPHA_VANTAGE_API_KEY";
/// Longest history accepted by [`AlphaVantageClient::get_price_history`].
pub const MAX_HISTORY_DAYS: u32 = 5000;
/// `compact` output holds the latest 100 points.
const COMPACT_POINTS: u32 = 100;

/// Bar size of a price history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvInterval {
    /// Hourly bars.
    Intraday,
    Daily,
    Weekly,
    Monthly,
}

impl AvInterval {
    /// `function` parameter of the time series.
    pub fn function(self) -> &'static str {
        match self {
            AvInterval::Intraday => "TIME_SERIES_INTRADAY",
            AvInterval::Daily => "TIME_SERIES_DAILY",
            AvInterval::Weekly => "TIME_SERIES_WEEKLY",
            AvInterval::Monthly => "TIME_SERIES_MONTHLY",
        }
    }

    /// Lower-case name, e.g. `"weekly"`.
    pub fn as_str(self) -> &'static str {
        match self {
            AvInterval::Intraday => "intraday",
            AvInterval::Daily => "daily",
            AvInterval::Weekly => "weekly",
            AvInterval::Monthly => "monthly",
        }
    }
}

impl FromStr for AvInterval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [AvInterval::Intraday, AvInterval::Daily, AvInterval::Weekly, AvInterval::Monthly]
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| ValidationError::Unsupported { name: "interval", value: s.to_string() })
    }
}

/// Look-ahead window of the earnings calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "3month")]
    ThreeMonths,
    #[serde(rename = "6month")]
    SixMonths,
    #[serde(rename = "12month")]
    TwelveMonths,
}

impl Horizon {
    /// Alpha Vantage spelling, e.g. `"3month"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Horizon::ThreeMonths => "3month",
            Horizon::SixMonths => "6month",
            Horizon::TwelveMonths => "12month",
        }
    }

    /// Smallest horizon covering `days` days.
    pub fn covering(days: u32) -> Self {
        match days {
            0..=90 => Horizon::ThreeMonths,
            91..=180 => Horizon::SixMonths,
            _ => Horizon::TwelveMonths,
        }
    }
}

impl FromStr for Horizon {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Horizon::ThreeMonths, Horizon::SixMonths, Horizon::TwelveMonths]
            .into_iter()
            .find(|h| h.as_str() == s)
            .ok_or_else(|| ValidationError::Unsupported { name: "horizon", value: s.to_string() })
    }
}

/// One OHLCV bar. `date` keeps the provider's key, which carries a time for
/// intraday bars.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// `GLOBAL_QUOTE` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvQuote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    /// As reported, e.g. `"1.2345%"`.
    pub change_percent: String,
    pub volume: u64,
    pub latest_trading_day: Option<String>,
}

/// `OVERVIEW` fundamentals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyOverview {
    pub symbol: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    #[serde(rename = "52_week_high")]
    pub week_52_high: Option<f64>,
    #[serde(rename = "52_week_low")]
    pub week_52_low: Option<f64>,
    pub analyst_target_price: Option<f64>,
}

/// One scheduled report of the earnings calendar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarningsCalendarEntry {
    pub symbol: String,
    pub name: String,
    pub report_date: NaiveDate,
    pub fiscal_date_ending: Option<NaiveDate>,
    pub eps_estimate: Option<f64>,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCalendarRow {
    symbol: String,
    #[serde(default)]
    name: String,
    report_date: String,
    #[serde(default)]
    fiscal_date_ending: String,
    #[serde(default)]
    estimate: String,
    #[serde(default)]
    currency: String,
}

/// Numeric field that Alpha Vantage sends as a string. `"None"`, `"-"` and
/// empty strings are missing values.
pub fn av_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn av_text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "None" && *s != "-")
        .map(str::to_string)
}

/// Alpha Vantage answers errors and quota notices with HTTP 200 and a
/// one-field body.
pub fn check_payload(payload: &Value) -> Result<(), ApiError> {
    for key in ["Error Message", "Note", "Information"] {
        if let Some(message) = payload.get(key).and_then(Value::as_str) {
            return Err(ApiError::Upstream(format!("Alpha Vantage: {}", message)));
        }
    }
    Ok(())
}

/// The newest `days` bars of a `TIME_SERIES_*` payload, oldest first.
///
/// Fields that are absent count as `0`; rows with unparsable numbers are
/// skipped.
pub fn parse_time_series(payload: &Value, days: usize) -> Vec<PricePoint> {
    let Some(series) = payload
        .as_object()
        .and_then(|o| o.iter().find(|(k, _)| k.contains("Time Series")))
        .and_then(|(_, v)| v.as_object())
    else {
        return Vec::new();
    };

    let field = |row: &Value, key: &str| -> Option<f64> {
        match row.get(key) {
            None => Some(0.0),
            Some(v) => av_number(Some(v)),
        }
    };

    let mut dates: Vec<&String> = series.keys().collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    let mut prices: Vec<PricePoint> = dates
        .into_iter()
        .take(days)
        .filter_map(|date| {
            let row = series.get(date)?;
            Some(PricePoint {
                date: date.clone(),
                open: field(row, "1. open")?,
                high: field(row, "2. high")?,
                low: field(row, "3. low")?,
                close: field(row, "4. close")?,
                volume: field(row, "5. volume")?.max(0.0) as u64,
            })
        })
        .collect();
    prices.reverse();
    prices
}

/// `GLOBAL_QUOTE` block; `None` when it is empty.
pub fn parse_global_quote(payload: &Value) -> Option<AvQuote> {
    let quote = payload.get("Global Quote")?.as_object()?;
    if quote.is_empty() {
        return None;
    }
    let number = |key: &str| av_number(quote.get(key)).unwrap_or(0.0);
    Some(AvQuote {
        symbol: av_text(quote.get("01. symbol")).unwrap_or_default(),
        price: number("05. price"),
        change: number("09. change"),
        change_percent: av_text(quote.get("10. change percent")).unwrap_or_default(),
        volume: number("06. volume").max(0.0) as u64,
        latest_trading_day: av_text(quote.get("07. latest trading day")),
    })
}

/// `OVERVIEW` payload; `None` for an unknown symbol (empty object).
pub fn parse_company_overview(payload: &Value) -> Option<CompanyOverview> {
    let symbol = av_text(payload.get("Symbol"))?;
    let text = |key: &str| av_text(payload.get(key));
    let number = |key: &str| av_number(payload.get(key));
    Some(CompanyOverview {
        symbol,
        name: text("Name"),
        description: text("Description"),
        sector: text("Sector"),
        industry: text("Industry"),
        market_cap: number("MarketCapitalization"),
        pe_ratio: number("PERatio"),
        dividend_yield: number("DividendYield"),
        week_52_high: number("52WeekHigh"),
        week_52_low: number("52WeekLow"),
        analyst_target_price: number("AnalystTargetPrice"),
    })
}

/// The CSV export of `EARNINGS_CALENDAR`. Rows without a valid report date
/// are dropped. A JSON body is an error notice.
pub fn parse_earnings_calendar(body: &str) -> Result<Vec<EarningsCalendarEntry>, ApiError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('{') {
        let notice: Value =
            serde_json::from_str(trimmed).map_err(|e| ApiError::Decode(e.to_string()))?;
        check_payload(&notice)?;
        return Ok(Vec::new());
    }

    let date = |s: &str| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok();
    let mut reader = csv::Reader::from_reader(trimmed.as_bytes());
    let mut entries = Vec::new();
    for row in reader.deserialize::<RawCalendarRow>() {
        let row = row.map_err(|e| ApiError::Decode(e.to_string()))?;
        let Some(report_date) = date(&row.report_date) else {
            continue;
        };
        entries.push(EarningsCalendarEntry {
            symbol: row.symbol,
            name: row.name,
            report_date,
            fiscal_date_ending: date(&row.fiscal_date_ending),
            eps_estimate: row.estimate.trim().parse().ok(),
            currency: Some(row.currency).filter(|c| !c.is_empty()),
        });
    }
    Ok(entries)
}

/// Entries reported between `today` and `today + days_ahead`, inclusive,
/// soonest first.
pub fn upcoming_within(
    mut entries: Vec<EarningsCalendarEntry>,
    today: NaiveDate,
    days_ahead: u32,
) -> Vec<EarningsCalendarEntry> {
    let last = today + ChronoDuration::days(i64::from(days_ahead));
    entries.retain(|e| e.report_date >= today && e.report_date <= last);
    entries.sort_by(|a, b| a.report_date.cmp(&b.report_date).then_with(|| a.symbol.cmp(&b.symbol)));
    entries
}

/// Alpha Vantage client.
pub struct AlphaVantageClient {
    client: ApiClient,
    api_key: Option<String>,
    limiter: &'static RateLimiter,
    logger: Arc<LoggerLocal>,
}

impl AlphaVantageClient {
    /// Builds the client. Without a key every call fails with
    /// [`ApiError::MissingApiKey`]; Yahoo Finance covers prices without one.
    pub fn new(
        api_key: Option<String>,
        logger: Arc<LoggerLocal>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: ApiClient::with_timeout(ALPHA_VANTAGE_BASE_URL, None, timeout)?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            limiter: &ALPHA_VANTAGE_LIMITER,
            logger,
        })
    }

    /// `true` when a key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn require_key(&self) -> Result<&str, ApiError> {
        match self.api_key.as_deref() {
            Some(key) => Ok(key),
            None => {
                self.logger
                    .warn(
                        "Alpha Vantage API key required. Use the Yahoo Finance client for free \
                         price data or get a key at https://www.alphavantage.co/support/#api-key",
                        None,
                    )
                    .await;
                Err(ApiError::MissingApiKey(ALPHA_VANTAGE_KEY_VAR))
            }
        }
    }

    fn checked(ticker: &str) -> Result<String, ApiError> {
        sanitize_ticker(ticker)
            .ok_or_else(|| ValidationError::InvalidTicker(ticker.to_string()).into())
    }

    fn upstream_error(status: u16, body: Option<&str>) -> ApiError {
        let detail = body.map(str::trim).filter(|b| !b.is_empty()).unwrap_or("no body");
        ApiError::Upstream(format!("Alpha Vantage HTTP {}: {}", status, detail))
    }

    async fn query_json(&self, params: &[(&str, String)]) -> Result<Value, ApiError> {
        let response = self
            .limiter
            .guard(self.client.request::<Value, ()>(Method::GET, "query", Some(params), None, None))
            .await??;
        if !response.success {
            let err = Self::upstream_error(response.status, response.error_body.as_deref());
            self.logger.error(&err.to_string(), None).await;
            return Err(err);
        }
        let payload = response.data.unwrap_or(Value::Null);
        check_payload(&payload)?;
        Ok(payload)
    }

    /// The newest `days` bars of `ticker`, oldest first.
    pub async fn get_price_history(
        &self,
        ticker: &str,
        days: u32,
        interval: AvInterval,
    ) -> Result<Vec<PricePoint>, ApiError> {
        let api_key = self.require_key().await?;
        let ticker = Self::checked(ticker)?;
        ensure_range("days", f64::from(days), 1.0, f64::from(MAX_HISTORY_DAYS))?;

        let output_size = if days <= COMPACT_POINTS { "compact" } else { "full" };
        let mut params = vec![
            ("function", interval.function().to_string()),
            ("symbol", ticker.clone()),
            ("apikey", api_key.to_string()),
            ("outputsize", output_size.to_string()),
        ];
        if interval == AvInterval::Intraday {
            params.push(("interval", "60min".to_string()));
        }

        let payload = self.query_json(&params).await?;
        let prices = parse_time_series(&payload, days as usize);
        if prices.is_empty() {
            self.logger.warn(&format!("No time series data found for {}", ticker), None).await;
        }
        Ok(prices)
    }

    /// Latest quote; `None` for an unknown symbol.
    pub async fn get_quote(&self, ticker: &str) -> Result<Option<AvQuote>, ApiError> {
        let api_key = self.require_key().await?;
        let params = [
            ("function", "GLOBAL_QUOTE".to_string()),
            ("symbol", Self::checked(ticker)?),
            ("apikey", api_key.to_string()),
        ];
        Ok(parse_global_quote(&self.query_json(&params).await?))
    }

    /// Fundamentals; `None` for an unknown symbol.
    pub async fn get_company_overview(
        &self,
        ticker: &str,
    ) -> Result<Option<CompanyOverview>, ApiError> {
        let api_key = self.require_key().await?;
        let params = [
            ("function", "OVERVIEW".to_string()),
            ("symbol", Self::checked(ticker)?),
            ("apikey", api_key.to_string()),
        ];
        Ok(parse_company_overview(&self.query_json(&params).await?))
    }

    /// Scheduled reports over `horizon`, for one ticker or the whole market.
    pub async fn get_earnings_calendar(
        &self,
        ticker: Option<&str>,
        horizon: Horizon,
    ) -> Result<Vec<EarningsCalendarEntry>, ApiError> {
        let api_key = self.require_key().await?;
        let mut params = vec![
            ("function", "EARNINGS_CALENDAR".to_string()),
            ("horizon", horizon.as_str().to_string()),
            ("apikey", api_key.to_string()),
        ];
        if let Some(t) = ticker {
            params.push(("symbol", Self::checked(t)?));
        }

        let response = self
            .limiter
            .guard(self.client.request_text(Method::GET, "query", Some(&params), None))
            .await??;
        if !response.success {
            let err = Self::upstream_error(response.status, response.error_body.as_deref());
            self.logger.error(&err.to_string(), None).await;
            return Err(err);
        }
        let entries = parse_earnings_calendar(response.data.as_deref().unwrap_or_default())?;
        self.logger
            .debug(
                "Earnings calendar fetched",
                Some(serde_json::json!({"horizon": horizon.as_str(), "count": entries.len()})),
            )
            .await;
        Ok(entries)
    }

    /// Market-wide reports due in the next `days_ahead` days.
    pub async fn get_upcoming_earnings(
        &self,
        days_ahead: u32,
    ) -> Result<Vec<EarningsCalendarEntry>, ApiError> {
        ensure_range("days_ahead", f64::from(days_ahead), 1.0, 365.0)?;
        let entries = self.get_earnings_calendar(None, Horizon::covering(days_ahead)).await?;
        Ok(upcoming_within(entries, Utc::now().date_naive(), days_ahead))
    }
}
