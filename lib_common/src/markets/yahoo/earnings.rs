//! # Earnings History and Calendar Events
//!
//! Past EPS results and the next scheduled report from the Yahoo Finance
//! quoteSummary `earningsHistory` and `calendarEvents` modules, with a
//! beat/miss trend analysis on top.

use super::apicallyahoo::{quote_summary_path, quote_summary_result, raw_number, ApiCallYahoo};
use crate::loggers::loggerlocal::LoggerLocal;
use crate::security::errors::{ApiError, ValidationError};
use crate::security::validation::{ensure_range, sanitize_ticker};
use crate::utils::misc::utils::{epoch_to_date, round_to};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Quarters examined by [`EarningsClient::analyze_earnings_trend`].
pub const TREND_QUARTERS: usize = 8;
/// Quarters echoed in [`EarningsTrend::recent_history`].
pub const RECENT_QUARTERS: usize = 4;
/// Default window of [`EarningsClient::check_earnings_soon`].
pub const DEFAULT_SOON_DAYS: i64 = 14;

const DATE_CAVEAT: &str = "Date may change - confirm with company";
const VOLATILITY_NOTE: &str = "High volatility expected around earnings date";

/// One reported quarter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarningsResult {
    pub ticker: String,
    pub report_date: Option<NaiveDate>,
    pub eps_actual: Option<f64>,
    pub eps_estimate: Option<f64>,
    /// Percent of `|estimate|`, 2 decimals.
    pub surprise_pct: Option<f64>,
    pub beat: Option<bool>,
}

/// Next scheduled report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextEarnings {
    pub ticker: String,
    pub next_earnings_date: NaiveDate,
    pub note: &'static str,
}

/// Beat/miss consistency over recent quarters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarningsTrend {
    pub ticker: String,
    pub total_quarters: usize,
    pub beats: usize,
    pub misses: usize,
    /// Percent, 1 decimal.
    pub beat_rate: f64,
    /// `"3 beats"`, `"1 misses"` or `"N/A"`.
    pub current_streak: String,
    pub avg_surprise_pct: Option<f64>,
    pub recent_history: Vec<EarningsResult>,
}

/// Whether a report falls inside a window, with the historical context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarningsSoon {
    pub ticker: String,
    pub has_earnings_soon: bool,
    pub earnings_date: Option<NaiveDate>,
    pub days_until: Option<i64>,
    pub historical_beat_rate: Option<f64>,
    pub avg_surprise_pct: Option<f64>,
    pub message: &'static str,
}

/// Surprise of `actual` over `estimate` in percent; `None` for a zero estimate.
pub fn surprise_pct(actual: f64, estimate: f64) -> Option<f64> {
    (estimate != 0.0).then(|| round_to((actual - estimate) / estimate.abs() * 100.0, 2))
}

/// The first `limit` quarters of an `earningsHistory` payload, in feed order
/// (oldest first).
pub fn parse_earnings_history(ticker: &str, payload: &Value, limit: usize) -> Vec<EarningsResult> {
    let Some(history) = quote_summary_result(payload)
        .and_then(|r| r.get("earningsHistory"))
        .and_then(|h| h.get("history"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    history
        .iter()
        .take(limit)
        .map(|item| {
            let eps_actual = raw_number(item.get("epsActual"));
            let eps_estimate = raw_number(item.get("epsEstimate"));
            let (surprise, beat) = match (eps_actual, eps_estimate) {
                (Some(a), Some(e)) => (surprise_pct(a, e), Some(a > e)),
                _ => (None, None),
            };
            EarningsResult {
                ticker: ticker.to_string(),
                report_date: raw_number(item.get("quarter"))
                    .and_then(|ts| epoch_to_date(ts as i64)),
                eps_actual,
                eps_estimate,
                surprise_pct: surprise,
                beat,
            }
        })
        .collect()
}

/// First `calendarEvents.earnings.earningsDate` entry.
pub fn parse_next_earnings(ticker: &str, payload: &Value) -> Option<NextEarnings> {
    let first = quote_summary_result(payload)?
        .get("calendarEvents")?
        .get("earnings")?
        .get("earningsDate")?
        .get(0);
    let date = raw_number(first).and_then(|ts| epoch_to_date(ts as i64))?;
    Some(NextEarnings {
        ticker: ticker.to_string(),
        next_earnings_date: date,
        note: DATE_CAVEAT,
    })
}

/// Length and direction (`true` for beats) of the run ending at the last
/// quarter with a known outcome.
fn trailing_streak(history: &[EarningsResult]) -> Option<(bool, usize)> {
    let mut outcomes = history.iter().rev().filter_map(|h| h.beat);
    let last = outcomes.next()?;
    Some((last, 1 + outcomes.take_while(|&b| b == last).count()))
}

/// Beat rate, streak and average surprise of `history` (oldest first);
/// `None` when it is empty.
pub fn earnings_trend(ticker: &str, history: Vec<EarningsResult>) -> Option<EarningsTrend> {
    if history.is_empty() {
        return None;
    }
    let total = history.len();
    let beats = history.iter().filter(|h| h.beat == Some(true)).count();
    let misses = history.iter().filter(|h| h.beat == Some(false)).count();
    let surprises: Vec<f64> = history.iter().filter_map(|h| h.surprise_pct).collect();
    let avg_surprise_pct = (!surprises.is_empty())
        .then(|| round_to(surprises.iter().sum::<f64>() / surprises.len() as f64, 2));
    let current_streak = match trailing_streak(&history) {
        Some((true, n)) => format!("{} beats", n),
        Some((false, n)) => format!("{} misses", n),
        None => "N/A".to_string(),
    };
    let recent_history = history[total.saturating_sub(RECENT_QUARTERS)..].to_vec();

    Some(EarningsTrend {
        ticker: ticker.to_string(),
        total_quarters: total,
        beats,
        misses,
        beat_rate: round_to(beats as f64 / total as f64 * 100.0, 1),
        current_streak,
        avg_surprise_pct,
        recent_history,
    })
}

/// Combines the next report date with the trend as of `today`.
pub fn earnings_soon(
    ticker: &str,
    next: Option<&NextEarnings>,
    trend: Option<&EarningsTrend>,
    today: NaiveDate,
    window_days: i64,
) -> EarningsSoon {
    let Some(next) = next else {
        return EarningsSoon {
            ticker: ticker.to_string(),
            has_earnings_soon: false,
            earnings_date: None,
            days_until: None,
            historical_beat_rate: None,
            avg_surprise_pct: None,
            message: "No upcoming earnings date found",
        };
    };
    let days_until = (next.next_earnings_date - today).num_days();
    EarningsSoon {
        ticker: ticker.to_string(),
        has_earnings_soon: days_until <= window_days,
        earnings_date: Some(next.next_earnings_date),
        days_until: Some(days_until),
        historical_beat_rate: trend.map(|t| t.beat_rate),
        avg_surprise_pct: trend.and_then(|t| t.avg_surprise_pct),
        message: VOLATILITY_NOTE,
    }
}

/// Earnings client on the shared Yahoo transport.
pub struct EarningsClient {
    api: ApiCallYahoo,
    logger: Arc<LoggerLocal>,
}

impl EarningsClient {
    pub fn new(logger: Arc<LoggerLocal>, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            api: ApiCallYahoo::new(Arc::clone(&logger), timeout)?,
            logger,
        })
    }

    fn checked(ticker: &str) -> Result<String, ApiError> {
        sanitize_ticker(ticker)
            .ok_or_else(|| ValidationError::InvalidTicker(ticker.to_string()).into())
    }

    async fn quote_summary(&self, ticker: &str, module: &str) -> Result<Value, ApiError> {
        let query = [("modules", module.to_string())];
        self.api.fetch_yahoo(&quote_summary_path(ticker), &query).await
    }

    /// Up to `limit` past quarters (1 to 40), oldest first.
    pub async fn get_earnings_history(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<EarningsResult>, ApiError> {
        let ticker = Self::checked(ticker)?;
        ensure_range("limit", limit as f64, 1.0, 40.0)?;
        let payload = self.quote_summary(&ticker, "earningsHistory").await?;
        Ok(parse_earnings_history(&ticker, &payload, limit))
    }

    /// Next scheduled report; `None` when Yahoo has no date.
    pub async fn get_next_earnings_date(
        &self,
        ticker: &str,
    ) -> Result<Option<NextEarnings>, ApiError> {
        let ticker = Self::checked(ticker)?;
        let payload = self.quote_summary(&ticker, "calendarEvents").await?;
        Ok(parse_next_earnings(&ticker, &payload))
    }

    /// Beat/miss analysis over the last [`TREND_QUARTERS`] quarters.
    pub async fn analyze_earnings_trend(&self, ticker: &str) -> Result<EarningsTrend, ApiError> {
        let history = self.get_earnings_history(ticker, TREND_QUARTERS).await?;
        let ticker = ticker.trim().to_uppercase();
        match earnings_trend(&ticker, history) {
            Some(trend) => Ok(trend),
            None => {
                let message = format!("No earnings history found for {}", ticker);
                self.logger.warn(&message, None).await;
                Err(ApiError::Upstream(message))
            }
        }
    }

    /// Whether `ticker` reports within `window_days` days.
    ///
    /// A missing trend does not fail the check; only the historical fields
    /// are left empty.
    pub async fn check_earnings_soon(
        &self,
        ticker: &str,
        window_days: i64,
    ) -> Result<EarningsSoon, ApiError> {
        let next = self.get_next_earnings_date(ticker).await?;
        let ticker = ticker.trim().to_uppercase();
        let trend = match next {
            Some(_) => self.analyze_earnings_trend(&ticker).await.ok(),
            None => None,
        };
        Ok(earnings_soon(
            &ticker,
            next.as_ref(),
            trend.as_ref(),
            Utc::now().date_naive(),
            window_days,
        ))
    }
}
