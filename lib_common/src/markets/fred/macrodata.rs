use crate::loggers::loggerlocal::LoggerLocal;
use crate::retrieve::ky_http::ApiClient;
use crate::security::errors::{ApiError, ValidationError};
use crate::security::rate_limiter::{RateLimiter, FRED_LIMITER};
use crate::security::validation::{sanitize_series_id, truncate_string};
use crate::utils::misc::utils::current_datetime_rfc9557;
use chrono::NaiveDate;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// FRED API root.
pub const FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred/";
/// Environment variable holding the key.
pub const FRED_API_KEY_VAR: &str = "FRED_API_KEY";
/// Observations requested per series, newest first.
pub const OBSERVATION_LIMIT: u32 = 100;
/// Observations kept in a [`SeriesData`].
pub const KEPT_OBSERVATIONS: usize = 30;
/// Observations kept per dashboard indicator.
pub const DASHBOARD_HISTORY: usize = 5;
/// Longest `notes` text kept in a [`SeriesInfo`].
pub const MAX_NOTES_LEN: usize = 500;

/// Dashboard indicator names and their FRED series.
pub const DASHBOARD_SERIES: [(&str, &str); 6] = [
    ("fed_funds_rate", "DFF"),
    ("cpi", "CPIAUCSL"),
    ("unemployment", "UNRATE"),
    ("gdp_growth", "A191RL1Q225SBEA"),
    ("yield_spread", "T10Y2Y"),
    ("consumer_sentiment", "UMCSENT"),
];

/// One dated value. FRED marks missing values with `"."`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Latest value of a series plus its recent observations, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesData {
    pub series_id: String,
    pub latest_value: f64,
    pub latest_date: NaiveDate,
    pub observations: Vec<Observation>,
}

/// Series metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesInfo {
    pub id: String,
    pub title: Option<String>,
    pub units: Option<String>,
    pub frequency: Option<String>,
    pub seasonal_adjustment: Option<String>,
    pub last_updated: Option<String>,
    #[serde(default)]
    pub notes: String,
}

/// Dashboard entry: a reading or the reason it is missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IndicatorReading {
    Value {
        value: f64,
        date: NaiveDate,
        recent_history: Vec<Observation>,
    },
    Error {
        error: String,
    },
}

impl From<Result<SeriesData, ApiError>> for IndicatorReading {
    fn from(result: Result<SeriesData, ApiError>) -> Self {
        match result {
            Ok(mut data) => {
                data.observations.truncate(DASHBOARD_HISTORY);
                IndicatorReading::Value {
                    value: data.latest_value,
                    date: data.latest_date,
                    recent_history: data.observations,
                }
            }
            Err(e) => IndicatorReading::Error { error: e.to_payload().error },
        }
    }
}

/// Headline macro indicators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroDashboard {
    pub generated_at: String,
    pub indicators: BTreeMap<String, IndicatorReading>,
}

fn parse_value(raw: Option<&Value>) -> Option<f64> {
    match raw? {
        Value::String(s) if s != "." => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Builds a [`SeriesData`] from a `series/observations` payload sorted
/// newest first. The latest value is the first non-missing observation.
pub fn parse_observations(series_id: &str, payload: &Value) -> Result<SeriesData, ApiError> {
    let observations: Vec<Observation> = payload
        .get("observations")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    let date = row.get("date").and_then(Value::as_str)?;
                    Some(Observation {
                        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?,
                        value: parse_value(row.get("value")),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if observations.is_empty() {
        return Err(ApiError::Upstream(format!("No data found for {}", series_id)));
    }
    let (latest_value, latest_date) = observations
        .iter()
        .find_map(|o| o.value.map(|v| (v, o.date)))
        .ok_or_else(|| ApiError::Upstream(format!("No valid data for {}", series_id)))?;

    Ok(SeriesData {
        series_id: series_id.to_string(),
        latest_value,
        latest_date,
        observations: observations.into_iter().take(KEPT_OBSERVATIONS).collect(),
    })
}

/// First entry of a `series` payload, notes capped at [`MAX_NOTES_LEN`].
pub fn parse_series_info(payload: &Value) -> Result<SeriesInfo, ApiError> {
    let first = payload
        .get("seriess")
        .and_then(|s| s.get(0))
        .ok_or_else(|| ApiError::Upstream("Series not found".to_string()))?;
    let mut info: SeriesInfo =
        serde_json::from_value(first.clone()).map_err(|e| ApiError::Decode(e.to_string()))?;
    info.notes = truncate_string(&info.notes, MAX_NOTES_LEN);
    Ok(info)
}

/// FRED client.
pub struct FredClient {
    client: ApiClient,
    api_key: Option<String>,
    limiter: &'static RateLimiter,
    logger: Arc<LoggerLocal>,
}

impl FredClient {
    /// Builds the client. Without a key every call fails with
    /// [`ApiError::MissingApiKey`].
    pub fn new(
        api_key: Option<String>,
        logger: Arc<LoggerLocal>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: ApiClient::with_timeout(FRED_BASE_URL, None, timeout)?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            limiter: &FRED_LIMITER,
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
                        "FRED_API_KEY not set. Get a free key at \
                         https://fred.stlouisfed.org/docs/api/api_key.html",
                        None,
                    )
                    .await;
                Err(ApiError::MissingApiKey(FRED_API_KEY_VAR))
            }
        }
    }

    async fn fetch(&self, path: &str, params: &[(&str, String)]) -> Result<Value, ApiError> {
        let response = self
            .limiter
            .guard(self.client.request::<Value, ()>(Method::GET, path, Some(params), None, None))
            .await??;

        if !response.success {
            // FRED errors carry an `error_message` field.
            let message = response
                .error_body
                .as_deref()
                .and_then(|b| serde_json::from_str::<Value>(b).ok())
                .and_then(|v| v.get("error_message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| format!("HTTP {}", response.status));
            self.logger.error(&format!("FRED request failed: {}", message), None).await;
            return Err(ApiError::Upstream(message));
        }
        Ok(response.data.unwrap_or(Value::Null))
    }

    fn checked(series_id: &str) -> Result<String, ApiError> {
        sanitize_series_id(series_id).ok_or_else(|| {
            ValidationError::Unsupported { name: "series_id", value: series_id.to_string() }.into()
        })
    }

    /// Latest value and recent history of `series_id` (e.g. `"DFF"`,
    /// `"UNRATE"`), optionally starting at `observation_start`.
    pub async fn get_series(
        &self,
        series_id: &str,
        observation_start: Option<NaiveDate>,
    ) -> Result<SeriesData, ApiError> {
        let api_key = self.require_key().await?;
        let series_id = Self::checked(series_id)?;

        let mut params = vec![
            ("series_id", series_id.clone()),
            ("api_key", api_key.to_string()),
            ("file_type", "json".to_string()),
            ("sort_order", "desc".to_string()),
            ("limit", OBSERVATION_LIMIT.to_string()),
        ];
        if let Some(start) = observation_start {
            params.push(("observation_start", start.format("%Y-%m-%d").to_string()));
        }

        let payload = self.fetch("series/observations", &params).await?;
        parse_observations(&series_id, &payload)
    }

    /// Every [`DASHBOARD_SERIES`] indicator. A failing series is reported in
    /// place; only a missing key fails the whole dashboard.
    pub async fn get_macro_dashboard(&self) -> Result<MacroDashboard, ApiError> {
        self.require_key().await?;
        let mut indicators = BTreeMap::new();
        for (name, series_id) in DASHBOARD_SERIES {
            let reading = IndicatorReading::from(self.get_series(series_id, None).await);
            if let IndicatorReading::Error { error } = &reading {
                self.logger
                    .warn(&format!("Dashboard indicator {} unavailable: {}", name, error), None)
                    .await;
            }
            indicators.insert(name.to_string(), reading);
        }
        Ok(MacroDashboard { generated_at: current_datetime_rfc9557(), indicators })
    }

    /// Title, units, frequency and notes of `series_id`.
    pub async fn get_series_info(&self, series_id: &str) -> Result<SeriesInfo, ApiError> {
        let api_key = self.require_key().await?;
        let series_id = Self::checked(series_id)?;
        let params = [
            ("series_id", series_id),
            ("api_key", api_key.to_string()),
            ("file_type", "json".to_string()),
        ];
        let payload = self.fetch("series", &params).await?;
        parse_series_info(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::errors::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_parse_observations_skips_missing_values() {
        let payload = json!({
            "units": "lin",
            "observations": [
                {"realtime_start": "2024-01-22", "date": "2024-01-19", "value": "."},
                {"realtime_start": "2024-01-22", "date": "2024-01-18", "value": "5.33"},
                {"realtime_start": "2024-01-22", "date": "2024-01-17", "value": "5.32"}
            ]
        });
        let data = parse_observations("DFF", &payload).unwrap();
        assert_eq!(data.latest_value, 5.33);
        assert_eq!(data.latest_date, NaiveDate::from_ymd_opt(2024, 1, 18).unwrap());
        assert_eq!(data.observations.len(), 3);
        assert_eq!(data.observations[0].value, None);

        let v = serde_json::to_value(&data).unwrap();
        assert_eq!(v["observations"][0]["value"], Value::Null);
        assert_eq!(v["observations"][1]["date"], "2024-01-18");
    }

    #[test]
    fn test_parse_observations_without_data() {
        let empty = parse_observations("DFF", &json!({"observations": []})).unwrap_err();
        assert_eq!(empty.to_string(), "Upstream error: No data found for DFF");

        let dots = json!({"observations": [{"date": "2024-01-19", "value": "."}]});
        let invalid = parse_observations("DFF", &dots).unwrap_err();
        assert_eq!(invalid.to_string(), "Upstream error: No valid data for DFF");
    }

    #[test]
    fn test_parse_observations_keeps_thirty() {
        let rows: Vec<Value> = (1..=31)
            .map(|d| json!({"date": format!("2023-12-{:02}", d), "value": "1.0"}))
            .collect();
        let data = parse_observations("X", &json!({"observations": rows})).unwrap();
        assert_eq!(data.observations.len(), KEPT_OBSERVATIONS);
    }

    #[test]
    fn test_parse_series_info() {
        let notes = "n".repeat(600);
        let payload = json!({"seriess": [{
            "id": "UNRATE",
            "title": "Unemployment Rate",
            "units": "Percent",
            "frequency": "Monthly",
            "seasonal_adjustment": "Seasonally Adjusted",
            "last_updated": "2024-01-05 07:44:02-06",
            "notes": notes
        }]});
        let info = parse_series_info(&payload).unwrap();
        assert_eq!(info.title.as_deref(), Some("Unemployment Rate"));
        assert!(info.notes.starts_with(&"n".repeat(MAX_NOTES_LEN)));
        assert!(info.notes.ends_with("[truncated]"));
        assert!(parse_series_info(&json!({"seriess": []})).is_err());
    }

    #[test]
    fn test_indicator_reading_shapes() {
        let data = parse_observations(
            "UNRATE",
            &json!({"observations": [
                {"date": "2023-12-01", "value": "3.7"},
                {"date": "2023-11-01", "value": "3.7"},
                {"date": "2023-10-01", "value": "3.8"},
                {"date": "2023-09-01", "value": "3.8"},
                {"date": "2023-08-01", "value": "3.8"},
                {"date": "2023-07-01", "value": "3.5"}
            ]}),
        );
        let v = serde_json::to_value(IndicatorReading::from(data)).unwrap();
        assert_eq!(v["value"], json!(3.7));
        assert_eq!(v["date"], "2023-12-01");
        assert_eq!(v["recent_history"].as_array().map(Vec::len), Some(DASHBOARD_HISTORY));

        let failed = IndicatorReading::from(Err(ApiError::Network("timeout".into())));
        assert_eq!(
            serde_json::to_value(failed).unwrap(),
            json!({"error": "Network error. Please try again later."})
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_request() {
        let logger = Arc::new(LoggerLocal::silent("fred_test"));
        let client = FredClient::new(None, logger, Duration::from_secs(5)).unwrap();
        assert!(!client.has_api_key());
        let err = client.get_macro_dashboard().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.to_string(), "Missing API key: set the FRED_API_KEY environment variable");
        assert!(client.get_series_info("UNRATE").await.is_err());
    }

    #[tokio::test]
    async fn test_bad_series_id_is_rejected() {
        let logger = Arc::new(LoggerLocal::silent("fred_test"));
        let client = FredClient::new(Some("key".into()), logger, Duration::from_secs(5)).unwrap();
        let err = client.get_series("DFF&file_type=xml", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
