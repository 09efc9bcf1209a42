use crate::loggers::loggerlocal::LoggerLocal;
use crate::retrieve::ky_http::ApiClient;
use crate::security::errors::{ApiError, ValidationError};
use crate::security::rate_limiter::{RateLimiter, SEC_EDGAR_LIMITER};
use crate::security::validation::{ensure_range, sanitize_ticker};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Host of `files/company_tickers.json` and the filing archives.
pub const SEC_WWW_BASE_URL: &str = "https://www.sec.gov/";
/// Host of the `submissions` feed.
pub const SEC_DATA_BASE_URL: &str = "https://data.sec.gov/";
/// Sent when `SEC_USER_AGENT` is not configured. EDGAR asks for a name and
/// a contact address.
pub const DEFAULT_SEC_USER_AGENT: &str = "findata-client contact@example.com";
/// Filings returned by default.
pub const DEFAULT_FILING_LIMIT: usize = 10;
/// Default lookback of [`SecFilingsClient::get_recent_filings`].
pub const DEFAULT_DAYS_BACK: u32 = 365;

/// One entry of a company's filing history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecFiling {
    pub accession_number: String,
    pub form: String,
    pub filed_date: Option<NaiveDate>,
    pub report_date: Option<NaiveDate>,
    pub document_url: String,
    pub description: String,
}

/// Latest annual report of a company.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenKSummary {
    pub ticker: String,
    pub form: String,
    pub filed_date: Option<NaiveDate>,
    pub document_url: String,
    pub description: String,
}

/// Filter applied to the `recent` block of a submissions payload.
#[derive(Debug, Clone, Copy)]
pub struct FilingQuery<'a> {
    pub form: Option<&'a str>,
    pub limit: usize,
    /// Filings dated before this day are skipped. Undated filings are kept.
    pub cutoff: NaiveDate,
}

/// Zero-padded ten digit CIK of `ticker` in `company_tickers.json`.
pub fn find_cik(payload: &Value, ticker: &str) -> Option<String> {
    payload.as_object()?.values().find_map(|entry| {
        let symbol = entry.get("ticker").and_then(Value::as_str)?;
        if !symbol.eq_ignore_ascii_case(ticker) {
            return None;
        }
        let cik = match entry.get("cik_str")? {
            Value::Number(n) => n.as_u64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        Some(format!("{:010}", cik))
    })
}

/// Index page of a filing in the EDGAR archives.
pub fn filing_index_url(cik: &str, accession: &str) -> String {
    let cik_number = cik.trim_start_matches('0');
    let folder = accession.replace('-', "");
    format!(
        "{}Archives/edgar/data/{}/{}/{}-index.htm",
        SEC_WWW_BASE_URL, cik_number, folder, accession
    )
}

fn column<'a>(recent: &'a Value, key: &str) -> &'a [Value] {
    recent
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn text_at(column: &[Value], i: usize) -> Option<&str> {
    column.get(i).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn date_at(column: &[Value], i: usize) -> Option<NaiveDate> {
    text_at(column, i).and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// Filings of a submissions payload, in feed order (newest first).
///
/// The feed stores filings column-wise; the `form` column drives the
/// iteration and shorter columns yield empty values.
pub fn parse_recent_filings(payload: &Value, cik: &str, query: FilingQuery<'_>) -> Vec<SecFiling> {
    let null = Value::Null;
    let recent = payload
        .get("filings")
        .and_then(|f| f.get("recent"))
        .unwrap_or(&null);
    let forms = column(recent, "form");
    let filed = column(recent, "filingDate");
    let reported = column(recent, "reportDate");
    let accessions = column(recent, "accessionNumber");
    let descriptions = column(recent, "primaryDocDescription");

    forms
        .iter()
        .enumerate()
        .filter_map(|(i, form)| {
            let form = form.as_str()?;
            if query.form.is_some_and(|wanted| wanted != form) {
                return None;
            }
            let filed_date = date_at(filed, i);
            if filed_date.is_some_and(|d| d < query.cutoff) {
                return None;
            }
            let accession_number = text_at(accessions, i).unwrap_or_default().to_string();
            Some(SecFiling {
                document_url: filing_index_url(cik, &accession_number),
                accession_number,
                form: form.to_string(),
                filed_date,
                report_date: date_at(reported, i),
                description: text_at(descriptions, i).unwrap_or_default().to_string(),
            })
        })
        .take(query.limit)
        .collect()
}

/// EDGAR client. Every request carries the configured User-Agent and counts
/// against [`SEC_EDGAR_LIMITER`].
pub struct SecFilingsClient {
    www: ApiClient,
    data: ApiClient,
    user_agent: String,
    limiter: &'static RateLimiter,
    logger: Arc<LoggerLocal>,
}

impl SecFilingsClient {
    /// Builds the client. `user_agent` falls back to
    /// [`DEFAULT_SEC_USER_AGENT`].
    pub fn new(
        user_agent: Option<String>,
        logger: Arc<LoggerLocal>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let user_agent = user_agent
            .map(|ua| ua.trim().to_string())
            .filter(|ua| !ua.is_empty())
            .unwrap_or_else(|| DEFAULT_SEC_USER_AGENT.to_string());
        Ok(Self {
            www: ApiClient::with_timeout(SEC_WWW_BASE_URL, None, timeout)?,
            data: ApiClient::with_timeout(SEC_DATA_BASE_URL, None, timeout)?,
            user_agent,
            limiter: &SEC_EDGAR_LIMITER,
            logger,
        })
    }

    /// The User-Agent sent with every request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn headers(&self) -> Result<HeaderMap, ApiError> {
        let value =
            HeaderValue::from_str(&self.user_agent).map_err(|_| ValidationError::Unsupported {
                name: "sec_user_agent",
                value: self.user_agent.clone(),
            })?;
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, value);
        Ok(headers)
    }

    async fn fetch(&self, client: &ApiClient, path: &str) -> Result<Value, ApiError> {
        let headers = self.headers()?;
        let response = self
            .limiter
            .guard(client.request::<Value, ()>(Method::GET, path, None, Some(headers), None))
            .await??;

        if !response.success {
            let message =
                format!("SEC EDGAR request for {} failed: HTTP {}", path, response.status);
            self.logger.error(&message, None).await;
            return Err(ApiError::Upstream(message));
        }
        Ok(response.data.unwrap_or(Value::Null))
    }

    /// Ten digit CIK of `ticker`; `None` when EDGAR does not list it.
    pub async fn get_cik(&self, ticker: &str) -> Result<Option<String>, ApiError> {
        let ticker = sanitize_ticker(ticker)
            .ok_or_else(|| ValidationError::InvalidTicker(ticker.to_string()))?;
        let payload = self.fetch(&self.www, "files/company_tickers.json").await?;
        Ok(find_cik(&payload, &ticker))
    }

    /// Up to `limit` filings from the last `days_back` days, newest first,
    /// optionally restricted to one form type (`"10-K"`, `"8-K"`...).
    ///
    /// An unknown ticker yields an empty list.
    pub async fn get_recent_filings(
        &self,
        ticker: &str,
        form: Option<&str>,
        limit: usize,
        days_back: u32,
    ) -> Result<Vec<SecFiling>, ApiError> {
        ensure_range("limit", limit as f64, 1.0, 1000.0)?;
        let Some(cik) = self.get_cik(ticker).await? else {
            self.logger
                .warn(&format!("No CIK found for {}", ticker.trim().to_uppercase()), None)
                .await;
            return Ok(Vec::new());
        };

        let payload = self.fetch(&self.data, &format!("submissions/CIK{}.json", cik)).await?;
        let query = FilingQuery {
            form: form.map(str::trim).filter(|f| !f.is_empty()),
            limit,
            cutoff: (Utc::now() - ChronoDuration::days(i64::from(days_back))).date_naive(),
        };
        let filings = parse_recent_filings(&payload, &cik, query);
        self.logger
            .debug(
                "SEC filings fetched",
                Some(serde_json::json!({"cik": cik, "form": query.form, "count": filings.len()})),
            )
            .await;
        Ok(filings)
    }

    /// Most recent 10-K within the default lookback.
    pub async fn get_latest_10k_summary(
        &self,
        ticker: &str,
    ) -> Result<Option<TenKSummary>, ApiError> {
        let filings = self.get_recent_filings(ticker, Some("10-K"), 1, DEFAULT_DAYS_BACK).await?;
        Ok(filings.into_iter().next().map(|f| TenKSummary {
            ticker: ticker.trim().to_uppercase(),
            form: f.form,
            filed_date: f.filed_date,
            document_url: f.document_url,
            description: f.description,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::errors::ErrorKind;
    use serde_json::json;

    fn submissions() -> Value {
        json!({
            "cik": "320193",
            "name": "Apple Inc.",
            "filings": {"recent": {
                "accessionNumber": [
                    "0000320193-24-000006",
                    "0000320193-23-000106",
                    "0000320193-23-000077"
                ],
                "filingDate": ["2024-02-02", "2023-11-03", "2023-08-04"],
                "reportDate": ["", "2023-09-30", "2023-07-01"],
                "form": ["8-K", "10-K", "10-Q"],
                "primaryDocDescription": ["8-K", "10-K"]
            }}
        })
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_find_cik() {
        let payload = json!({
            "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
            "1": {"cik_str": "789019", "ticker": "MSFT", "title": "MICROSOFT CORP"}
        });
        assert_eq!(find_cik(&payload, "aapl").as_deref(), Some("0000320193"));
        assert_eq!(find_cik(&payload, "MSFT").as_deref(), Some("0000789019"));
        assert_eq!(find_cik(&payload, "ZZZZ"), None);
        assert_eq!(find_cik(&json!([]), "AAPL"), None);
    }

    #[test]
    fn test_filing_index_url() {
        assert_eq!(
            filing_index_url("0000320193", "0000320193-23-000106"),
            "https://www.sec.gov/Archives/edgar/data/320193/000032019323000106/0000320193-23-000106-index.htm"
        );
    }

    #[test]
    fn test_parse_recent_filings() {
        let query = FilingQuery { form: None, limit: 10, cutoff: day(2023, 1, 1) };
        let filings = parse_recent_filings(&submissions(), "0000320193", query);
        assert_eq!(filings.len(), 3);
        assert_eq!(filings[0].form, "8-K");
        assert_eq!(filings[0].report_date, None);
        assert_eq!(filings[1].report_date, Some(day(2023, 9, 30)));
        // Description column is one short.
        assert_eq!(filings[2].description, "");
        assert!(filings[2].document_url.ends_with("0000320193-23-000077-index.htm"));
    }

    #[test]
    fn test_parse_recent_filings_filters() {
        let ten_k = FilingQuery { form: Some("10-K"), limit: 10, cutoff: day(2023, 1, 1) };
        let filings = parse_recent_filings(&submissions(), "0000320193", ten_k);
        assert_eq!(filings.len(), 1);
        assert_eq!(filings[0].filed_date, Some(day(2023, 11, 3)));

        let recent = FilingQuery { form: None, limit: 10, cutoff: day(2023, 10, 1) };
        assert_eq!(parse_recent_filings(&submissions(), "0000320193", recent).len(), 2);

        let capped = FilingQuery { form: None, limit: 1, cutoff: day(2000, 1, 1) };
        assert_eq!(parse_recent_filings(&submissions(), "0000320193", capped).len(), 1);

        assert!(parse_recent_filings(&json!({}), "0000320193", capped).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_fails_before_any_request() {
        let logger = Arc::new(LoggerLocal::silent("sec_test"));
        let client = SecFilingsClient::new(None, logger, Duration::from_secs(5)).unwrap();
        assert_eq!(client.user_agent(), DEFAULT_SEC_USER_AGENT);

        let err = client.get_cik("AA PL").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = client.get_recent_filings("AAPL", None, 0, 30).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_configured_user_agent() {
        let logger = Arc::new(LoggerLocal::silent("sec_test"));
        let ua = Some("  Research Desk desk@example.org ".to_string());
        let client = SecFilingsClient::new(ua, logger, Duration::from_secs(5)).unwrap();
        assert_eq!(client.user_agent(), "Research Desk desk@example.org");
        assert!(client.headers().is_ok());
    }
}
