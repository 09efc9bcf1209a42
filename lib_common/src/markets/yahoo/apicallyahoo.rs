use crate::loggers::loggerlocal::LoggerLocal;
use crate::retrieve::ky_http::ApiClient;
use crate::security::errors::ApiError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Host serving the options (`v7`) and chart (`v8`) endpoints.
pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com/";

const MAX_ATTEMPTS: u64 = 3;

/// `v10/finance/quoteSummary` path for `symbol`.
pub fn quote_summary_path(symbol: &str) -> String {
    format!("v10/finance/quoteSummary/{}", symbol)
}

/// First result of a quoteSummary payload.
pub fn quote_summary_result(payload: &Value) -> Option<&Value> {
    payload.get("quoteSummary")?.get("result")?.get(0)
}

/// quoteSummary numbers arrive either bare or as `{"raw": .., "fmt": ..}`.
pub fn raw_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::Object(o) => o.get("raw").and_then(Value::as_f64),
        _ => None,
    }
}

/// 4xx answers are final, except 429 which is worth another try.
fn is_retryable(status: u16) -> bool {
    !(400..500).contains(&status) || status == 429
}

/// GET helper for Yahoo Finance with browser headers and linear backoff.
pub struct ApiCallYahoo {
    client: ApiClient,
    logger: Arc<LoggerLocal>,
}

impl ApiCallYahoo {
    /// Initialize with a shared logger instance and a per-request timeout.
    pub fn new(logger: Arc<LoggerLocal>, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            client: ApiClient::with_timeout(YAHOO_BASE_URL, None, timeout)?,
            logger,
        })
    }

    /// Performs a GET and returns the JSON body. Up to 3 attempts, sleeping
    /// 1s then 2s between them.
    pub async fn fetch_yahoo(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ApiError> {
        let mut attempts = 0;

        loop {
            attempts += 1;
            let headers = self.get_yahoo_headers();

            let last_error = match self
                .client
                .request::<Value, ()>(Method::GET, path, Some(query), Some(headers), None)
                .await
            {
                Ok(response) if response.success => match response.data {
                    Some(body) => return Ok(body),
                    None => ApiError::Decode(format!("empty body from {}", path)),
                },
                Ok(response) => {
                    let http_error =
                        format!("HTTP Request failed for {}: Status {}", path, response.status);
                    let extras = serde_json::json!({
                        "path": path,
                        "attempt": attempts,
                        "status": response.status,
                    });
                    if !is_retryable(response.status) {
                        self.logger.error(&http_error, Some(extras)).await;
                        return Err(ApiError::Upstream(http_error));
                    }
                    self.logger.warn(&http_error, Some(extras)).await;
                    ApiError::Network(http_error)
                }
                Err(e) => {
                    let msg = format!(
                        "Yahoo request error for {} (Attempt {}/{}): {}",
                        path, attempts, MAX_ATTEMPTS, e
                    );
                    self.logger.warn(&msg, None).await;
                    ApiError::Network(e.to_string())
                }
            };

            if attempts >= MAX_ATTEMPTS {
                let fatal_msg = format!(
                    "Final failure: Yahoo Finance unreachable or invalid after {} attempts",
                    MAX_ATTEMPTS
                );
                self.logger.fatal(&fatal_msg, Some(serde_json::json!({"path": path}))).await;
                return Err(last_error);
            }

            // Linear backoff: 1s, 2s
            sleep(Duration::from_secs(attempts)).await;
        }
    }

    /// Internal helper to construct the browser-mimic headers
    fn get_yahoo_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let header_list = [
            ("accept", "application/json, text/plain, */*"),
            ("accept-language", "en-US,en;q=0.9"),
            ("cache-control", "no-cache"),
            ("origin", "https://finance.yahoo.com"),
            ("pragma", "no-cache"),
            ("referer", "https://finance.yahoo.com/"),
            ("sec-fetch-dest", "empty"),
            ("sec-fetch-mode", "cors"),
            ("sec-fetch-site", "same-site"),
            (
                "user-agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
            ),
        ];

        for (name, value) in header_list {
            if let (Ok(h_name), Ok(h_value)) =
                (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value))
            {
                headers.insert(h_name, h_value);
            }
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_final_except_throttling() {
        assert!(!is_retryable(404));
        assert!(!is_retryable(401));
        assert!(is_retryable(429));
        assert!(is_retryable(500));
        assert!(is_retryable(503));
    }

    #[test]
    fn test_headers_mimic_a_browser() {
        let logger = Arc::new(LoggerLocal::silent("yahoo_test"));
        let api = ApiCallYahoo::new(logger, Duration::from_secs(5)).unwrap();
        let headers = api.get_yahoo_headers();
        assert_eq!(headers.len(), 10);
        assert!(headers["user-agent"].to_str().unwrap().starts_with("Mozilla/5.0"));
        assert_eq!(headers["referer"], "https://finance.yahoo.com/");
    }

    #[test]
    fn test_quote_summary_helpers() {
        let payload = serde_json::json!({
            "quoteSummary": {"result": [{"price": {"currency": "USD"}}], "error": null}
        });
        assert_eq!(quote_summary_path("AAPL"), "v10/finance/quoteSummary/AAPL");
        assert!(quote_summary_result(&payload).is_some());
        let empty = serde_json::json!({"quoteSummary": {"result": null}});
        assert!(quote_summary_result(&empty).is_none());

        let raw = serde_json::json!({"raw": 2.5, "fmt": "2.50"});
        assert_eq!(raw_number(Some(&raw)), Some(2.5));
        assert_eq!(raw_number(Some(&serde_json::json!(1.25))), Some(1.25));
        assert_eq!(raw_number(Some(&serde_json::json!({}))), None);
        assert_eq!(raw_number(None), None);
    }
}
