use super::newssentiment::{summarize, NewsArticle, SentimentSummary};
use crate::loggers::loggerlocal::LoggerLocal;
use crate::retrieve::ky_http::ApiClient;
use crate::security::errors::{ApiError, ValidationError};
use crate::security::rate_limiter::{RateLimiter, NEWS_API_LIMITER};
use crate::security::validation::sanitize_ticker;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// NewsAPI v2 root.
pub const NEWS_API_BASE_URL: &str = "https://newsapi.org/v2/";
/// Environment variable holding the key.
pub const NEWS_API_KEY_VAR: &str = "NEWS_API_KEY";
/// Query used when neither a query nor a ticker is given.
pub const DEFAULT_NEWS_QUERY: &str = "finance OR stock OR market";
/// NewsAPI's page size ceiling.
pub const MAX_PAGE_SIZE: u32 = 100;
/// Page size used by [`NewsSentimentClient::get_sentiment_summary`].
pub const SUMMARY_PAGE_SIZE: u32 = 50;

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
    source: Option<RawSource>,
}

impl From<RawArticle> for NewsArticle {
    fn from(raw: RawArticle) -> Self {
        NewsArticle::new(
            raw.title.unwrap_or_default(),
            raw.description,
            raw.url.unwrap_or_default(),
            raw.published_at.unwrap_or_default(),
            raw.source.and_then(|s| s.name).unwrap_or_else(|| "Unknown".to_string()),
        )
    }
}

/// `q` parameter for a query and/or ticker.
pub fn build_query(query: Option<&str>, ticker: Option<&str>) -> String {
    let query = query.map(str::trim).filter(|q| !q.is_empty());
    match (query, ticker) {
        (Some(q), Some(t)) => format!("{} {}", q, t),
        (Some(q), None) => q.to_string(),
        (None, Some(t)) => t.to_string(),
        (None, None) => DEFAULT_NEWS_QUERY.to_string(),
    }
}

/// Articles of an `everything` response. A status other than `"ok"` is an
/// upstream error carrying NewsAPI's message.
pub fn parse_news_payload(payload: &Value) -> Result<Vec<NewsArticle>, ApiError> {
    let status = payload.get("status").and_then(Value::as_str).unwrap_or_default();
    if status != "ok" {
        let message = payload.get("message").and_then(Value::as_str).unwrap_or("unknown error");
        return Err(ApiError::Upstream(format!("NewsAPI error: {}", message)));
    }
    let raw: Vec<RawArticle> = match payload.get("articles") {
        None | Some(Value::Null) => Vec::new(),
        Some(a) => serde_json::from_value(a.clone()).map_err(|e| ApiError::Decode(e.to_string()))?,
    };
    Ok(raw.into_iter().map(NewsArticle::from).collect())
}

/// NewsAPI client with lexicon sentiment scoring.
pub struct NewsSentimentClient {
    client: ApiClient,
    api_key: Option<String>,
    limiter: &'static RateLimiter,
    logger: Arc<LoggerLocal>,
}

impl NewsSentimentClient {
    /// Builds the client. Without a key every call fails with
    /// [`ApiError::MissingApiKey`].
    pub fn new(
        api_key: Option<String>,
        logger: Arc<LoggerLocal>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: ApiClient::with_timeout(NEWS_API_BASE_URL, None, timeout)?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            limiter: &NEWS_API_LIMITER,
            logger,
        })
    }

    /// `true` when a key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Scored articles from the last `days` days, newest first.
    pub async fn get_financial_news(
        &self,
        query: Option<&str>,
        ticker: Option<&str>,
        days: u32,
        page_size: u32,
    ) -> Result<Vec<NewsArticle>, ApiError> {
        let Some(api_key) = self.api_key.as_deref() else {
            self.logger
                .warn(
                    "NewsAPI key required for news features. \
                     Get a free key at https://newsapi.org/register",
                    None,
                )
                .await;
            return Err(ApiError::MissingApiKey(NEWS_API_KEY_VAR));
        };
        let ticker = match ticker {
            Some(t) => Some(
                sanitize_ticker(t).ok_or_else(|| ValidationError::InvalidTicker(t.to_string()))?,
            ),
            None => None,
        };

        let from_date = (Utc::now() - ChronoDuration::days(i64::from(days)))
            .format("%Y-%m-%d")
            .to_string();
        let params = [
            ("q", build_query(query, ticker.as_deref())),
            ("from", from_date),
            ("language", "en".to_string()),
            ("sortBy", "publishedAt".to_string()),
            ("pageSize", page_size.clamp(1, MAX_PAGE_SIZE).to_string()),
            ("apiKey", api_key.to_string()),
        ];

        let request =
            self.client.request::<Value, ()>(Method::GET, "everything", Some(&params), None, None);
        let response = self.limiter.guard(request).await??;

        if !response.success {
            // NewsAPI reports errors as JSON bodies with a message.
            let message = response
                .error_body
                .as_deref()
                .and_then(|b| serde_json::from_str::<Value>(b).ok())
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| format!("HTTP {}", response.status));
            self.logger.error(&format!("NewsAPI request failed: {}", message), None).await;
            return Err(ApiError::Upstream(message));
        }

        let payload = response.data.unwrap_or(Value::Null);
        let articles = parse_news_payload(&payload)?;
        self.logger
            .debug(
                "NewsAPI articles fetched",
                Some(serde_json::json!({"count": articles.len(), "ticker": ticker})),
            )
            .await;
        Ok(articles)
    }

    /// Sentiment summary over the last `days` days of coverage.
    pub async fn get_sentiment_summary(
        &self,
        ticker: Option<&str>,
        days: u32,
    ) -> Result<SentimentSummary, ApiError> {
        let articles = self.get_financial_news(None, ticker, days, SUMMARY_PAGE_SIZE).await?;
        Ok(summarize(ticker, articles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::errors::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_build_query() {
        assert_eq!(build_query(None, None), DEFAULT_NEWS_QUERY);
        assert_eq!(build_query(Some("inflation"), None), "inflation");
        assert_eq!(build_query(None, Some("AAPL")), "AAPL");
        assert_eq!(build_query(Some(" earnings "), Some("AAPL")), "earnings AAPL");
        assert_eq!(build_query(Some("  "), Some("AAPL")), "AAPL");
    }

    #[test]
    fn test_parse_news_payload() {
        let payload = json!({
            "status": "ok",
            "totalResults": 2,
            "articles": [
                {"source": {"id": null, "name": "Reuters"},
                 "title": "Apple shares surge after earnings beat", "description": null,
                 "url": "https://example.org/a", "publishedAt": "2024-01-19T10:00:00Z"},
                {"source": {}, "title": "Chipmakers plunge",
                 "description": "Investors worry about demand",
                 "url": "https://example.org/b", "publishedAt": "2024-01-19T09:00:00Z"}
            ]
        });
        let articles = parse_news_payload(&payload).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].source, "Reuters");
        assert_eq!(articles[0].sentiment_score, 1.0);
        assert_eq!(articles[1].source, "Unknown");
        assert_eq!(articles[1].sentiment_score, -1.0);
    }

    #[test]
    fn test_parse_news_error_status() {
        let payload = json!({
            "status": "error",
            "code": "apiKeyInvalid",
            "message": "Your API key is invalid."
        });
        match parse_news_payload(&payload) {
            Err(ApiError::Upstream(msg)) => {
                assert_eq!(msg, "NewsAPI error: Your API key is invalid.")
            }
            other => panic!("unexpected {:?}", other.map(|a| a.len())),
        }
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_request() {
        let logger = Arc::new(LoggerLocal::silent("news_test"));
        let client =
            NewsSentimentClient::new(Some("  ".into()), logger, Duration::from_secs(5)).unwrap();
        assert!(!client.has_api_key());
        let err = client.get_sentiment_summary(Some("AAPL"), 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.to_string(), "Missing API key: set the NEWS_API_KEY environment variable");
    }
}
