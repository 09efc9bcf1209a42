//! # Headline Sentiment
//!
//! Lexicon scoring of news headlines and the aggregate summary built from a
//! batch of articles. No I/O; the NewsAPI client lives in
//! [`super::apicallnews`].

use crate::utils::misc::utils::round_to;
use regex::Regex;
use serde::{Serialize, Serializer};
use static_init::dynamic;
use std::collections::{HashMap, HashSet};

/// Words that push a headline towards positive.
pub const POSITIVE_WORDS: [&str; 19] = [
    "surge", "soar", "jump", "rally", "gain", "rise", "boost", "growth", "profit", "beat", "exceed",
    "strong", "bullish", "optimistic", "recovery", "outperform", "upgrade", "buy", "opportunity",
];

/// Words that push a headline towards negative.
pub const NEGATIVE_WORDS: [&str; 20] = [
    "crash", "plunge", "drop", "fall", "decline", "loss", "bearish", "miss", "weak", "downgrade",
    "sell", "risk", "concern", "worry", "recession", "inflation", "debt", "crisis", "fraud",
    "investigation",
];

/// Averages above this read as bullish, below its negation as bearish.
pub const LABEL_THRESHOLD: f64 = 0.2;
/// Per-article score above which an article counts as positive.
pub const ARTICLE_THRESHOLD: f64 = 0.1;

const KEY_TOPICS: usize = 10;
const LATEST_HEADLINES: usize = 5;

#[dynamic]
static WORDS: Option<Regex> = Regex::new(r"\b\w+\b").ok();

#[dynamic]
static TOPIC_WORDS: Option<Regex> = Regex::new(r"\b[a-z]{4,}\b").ok();

/// Score in `[-1, 1]`: `(pos - neg) / (pos + neg)` over the distinct words of
/// the title and description, `0.0` when no lexicon word appears.
pub fn score_text(title: &str, description: Option<&str>) -> f64 {
    let text = format!("{} {}", title, description.unwrap_or_default()).to_lowercase();
    let Some(re) = WORDS.as_ref() else {
        return 0.0;
    };
    let words: HashSet<&str> = re.find_iter(&text).map(|m| m.as_str()).collect();

    let pos = POSITIVE_WORDS.iter().filter(|w| words.contains(**w)).count();
    let neg = NEGATIVE_WORDS.iter().filter(|w| words.contains(**w)).count();
    let total = pos + neg;
    if total == 0 {
        return 0.0;
    }
    (pos as f64 - neg as f64) / total as f64
}

/// One scored article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsArticle {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub published_at: String,
    pub source: String,
    pub sentiment_score: f64,
}

impl NewsArticle {
    /// Builds an article and scores it.
    pub fn new(
        title: String,
        description: Option<String>,
        url: String,
        published_at: String,
        source: String,
    ) -> Self {
        let sentiment_score = score_text(&title, description.as_deref());
        Self { title, description, url, published_at, source, sentiment_score }
    }
}

/// Overall reading of a batch of articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsSentimentLabel {
    Bullish,
    Bearish,
    Neutral,
    /// No articles were found.
    NoData,
}

impl NewsSentimentLabel {
    /// Label of an average score.
    pub fn from_average(avg: f64) -> Self {
        if avg > LABEL_THRESHOLD {
            NewsSentimentLabel::Bullish
        } else if avg < -LABEL_THRESHOLD {
            NewsSentimentLabel::Bearish
        } else {
            NewsSentimentLabel::Neutral
        }
    }

    /// Display text, e.g. `"No data"`.
    pub fn as_str(self) -> &'static str {
        match self {
            NewsSentimentLabel::Bullish => "Bullish",
            NewsSentimentLabel::Bearish => "Bearish",
            NewsSentimentLabel::Neutral => "Neutral",
            NewsSentimentLabel::NoData => "No data",
        }
    }
}

impl Serialize for NewsSentimentLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Short form of an article in the summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Headline {
    pub title: String,
    pub sentiment: f64,
    pub source: String,
}

/// Aggregate over a batch of articles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub ticker: Option<String>,
    pub article_count: usize,
    /// Rounded to 3 decimals; `None` without articles.
    pub average_sentiment: Option<f64>,
    pub sentiment_label: NewsSentimentLabel,
    pub positive_articles: usize,
    pub negative_articles: usize,
    pub neutral_articles: usize,
    pub key_topics: Vec<String>,
    pub latest_headlines: Vec<Headline>,
    pub articles: Vec<NewsArticle>,
}

/// Most frequent words of four or more letters across `titles`, ties kept in
/// first-seen order.
pub fn key_topics<'a>(titles: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let text = titles.into_iter().collect::<Vec<_>>().join(" ").to_lowercase();
    let Some(re) = TOPIC_WORDS.as_ref() else {
        return Vec::new();
    };

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for word in re.find_iter(&text).map(|m| m.as_str()) {
        let n = counts.entry(word).or_insert(0);
        if *n == 0 {
            order.push(word);
        }
        *n += 1;
    }

    // Stable sort keeps first-seen order among equal counts.
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.into_iter().take(KEY_TOPICS).map(str::to_string).collect()
}

/// Summarizes `articles` (newest first, as NewsAPI returns them).
pub fn summarize(ticker: Option<&str>, articles: Vec<NewsArticle>) -> SentimentSummary {
    let ticker = ticker.map(str::to_string);
    if articles.is_empty() {
        return SentimentSummary {
            ticker,
            article_count: 0,
            average_sentiment: None,
            sentiment_label: NewsSentimentLabel::NoData,
            positive_articles: 0,
            negative_articles: 0,
            neutral_articles: 0,
            key_topics: Vec::new(),
            latest_headlines: Vec::new(),
            articles,
        };
    }

    let scores: Vec<f64> = articles.iter().map(|a| a.sentiment_score).collect();
    let avg = scores.iter().sum::<f64>() / scores.len() as f64;
    let positive = scores.iter().filter(|s| **s > ARTICLE_THRESHOLD).count();
    let negative = scores.iter().filter(|s| **s < -ARTICLE_THRESHOLD).count();

    SentimentSummary {
        ticker,
        article_count: articles.len(),
        average_sentiment: Some(round_to(avg, 3)),
        sentiment_label: NewsSentimentLabel::from_average(avg),
        positive_articles: positive,
        negative_articles: negative,
        neutral_articles: articles.len() - positive - negative,
        key_topics: key_topics(articles.iter().map(|a| a.title.as_str())),
        latest_headlines: articles
            .iter()
            .take(LATEST_HEADLINES)
            .map(|a| Headline {
                title: a.title.clone(),
                sentiment: a.sentiment_score,
                source: a.source.clone(),
            })
            .collect(),
        articles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str) -> NewsArticle {
        NewsArticle::new(
            title.to_string(),
            None,
            "https://example.org".into(),
            "2024-01-19T10:00:00Z".into(),
            "Wire".into(),
        )
    }

    #[test]
    fn test_score_text() {
        assert_eq!(score_text("Stocks rally on strong earnings", None), 1.0);
        assert_eq!(score_text("Markets crash amid recession worry", None), -1.0);
        // gain vs. risk
        assert_eq!(score_text("Gain despite risk", Some("")), 0.0);
        // distinct words only: rally twice, drop once
        let repeated = score_text("Rally, rally", Some("then a drop and a surge"));
        assert!((repeated - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(score_text("Quarterly results published", None), 0.0);
        // substrings do not count
        assert_eq!(score_text("Buyers and sellers", None), 0.0);
    }

    #[test]
    fn test_labels() {
        assert_eq!(NewsSentimentLabel::from_average(0.21), NewsSentimentLabel::Bullish);
        assert_eq!(NewsSentimentLabel::from_average(0.2), NewsSentimentLabel::Neutral);
        assert_eq!(NewsSentimentLabel::from_average(-0.2), NewsSentimentLabel::Neutral);
        assert_eq!(NewsSentimentLabel::from_average(-0.25), NewsSentimentLabel::Bearish);
        assert_eq!(serde_json::to_value(NewsSentimentLabel::NoData).unwrap(), "No data");
    }

    #[test]
    fn test_key_topics_order() {
        let topics =
            key_topics(["Apple earnings beat", "Apple stock jumps", "Earnings season for apple"]);
        assert_eq!(topics, vec!["apple", "earnings", "beat", "stock", "jumps", "season"]);
    }

    #[test]
    fn test_summarize() {
        let articles = vec![
            article("Stocks rally on strong earnings"),
            article("Banks plunge on debt crisis"),
            article("Tech shares surge"),
            article("Quiet session for bonds"),
        ];
        let summary = summarize(Some("AAPL"), articles);
        assert_eq!(summary.article_count, 4);
        // (1 - 1 + 1 + 0) / 4
        assert_eq!(summary.average_sentiment, Some(0.25));
        assert_eq!(summary.sentiment_label, NewsSentimentLabel::Bullish);
        assert_eq!(
            (summary.positive_articles, summary.negative_articles, summary.neutral_articles),
            (2, 1, 1)
        );
        assert_eq!(summary.latest_headlines.len(), 4);
        assert_eq!(summary.latest_headlines[1].sentiment, -1.0);
        assert_eq!(summary.ticker.as_deref(), Some("AAPL"));
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(None, Vec::new());
        assert_eq!(summary.sentiment_label, NewsSentimentLabel::NoData);
        assert_eq!(summary.average_sentiment, None);
        let v = serde_json::to_value(&summary).unwrap();
        assert_eq!(v["sentiment_label"], "No data");
        assert!(v["average_sentiment"].is_null());
    }
}
