//! # News Sentiment Live Data Test
//!
//! Fetches recent NewsAPI coverage through lib_common and prints the
//! sentiment summary. The key is read from `NEWS_API_KEY` (or `.env`).
//!
//! Usage: `cargo run -p project_tests --bin test_news_sentiment -- [TICKER] [DAYS]`

use lib_common::configs::config_sys::FinDataConfig;
use lib_common::loggers::loggerlocal::LoggerLocal;
use lib_common::markets::news::apicallnews::NewsSentimentClient;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let ticker = args.next().unwrap_or_else(|| "AAPL".to_string());
    let days: u32 = args.next().and_then(|d| d.parse().ok()).unwrap_or(3);

    // // Statement: Resolve .env, environment and config file without CLI flags
    let cfg = FinDataConfig::from_env()?;
    println!("[*] Configuration: {}", cfg);

    let logger = Arc::new(LoggerLocal::new("news_sentiment_test".to_string(), None));
    let client = NewsSentimentClient::new(cfg.news_api_key.clone(), logger, cfg.http_timeout())?;
    if !client.has_api_key() {
        eprintln!("[ERROR] NEWS_API_KEY is not set; nothing to test.");
        std::process::exit(1);
    }

    println!("[*] Requesting {} day(s) of news for {} from NewsAPI...", days, ticker);

    match client.get_sentiment_summary(Some(&ticker), days).await {
        Ok(summary) => {
            println!("\n[SUCCESS] Sentiment summary:");
            println!("-----------------------------------------------");
            println!("{}", serde_json::to_string_pretty(&summary.latest_headlines)?);
            println!("-----------------------------------------------");
            println!(
                "[INFO] {} articles | average {:?} | {} | topics {:?}",
                summary.article_count,
                summary.average_sentiment,
                summary.sentiment_label.as_str(),
                summary.key_topics
            );
        }
        Err(e) => {
            eprintln!("\n[ERROR] Sentiment summary failed ({:?}):", e.kind());
            eprintln!(">>> {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
