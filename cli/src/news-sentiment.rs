//! # news-sentiment
//!
//! Scores recent NewsAPI coverage and prints either the sentiment summary or
//! the scored articles as JSON. Needs `NEWS_API_KEY` (flag, environment,
//! `.env` or config file).

use clap::Parser;
use lib_common::configs::config_sys::{load_dotenv, ConfigLayer, FinDataConfig};
use lib_common::loggers::init_tracing;
use lib_common::loggers::loggerlocal::{LoggerLocal, LoggerLocalOptions};
use lib_common::markets::news::apicallnews::NewsSentimentClient;
use lib_common::security::errors::{safe_api_call, ApiError};
use serde_json::Value;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headline sentiment from NewsAPI")]
struct Cli {
    /// Ticker to focus on.
    #[arg(short = 's', long)]
    ticker: Option<String>,

    /// Free-text query, combined with the ticker when both are given.
    #[arg(short, long)]
    query: Option<String>,

    /// Lookback in days.
    #[arg(short, long, default_value_t = 7)]
    days: u32,

    /// Print the scored articles instead of the summary.
    #[arg(short, long)]
    articles: bool,

    /// Articles per request when listing (capped at 100).
    #[arg(long, default_value_t = 20)]
    page_size: u32,

    /// Pretty-print the JSON.
    #[arg(short, long)]
    pretty: bool,

    #[command(flatten)]
    config: ConfigLayer,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = FinDataConfig::resolve(cli.config.clone())?;
    init_tracing(cfg.tracing_directive());

    let logger = Arc::new(LoggerLocal::new(
        "news-sentiment".to_string(),
        Some(LoggerLocalOptions::from_level(&cfg.log_level, Some(cfg.log_dir.clone()))),
    ));
    let api_key = cfg.news_api_key.clone();
    let client = NewsSentimentClient::new(api_key, Arc::clone(&logger), cfg.http_timeout())?;
    tracing::debug!(has_key = client.has_api_key(), days = cli.days, "news-sentiment starting");

    let ticker = cli.ticker.as_deref();
    let result: Result<Value, _> = safe_api_call(&logger, "news_sentiment", async {
        let value = if cli.articles {
            let articles = client
                .get_financial_news(cli.query.as_deref(), ticker, cli.days, cli.page_size)
                .await?;
            serde_json::to_value(articles)
        } else {
            serde_json::to_value(client.get_sentiment_summary(ticker, cli.days).await?)
        };
        value.map_err(|e| ApiError::Decode(e.to_string()))
    })
    .await;

    let (value, failed) = match result {
        Ok(value) => (value, false),
        Err(payload) => (serde_json::to_value(&payload)?, true),
    };
    let text = if cli.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    println!("{}", text);
    if failed {
        std::process::exit(2);
    }
    Ok(())
}
