//! # options-flow
//!
//! Fetches a Yahoo options chain and prints the flow report (or one of its
//! projections) as JSON.

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use lib_common::configs::config_sys::{load_dotenv, ConfigLayer, FinDataConfig};
use lib_common::loggers::init_tracing;
use lib_common::loggers::loggerlocal::{LoggerLocal, LoggerLocalOptions};
use lib_common::markets::yahoo::optionschain::OptionsDataClient;
use lib_common::security::errors::{safe_api_call, ApiError};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum View {
    /// Full report.
    Report,
    /// Max pain strike only.
    MaxPain,
    /// Volume and open-interest ratios.
    Ratio,
    /// Unusual-volume alerts.
    Unusual,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Options flow analytics for a ticker")]
struct Cli {
    /// Underlying ticker, e.g. AAPL.
    ticker: String,

    /// Expiration date (YYYY-MM-DD). The nearest listed one when omitted.
    #[arg(short, long)]
    expiration: Option<NaiveDate>,

    /// What to print.
    #[arg(long, value_enum, default_value_t = View::Report)]
    view: View,

    /// Unusual-volume multiple. Defaults to the configured threshold for the
    /// report and to 2.0 for the unusual view.
    #[arg(short, long)]
    threshold: Option<f64>,

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
    tracing::debug!(ticker = %cli.ticker, view = ?cli.view, "options-flow starting");

    let logger = Arc::new(LoggerLocal::new(
        "options-flow".to_string(),
        Some(LoggerLocalOptions::from_level(&cfg.log_level, Some(cfg.log_dir.clone()))),
    ));
    let client = OptionsDataClient::new(Arc::clone(&logger), cfg.http_timeout())?;

    let ticker = cli.ticker.as_str();
    let expiration = cli.expiration;
    let result: Result<Value, _> = safe_api_call(&logger, "options_flow", async {
        let value = match cli.view {
            View::Report => {
                let threshold = cli.threshold.unwrap_or(cfg.volume_threshold);
                let report = client.analyze_options_flow(ticker, expiration, threshold).await?;
                serde_json::to_value(report)
            }
            View::MaxPain => Ok(serde_json::json!({
                "ticker": ticker,
                "max_pain": client.get_max_pain(ticker, expiration).await?,
            })),
            View::Ratio => {
                serde_json::to_value(client.get_call_put_ratio(ticker, expiration).await?)
            }
            View::Unusual => {
                let alerts = client.get_unusual_options_activity(ticker, cli.threshold).await?;
                serde_json::to_value(alerts)
            }
        };
        value.map_err(|e| ApiError::Decode(e.to_string()))
    })
    .await;

    match result {
        Ok(value) => print_json(&value, cli.pretty),
        Err(payload) => {
            print_json(&serde_json::to_value(&payload)?, cli.pretty)?;
            std::process::exit(2);
        }
    }
}

fn print_json(value: &Value, pretty: bool) -> anyhow::Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}
