//! # price-history
//!
//! Yahoo chart lookups: quotes and price history for tickers, major index
//! aliases, futures and commodity ETFs.

use clap::{Parser, Subcommand};
use lib_common::configs::config_sys::{load_dotenv, ConfigLayer, FinDataConfig};
use lib_common::loggers::init_tracing;
use lib_common::loggers::loggerlocal::{LoggerLocal, LoggerLocalOptions};
use lib_common::markets::yahoo::pricehistory::{Interval, Period, YahooFinanceClient};
use lib_common::markets::yahoo::symbols::{COMMODITY_ETFS, FUTURES, MAJOR_INDICES};
use lib_common::security::errors::{safe_api_call, ApiError};
use serde_json::Value;
use std::sync::Arc;

#[derive(Subcommand, Debug)]
enum Target {
    /// Latest quote of a ticker.
    Quote { symbol: String },
    /// History of a ticker.
    Symbol { symbol: String },
    /// History of a major index alias (e.g. sp500, nikkei225).
    Index { key: String },
    /// History of a futures alias (e.g. crude_oil, gold).
    Future { key: String },
    /// History of a commodity ETF alias (e.g. gold_spot, uranium).
    Etf { key: String },
    /// Lists the known aliases.
    Aliases,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Yahoo Finance quotes and price history")]
struct Cli {
    #[command(subcommand)]
    target: Target,

    /// Lookback: 1d 5d 1mo 3mo 6mo 1y 2y 5y ytd max.
    #[arg(long, global = true, default_value = "1mo")]
    period: Period,

    /// Bar size: 1m 2m 5m 15m 30m 60m 90m 1h 1d 5d 1wk 1mo 3mo.
    #[arg(long, global = true, default_value = "1d")]
    interval: Interval,

    /// Pretty-print the JSON.
    #[arg(short, long, global = true)]
    pretty: bool,

    #[command(flatten)]
    config: ConfigLayer,
}

fn aliases(table: &[(&str, &str)]) -> Value {
    table.iter().map(|(alias, symbol)| (alias.to_string(), Value::from(*symbol))).collect()
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
    tracing::debug!(command = ?cli.target, period = cli.period.as_str(), "price-history starting");

    let logger = Arc::new(LoggerLocal::new(
        "price-history".to_string(),
        Some(LoggerLocalOptions::from_level(&cfg.log_level, Some(cfg.log_dir.clone()))),
    ));
    let client = YahooFinanceClient::new(Arc::clone(&logger), cfg.http_timeout())?;
    let (period, interval) = (cli.period, cli.interval);

    let result: Result<Value, _> = safe_api_call(&logger, "price_history", async {
        let value = match &cli.target {
            Target::Quote { symbol } => {
                serde_json::to_value(client.get_current_price(symbol).await?)
            }
            Target::Symbol { symbol } => {
                serde_json::to_value(client.get_price_history(symbol, period, interval).await?)
            }
            Target::Index { key } => {
                serde_json::to_value(client.get_index(key, period, interval).await?)
            }
            Target::Future { key } => {
                serde_json::to_value(client.get_future(key, period, interval).await?)
            }
            Target::Etf { key } => {
                serde_json::to_value(client.get_commodity_etf(key, period, interval).await?)
            }
            Target::Aliases => Ok(serde_json::json!({
                "indices": aliases(MAJOR_INDICES),
                "futures": aliases(FUTURES),
                "commodity_etfs": aliases(COMMODITY_ETFS),
            })),
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
