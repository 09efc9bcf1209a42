//! # market-data
//!
//! One-shot lookups against the keyed and keyless data providers: SEC EDGAR
//! filings, FRED macro series, Alpha Vantage prices and fundamentals, Yahoo
//! earnings and company metadata, and crypto on-chain data. Prints JSON;
//! exits with status 2 when the provider call fails.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use lib_common::configs::config_sys::{load_dotenv, ConfigLayer, FinDataConfig};
use lib_common::loggers::init_tracing;
use lib_common::loggers::loggerlocal::{LoggerLocal, LoggerLocalOptions};
use lib_common::markets::alphavantage::marketdata::{AlphaVantageClient, AvInterval, Horizon};
use lib_common::markets::crypto::onchain::{CryptoOnChainClient, OnChainKeys};
use lib_common::markets::fred::macrodata::FredClient;
use lib_common::markets::sec::edgarfilings::{
    SecFilingsClient, DEFAULT_DAYS_BACK, DEFAULT_FILING_LIMIT,
};
use lib_common::markets::yahoo::earnings::{EarningsClient, DEFAULT_SOON_DAYS};
use lib_common::markets::yahoo::pricehistory::YahooFinanceClient;
use lib_common::security::errors::{safe_api_call, ApiError};
use serde_json::Value;
use std::sync::Arc;

#[derive(Subcommand, Debug)]
enum Lookup {
    /// Ten digit SEC CIK of a ticker.
    Cik { ticker: String },
    /// Recent SEC filings, optionally of one form type.
    Filings {
        ticker: String,
        #[arg(long)]
        form: Option<String>,
        #[arg(long, default_value_t = DEFAULT_FILING_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = DEFAULT_DAYS_BACK)]
        days_back: u32,
    },
    /// Latest 10-K of a ticker.
    TenK { ticker: String },
    /// FRED series observations (e.g. DFF, CPIAUCSL, UNRATE).
    Series {
        series_id: String,
        /// First observation date, YYYY-MM-DD.
        #[arg(long)]
        start: Option<NaiveDate>,
    },
    /// FRED series metadata.
    SeriesInfo { series_id: String },
    /// Headline FRED indicators.
    Macro,
    /// Alpha Vantage price history.
    AvHistory {
        ticker: String,
        #[arg(long, default_value_t = 30)]
        days: u32,
        /// intraday, daily, weekly or monthly.
        #[arg(long, default_value = "daily")]
        interval: AvInterval,
    },
    /// Alpha Vantage latest quote.
    AvQuote { ticker: String },
    /// Alpha Vantage company fundamentals.
    Overview { ticker: String },
    /// Alpha Vantage earnings calendar (3month, 6month or 12month).
    Calendar {
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long, default_value = "3month")]
        horizon: Horizon,
    },
    /// Market-wide earnings due in the next days.
    Upcoming {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Yahoo earnings history.
    Earnings {
        ticker: String,
        #[arg(long, default_value_t = 4)]
        limit: usize,
    },
    /// Yahoo next earnings date.
    NextEarnings { ticker: String },
    /// Beat/miss trend over the last eight quarters.
    Trend { ticker: String },
    /// Whether earnings fall within a window, with the trend.
    EarningsSoon {
        ticker: String,
        #[arg(long, default_value_t = DEFAULT_SOON_DAYS)]
        days: i64,
    },
    /// Yahoo company metadata.
    StockInfo { symbol: String },
    /// Exchange inflow and outflow (Glassnode).
    Flows {
        #[arg(default_value = "BTC")]
        asset: String,
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// DeFi TVL, global or for one protocol slug.
    Tvl { protocol: Option<String> },
    /// Ethereum gas prices (Etherscan).
    Gas,
    /// Top exchanges by CoinGecko rank.
    Exchanges {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Large transfers (Whale Alert).
    Whales {
        #[arg(long, default_value_t = 1_000_000.0)]
        min_usd: f64,
        #[arg(long, default_value_t = 1)]
        hours: u32,
    },
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Filings, macro, fundamentals, earnings and on-chain data")]
struct Cli {
    #[command(subcommand)]
    lookup: Lookup,

    /// Pretty-print the JSON.
    #[arg(short, long, global = true)]
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

async fn lookup(
    cfg: &FinDataConfig,
    logger: Arc<LoggerLocal>,
    lookup: &Lookup,
) -> Result<Value, ApiError> {
    let timeout = cfg.http_timeout();
    let sec = || SecFilingsClient::new(cfg.sec_user_agent.clone(), Arc::clone(&logger), timeout);
    let fred = || FredClient::new(cfg.fred_api_key.clone(), Arc::clone(&logger), timeout);
    let av = || {
        AlphaVantageClient::new(cfg.alpha_vantage_api_key.clone(), Arc::clone(&logger), timeout)
    };
    let earnings = || EarningsClient::new(Arc::clone(&logger), timeout);
    let crypto = || {
        let keys = OnChainKeys {
            glassnode: cfg.glassnode_api_key.clone(),
            etherscan: cfg.etherscan_api_key.clone(),
            whale_alert: cfg.whale_alert_api_key.clone(),
        };
        CryptoOnChainClient::new(keys, Arc::clone(&logger), timeout)
    };

    let value = match lookup {
        Lookup::Cik { ticker } => serde_json::to_value(sec()?.get_cik(ticker).await?),
        Lookup::Filings { ticker, form, limit, days_back } => {
            let filings =
                sec()?.get_recent_filings(ticker, form.as_deref(), *limit, *days_back).await?;
            serde_json::to_value(filings)
        }
        Lookup::TenK { ticker } => {
            serde_json::to_value(sec()?.get_latest_10k_summary(ticker).await?)
        }
        Lookup::Series { series_id, start } => {
            serde_json::to_value(fred()?.get_series(series_id, *start).await?)
        }
        Lookup::SeriesInfo { series_id } => {
            serde_json::to_value(fred()?.get_series_info(series_id).await?)
        }
        Lookup::Macro => serde_json::to_value(fred()?.get_macro_dashboard().await?),
        Lookup::AvHistory { ticker, days, interval } => {
            serde_json::to_value(av()?.get_price_history(ticker, *days, *interval).await?)
        }
        Lookup::AvQuote { ticker } => serde_json::to_value(av()?.get_quote(ticker).await?),
        Lookup::Overview { ticker } => {
            serde_json::to_value(av()?.get_company_overview(ticker).await?)
        }
        Lookup::Calendar { ticker, horizon } => {
            serde_json::to_value(av()?.get_earnings_calendar(ticker.as_deref(), *horizon).await?)
        }
        Lookup::Upcoming { days } => {
            serde_json::to_value(av()?.get_upcoming_earnings(*days).await?)
        }
        Lookup::Earnings { ticker, limit } => {
            serde_json::to_value(earnings()?.get_earnings_history(ticker, *limit).await?)
        }
        Lookup::NextEarnings { ticker } => {
            serde_json::to_value(earnings()?.get_next_earnings_date(ticker).await?)
        }
        Lookup::Trend { ticker } => {
            serde_json::to_value(earnings()?.analyze_earnings_trend(ticker).await?)
        }
        Lookup::EarningsSoon { ticker, days } => {
            serde_json::to_value(earnings()?.check_earnings_soon(ticker, *days).await?)
        }
        Lookup::StockInfo { symbol } => {
            let client = YahooFinanceClient::new(Arc::clone(&logger), timeout)?;
            serde_json::to_value(client.get_stock_info(symbol).await?)
        }
        Lookup::Flows { asset, days } => {
            serde_json::to_value(crypto()?.get_exchange_flows(asset, *days).await?)
        }
        Lookup::Tvl { protocol } => {
            serde_json::to_value(crypto()?.get_defi_tvl(protocol.as_deref()).await?)
        }
        Lookup::Gas => serde_json::to_value(crypto()?.get_gas_prices().await?),
        Lookup::Exchanges { limit } => {
            serde_json::to_value(crypto()?.get_top_exchanges(*limit).await?)
        }
        Lookup::Whales { min_usd, hours } => {
            serde_json::to_value(crypto()?.get_whale_alerts(*min_usd, *hours).await?)
        }
    };
    value.map_err(|e| ApiError::Decode(e.to_string()))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = FinDataConfig::resolve(cli.config.clone())?;
    init_tracing(cfg.tracing_directive());
    tracing::debug!(command = ?cli.lookup, "market-data starting");

    let logger = Arc::new(LoggerLocal::new(
        "market-data".to_string(),
        Some(LoggerLocalOptions::from_level(&cfg.log_level, Some(cfg.log_dir.clone()))),
    ));

    let result =
        safe_api_call(&logger, "market_data", lookup(&cfg, Arc::clone(&logger), &cli.lookup)).await;

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
