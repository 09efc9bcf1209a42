//! # Options Flow Live Data Test
//!
//! Pulls the nearest options chain for a ticker from Yahoo Finance via
//! lib_common and prints the flow report.
//!
//! Usage: `cargo run -p project_tests --bin test_options_flow -- [TICKER]`

use lib_common::loggers::loggerlocal::LoggerLocal;
use lib_common::markets::options::DEFAULT_VOLUME_THRESHOLD;
use lib_common::markets::yahoo::optionschain::OptionsDataClient;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ticker = std::env::args().nth(1).unwrap_or_else(|| "AAPL".to_string());

    // // Statement: Default logger options print every level to the TTY
    let logger = Arc::new(LoggerLocal::new("options_flow_test".to_string(), None));
    let client = OptionsDataClient::new(Arc::clone(&logger), Duration::from_secs(15))?;

    println!("[*] Requesting options chain for {} from Yahoo Finance...", ticker);

    let chain = match client.get_options_chain(&ticker, None).await {
        Ok(chain) => chain,
        Err(e) => {
            eprintln!("\n[ERROR] Options chain retrieval failed:");
            eprintln!(">>> {}", e);
            std::process::exit(1);
        }
    };
    println!(
        "[INFO] Expiration {}: {} calls, {} puts, spot {:?}",
        chain.expiration(),
        chain.calls().len(),
        chain.puts().len(),
        chain.underlying_price()
    );

    // // Statement: Second round trip exercises the full client path
    let expiration = Some(chain.expiration());
    match client.analyze_options_flow(&ticker, expiration, DEFAULT_VOLUME_THRESHOLD).await {
        Ok(report) => {
            println!("\n[SUCCESS] Flow report:");
            println!("-----------------------------------------------");
            println!("{}", serde_json::to_string_pretty(&report)?);
            println!("-----------------------------------------------");
            println!(
                "[INFO] Max pain {} | C/P {} | {} unusual | {} largest",
                report.analysis.max_pain,
                serde_json::to_string(&report.analysis.call_put_ratio)?,
                report.unusual_activity.len(),
                report.largest_positions.len()
            );
        }
        Err(e) => {
            eprintln!("\n[ERROR] Flow analysis failed:");
            eprintln!(">>> {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
