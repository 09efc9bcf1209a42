//! Yahoo symbol helpers: exchange suffixes and alias tables for indices,
//! futures and commodity ETFs.

use crate::security::errors::ValidationError;
use serde::{Deserialize, Serialize};

/// Exchanges reachable through a Yahoo symbol suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    HongKong,
    Tokyo,
    Taiwan,
    Korea,
    Shanghai,
    Shenzhen,
    Singapore,
    Australia,
    London,
    Germany,
    Paris,
    Toronto,
    Bombay,
    Nse,
}

impl Market {
    /// Suffix appended to the local code, e.g. `.HK`.
    pub fn suffix(self) -> &'static str {
        match self {
            Market::HongKong => ".HK",
            Market::Tokyo => ".T",
            Market::Taiwan => ".TW",
            Market::Korea => ".KS",
            Market::Shanghai => ".SS",
            Market::Shenzhen => ".SZ",
            Market::Singapore => ".SI",
            Market::Australia => ".AX",
            Market::London => ".L",
            Market::Germany => ".DE",
            Market::Paris => ".PA",
            Market::Toronto => ".TO",
            Market::Bombay => ".BO",
            Market::Nse => ".NS",
        }
    }
}

/// `0700` on [`Market::HongKong`] becomes `0700.HK`.
pub fn market_symbol(market: Market, code: &str) -> String {
    format!("{}{}", code.trim(), market.suffix())
}

/// Major stock market indices.
pub const MAJOR_INDICES: &[(&str, &str)] = &[
    // US
    ("sp500", "^GSPC"),
    ("dow_jones", "^DJI"),
    ("nasdaq", "^IXIC"),
    ("russell2000", "^RUT"),
    ("vix", "^VIX"),
    // Asia
    ("nikkei225", "^N225"),
    ("hang_seng", "^HSI"),
    ("shanghai_composite", "000001.SS"),
    ("csi300", "000300.SS"),
    ("taiwan_weighted", "^TWII"),
    ("kospi", "^KS11"),
    ("sensex", "^BSESN"),
    ("nifty50", "^NSEI"),
    ("straits_times", "^STI"),
    // Europe
    ("ftse100", "^FTSE"),
    ("dax", "^GDAXI"),
    ("cac40", "^FCHI"),
    ("euro_stoxx50", "^STOXX50E"),
    // Other
    ("asx200", "^AXJO"),
    ("tsx", "^GSPTSE"),
];

/// Index, energy, metal and agricultural futures.
pub const FUTURES: &[(&str, &str)] = &[
    ("es", "ES=F"),
    ("nq", "NQ=F"),
    ("ym", "YM=F"),
    ("rty", "RTY=F"),
    ("nikkei_futures", "NKD=F"),
    ("crude_oil", "CL=F"),
    ("brent_oil", "BZ=F"),
    ("natural_gas", "NG=F"),
    ("gold", "GC=F"),
    ("silver", "SI=F"),
    ("copper", "HG=F"),
    ("platinum", "PL=F"),
    ("palladium", "PA=F"),
    ("corn", "ZC=F"),
    ("wheat", "ZW=F"),
    ("soybeans", "ZS=F"),
    ("coffee", "KC=F"),
    ("sugar", "SB=F"),
    ("cotton", "CT=F"),
];

/// ETFs used as commodity price proxies.
pub const COMMODITY_ETFS: &[(&str, &str)] = &[
    ("gold_spot", "GLD"),
    ("silver_spot", "SLV"),
    ("gold_miners", "GDX"),
    ("junior_gold", "GDXJ"),
    ("oil_etf", "USO"),
    ("brent_etf", "BNO"),
    ("natural_gas_etf", "UNG"),
    ("commodities_broad", "DBC"),
    ("agriculture", "DBA"),
    ("base_metals", "DBB"),
    ("energy", "DBE"),
    ("uranium", "URA"),
    ("lithium", "LIT"),
    ("copper_miners", "COPX"),
];

fn lookup(
    table: &'static str,
    entries: &[(&'static str, &'static str)],
    key: &str,
) -> Result<&'static str, ValidationError> {
    entries
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, symbol)| *symbol)
        .ok_or_else(|| ValidationError::UnknownSymbol {
            table,
            key: key.to_string(),
            available: entries.iter().map(|(alias, _)| alias.to_string()).collect(),
        })
}

/// Yahoo symbol of a [`MAJOR_INDICES`] alias.
pub fn index_symbol(key: &str) -> Result<&'static str, ValidationError> {
    lookup("index", MAJOR_INDICES, key)
}

/// Yahoo symbol of a [`FUTURES`] alias.
pub fn future_symbol(key: &str) -> Result<&'static str, ValidationError> {
    lookup("future", FUTURES, key)
}

/// Ticker of a [`COMMODITY_ETFS`] alias.
pub fn commodity_etf_symbol(key: &str) -> Result<&'static str, ValidationError> {
    lookup("commodity ETF", COMMODITY_ETFS, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::validation::validate_ticker;

    #[test]
    fn test_market_suffixes() {
        assert_eq!(market_symbol(Market::HongKong, "0700"), "0700.HK");
        assert_eq!(market_symbol(Market::Tokyo, " 7203 "), "7203.T");
        assert_eq!(market_symbol(Market::Nse, "RELIANCE"), "RELIANCE.NS");
    }

    #[test]
    fn test_alias_lookup() {
        assert_eq!(index_symbol("sp500"), Ok("^GSPC"));
        assert_eq!(future_symbol("gold"), Ok("GC=F"));
        assert_eq!(commodity_etf_symbol("uranium"), Ok("URA"));

        match index_symbol("moon") {
            Err(ValidationError::UnknownSymbol { table, available, .. }) => {
                assert_eq!(table, "index");
                assert_eq!(available.len(), MAJOR_INDICES.len());
                assert_eq!(available[0], "sp500");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_every_table_symbol_passes_ticker_validation() {
        for (_, symbol) in MAJOR_INDICES.iter().chain(FUTURES).chain(COMMODITY_ETFS) {
            assert!(validate_ticker(symbol), "{}", symbol);
        }
    }
}
