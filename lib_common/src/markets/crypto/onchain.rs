use crate::loggers::loggerlocal::LoggerLocal;
use crate::retrieve::ky_http::ApiClient;
use crate::security::errors::{ApiError, ValidationError};
use crate::security::rate_limiter::{
    RateLimiter, COINGECKO_LIMITER, DEFILLAMA_LIMITER, ETHERSCAN_LIMITER, GLASSNODE_LIMITER,
    WHALE_ALERT_LIMITER,
};
use crate::security::validation::{ensure_range, sanitize_slug, sanitize_ticker};
use crate::utils::misc::utils::epoch_to_date;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3/";
pub const DEFILLAMA_BASE_URL: &str = "https://api.llama.fi/";
pub const ETHERSCAN_BASE_URL: &str = "https://api.etherscan.io/v2/";
pub const GLASSNODE_BASE_URL: &str = "https://api.glassnode.com/v1/";
pub const WHALE_ALERT_BASE_URL: &str = "https://api.whale-alert.io/v1/";

pub const GLASSNODE_KEY_VAR: &str = "GLASSNODE_API_KEY";
pub const ETHERSCAN_KEY_VAR: &str = "ETHERSCAN_API_KEY";
pub const WHALE_ALERT_KEY_VAR: &str = "WHALE_ALERT_API_KEY";

/// Days of global TVL history kept.
pub const TVL_HISTORY_DAYS: usize = 30;
/// Smallest transfer value Whale Alert reports on its free tier.
pub const MIN_WHALE_VALUE_USD: f64 = 500_000.0;

const CLIENT_USER_AGENT: &str = "findata-onchain/1.0";

const GLASSNODE_INFLOW_METRIC: &str = "metrics/transactions/transfers_volume_to_exchanges_sum";
const GLASSNODE_OUTFLOW_METRIC: &str = "metrics/transactions/transfers_volume_from_exchanges_sum";

/// Keys of the providers that require one.
#[derive(Debug, Clone, Default)]
pub struct OnChainKeys {
    pub glassnode: Option<String>,
    pub etherscan: Option<String>,
    pub whale_alert: Option<String>,
}

/// Daily exchange inflow and outflow of an asset, in native units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeFlow {
    pub date: NaiveDate,
    pub exchange: &'static str,
    pub inflow: f64,
    pub outflow: f64,
    pub netflow: f64,
    pub asset: String,
}

/// One point of a TVL series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TvlPoint {
    pub date: NaiveDate,
    pub tvl: f64,
}

/// TVL of one DeFiLlama protocol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolTvl {
    pub protocol: Option<String>,
    pub category: Option<String>,
    pub chains: Vec<String>,
    pub current_tvl_usd: Option<f64>,
}

/// TVL summed over every chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalTvl {
    pub total_tvl_usd: Option<f64>,
    pub date: Option<NaiveDate>,
    pub historical: Vec<TvlPoint>,
}

/// Result of [`CryptoOnChainClient::get_defi_tvl`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DefiTvl {
    Protocol(ProtocolTvl),
    Global(GlobalTvl),
}

/// Etherscan gas oracle, in gwei.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GasPrices {
    pub safe_low: Option<f64>,
    pub standard: Option<f64>,
    pub fast: Option<f64>,
    pub base_fee: Option<f64>,
    pub unit: &'static str,
}

/// CoinGecko exchange ranking entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeSummary {
    pub name: Option<String>,
    pub id: Option<String>,
    pub trust_score: Option<f64>,
    #[serde(rename(deserialize = "trade_volume_24h_btc"))]
    pub volume_24h_btc: Option<f64>,
    #[serde(rename(deserialize = "trade_volume_24h_btc_normalized"))]
    pub volume_24h_normalized: Option<f64>,
    pub year_established: Option<i64>,
    pub country: Option<String>,
    pub url: Option<String>,
}

/// A large transfer reported by Whale Alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhaleAlert {
    pub timestamp: DateTime<Utc>,
    pub blockchain: String,
    pub asset: String,
    pub transaction_type: String,
    pub transaction_hash: String,
    pub from_address: String,
    pub from_owner: Option<String>,
    pub to_address: String,
    pub to_owner: Option<String>,
    pub amount: f64,
    pub amount_usd: f64,
}

#[derive(Debug, Deserialize)]
struct RawParty {
    #[serde(default)]
    address: String,
    owner: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawWhaleTransaction {
    blockchain: String,
    symbol: String,
    #[serde(default)]
    transaction_type: String,
    hash: String,
    from: RawParty,
    to: RawParty,
    timestamp: i64,
    amount: f64,
    amount_usd: f64,
}

impl RawWhaleTransaction {
    fn into_alert(self) -> Option<WhaleAlert> {
        Some(WhaleAlert {
            timestamp: DateTime::from_timestamp(self.timestamp, 0)?,
            blockchain: self.blockchain,
            asset: self.symbol.to_uppercase(),
            transaction_type: self.transaction_type,
            transaction_hash: self.hash,
            from_address: self.from.address,
            from_owner: self.from.owner.filter(|o| !o.is_empty() && o != "unknown"),
            to_address: self.to.address,
            to_owner: self.to.owner.filter(|o| !o.is_empty() && o != "unknown"),
            amount: self.amount,
            amount_usd: self.amount_usd,
        })
    }
}

/// Number that may arrive as JSON number or numeric string.
fn loose_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn epoch_day(value: Option<&Value>) -> Option<NaiveDate> {
    loose_number(value).and_then(|ts| epoch_to_date(ts as i64))
}

/// `[{ "t": epoch, "v": value }]` points keyed by day.
fn glassnode_points(series: &Value) -> Vec<(NaiveDate, f64)> {
    series
        .as_array()
        .map(|points| {
            points
                .iter()
                .filter_map(|p| Some((epoch_day(p.get("t"))?, loose_number(p.get("v"))?)))
                .collect()
        })
        .unwrap_or_default()
}

/// Pairs the inflow and outflow series by day. Days without an outflow
/// point count a zero outflow.
pub fn parse_exchange_flows(asset: &str, inflow: &Value, outflow: &Value) -> Vec<ExchangeFlow> {
    let outflows: HashMap<NaiveDate, f64> = glassnode_points(outflow).into_iter().collect();
    glassnode_points(inflow)
        .into_iter()
        .map(|(date, inflow)| {
            let outflow = outflows.get(&date).copied().unwrap_or(0.0);
            ExchangeFlow {
                date,
                exchange: "aggregated",
                inflow,
                outflow,
                netflow: inflow - outflow,
                asset: asset.to_string(),
            }
        })
        .collect()
}

/// `protocol/{slug}` payload. The current TVL is the last point of `tvl`.
pub fn parse_protocol_tvl(payload: &Value) -> ProtocolTvl {
    let text = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);
    let chains = payload
        .get("chains")
        .and_then(Value::as_array)
        .map(|c| c.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    let current_tvl_usd = payload
        .get("tvl")
        .and_then(Value::as_array)
        .and_then(|points| points.last())
        .and_then(|p| loose_number(p.get("totalLiquidityUSD")));
    ProtocolTvl {
        protocol: text("name"),
        category: text("category"),
        chains,
        current_tvl_usd,
    }
}

/// Historical chain TVL (`[{ "date", "tvl" }]`, oldest first). The older
/// `totalLiquidityUSD` field name is accepted too.
pub fn parse_global_tvl(payload: &Value) -> GlobalTvl {
    let points: Vec<TvlPoint> = payload
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    let tvl = loose_number(row.get("tvl"))
                        .or_else(|| loose_number(row.get("totalLiquidityUSD")))?;
                    Some(TvlPoint { date: epoch_day(row.get("date"))?, tvl })
                })
                .collect()
        })
        .unwrap_or_default();
    let latest = points.last();
    GlobalTvl {
        total_tvl_usd: latest.map(|p| p.tvl),
        date: latest.map(|p| p.date),
        historical: points[points.len().saturating_sub(TVL_HISTORY_DAYS)..].to_vec(),
    }
}

/// Etherscan `gasoracle` payload. Status `"1"` is success; anything else is
/// an upstream error carrying the `result` text.
pub fn parse_gas_prices(payload: &Value) -> Result<GasPrices, ApiError> {
    if payload.get("status").and_then(Value::as_str) != Some("1") {
        let reason = payload
            .get("result")
            .and_then(Value::as_str)
            .or_else(|| payload.get("message").and_then(Value::as_str))
            .unwrap_or("unknown error");
        return Err(ApiError::Upstream(format!("Etherscan error: {}", reason)));
    }
    let result = payload.get("result");
    let field = |key: &str| loose_number(result.and_then(|r| r.get(key)));
    Ok(GasPrices {
        safe_low: field("SafeGasPrice"),
        standard: field("ProposeGasPrice"),
        fast: field("FastGasPrice"),
        base_fee: field("suggestBaseFee"),
        unit: "gwei",
    })
}

/// CoinGecko `exchanges` list, truncated to `limit`.
pub fn parse_exchanges(payload: &Value, limit: usize) -> Result<Vec<ExchangeSummary>, ApiError> {
    let mut exchanges: Vec<ExchangeSummary> = match payload {
        Value::Array(_) => {
            serde_json::from_value(payload.clone()).map_err(|e| ApiError::Decode(e.to_string()))?
        }
        _ => return Err(ApiError::Decode("expected an array of exchanges".to_string())),
    };
    exchanges.truncate(limit);
    Ok(exchanges)
}

/// Whale Alert `transactions` payload. Transfers under `min_value_usd` are
/// dropped; the rest are returned newest first.
pub fn parse_whale_alerts(
    payload: &Value,
    min_value_usd: f64,
) -> Result<Vec<WhaleAlert>, ApiError> {
    if payload.get("result").and_then(Value::as_str) != Some("success") {
        let message = payload.get("message").and_then(Value::as_str).unwrap_or("unknown error");
        return Err(ApiError::Upstream(format!("Whale Alert error: {}", message)));
    }
    let raw: Vec<RawWhaleTransaction> = match payload.get("transactions") {
        None | Some(Value::Null) => Vec::new(),
        Some(t) => serde_json::from_value(t.clone()).map_err(|e| ApiError::Decode(e.to_string()))?,
    };
    let mut alerts: Vec<WhaleAlert> = raw
        .into_iter()
        .filter(|t| t.amount_usd >= min_value_usd)
        .filter_map(RawWhaleTransaction::into_alert)
        .collect();
    alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(alerts)
}

#[derive(Debug, Clone, Copy)]
enum Provider {
    CoinGecko,
    DefiLlama,
    Etherscan,
    Glassnode,
    WhaleAlert,
}

impl Provider {
    fn name(self) -> &'static str {
        match self {
            Provider::CoinGecko => "CoinGecko",
            Provider::DefiLlama => "DeFiLlama",
            Provider::Etherscan => "Etherscan",
            Provider::Glassnode => "Glassnode",
            Provider::WhaleAlert => "Whale Alert",
        }
    }

    fn limiter(self) -> &'static RateLimiter {
        match self {
            Provider::CoinGecko => &COINGECKO_LIMITER,
            Provider::DefiLlama => &DEFILLAMA_LIMITER,
            Provider::Etherscan => &ETHERSCAN_LIMITER,
            Provider::Glassnode => &GLASSNODE_LIMITER,
            Provider::WhaleAlert => &WHALE_ALERT_LIMITER,
        }
    }
}

/// On-chain and DeFi client. Each provider has its own limiter.
pub struct CryptoOnChainClient {
    coingecko: ApiClient,
    defillama: ApiClient,
    etherscan: ApiClient,
    glassnode: ApiClient,
    whale_alert: ApiClient,
    keys: OnChainKeys,
    logger: Arc<LoggerLocal>,
}

fn non_blank(key: Option<String>) -> Option<String> {
    key.filter(|k| !k.trim().is_empty())
}

impl CryptoOnChainClient {
    pub fn new(
        keys: OnChainKeys,
        logger: Arc<LoggerLocal>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            coingecko: ApiClient::with_timeout(COINGECKO_BASE_URL, None, timeout)?,
            defillama: ApiClient::with_timeout(DEFILLAMA_BASE_URL, None, timeout)?,
            etherscan: ApiClient::with_timeout(ETHERSCAN_BASE_URL, None, timeout)?,
            glassnode: ApiClient::with_timeout(GLASSNODE_BASE_URL, None, timeout)?,
            whale_alert: ApiClient::with_timeout(WHALE_ALERT_BASE_URL, None, timeout)?,
            keys: OnChainKeys {
                glassnode: non_blank(keys.glassnode),
                etherscan: non_blank(keys.etherscan),
                whale_alert: non_blank(keys.whale_alert),
            },
            logger,
        })
    }

    fn api(&self, provider: Provider) -> &ApiClient {
        match provider {
            Provider::CoinGecko => &self.coingecko,
            Provider::DefiLlama => &self.defillama,
            Provider::Etherscan => &self.etherscan,
            Provider::Glassnode => &self.glassnode,
            Provider::WhaleAlert => &self.whale_alert,
        }
    }

    async fn require<'a>(
        &self,
        key: &'a Option<String>,
        var: &'static str,
    ) -> Result<&'a str, ApiError> {
        match key.as_deref() {
            Some(k) => Ok(k),
            None => {
                self.logger
                    .warn(&format!("{} not set. Add a key for this feature.", var), None)
                    .await;
                Err(ApiError::MissingApiKey(var))
            }
        }
    }

    async fn fetch(
        &self,
        provider: Provider,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Value, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        let query = (!params.is_empty()).then_some(params);

        let request =
            self.api(provider).request::<Value, ()>(Method::GET, path, query, Some(headers), None);
        let response = provider.limiter().guard(request).await??;
        if !response.success {
            let message = format!(
                "{} request for {} failed: HTTP {}",
                provider.name(),
                path,
                response.status
            );
            self.logger.error(&message, None).await;
            return Err(ApiError::Upstream(message));
        }
        Ok(response.data.unwrap_or(Value::Null))
    }

    /// Daily exchange inflow and outflow of `asset` over the last `days` days
    /// (1 to 365). Requires a Glassnode key.
    pub async fn get_exchange_flows(
        &self,
        asset: &str,
        days: u32,
    ) -> Result<Vec<ExchangeFlow>, ApiError> {
        let api_key = self.require(&self.keys.glassnode, GLASSNODE_KEY_VAR).await?;
        let asset = sanitize_ticker(asset)
            .ok_or_else(|| ValidationError::InvalidTicker(asset.to_string()))?;
        ensure_range("days", f64::from(days), 1.0, 365.0)?;

        let until = Utc::now();
        let since = until - ChronoDuration::days(i64::from(days));
        let params = [
            ("a", asset.clone()),
            ("s", since.timestamp().to_string()),
            ("u", until.timestamp().to_string()),
            ("i", "24h".to_string()),
            ("api_key", api_key.to_string()),
        ];
        let inflow = self.fetch(Provider::Glassnode, GLASSNODE_INFLOW_METRIC, &params).await?;
        let outflow = self.fetch(Provider::Glassnode, GLASSNODE_OUTFLOW_METRIC, &params).await?;
        Ok(parse_exchange_flows(&asset, &inflow, &outflow))
    }

    /// TVL of one protocol (DeFiLlama slug such as `"aave"`) or, without
    /// one, of DeFi as a whole.
    pub async fn get_defi_tvl(&self, protocol: Option<&str>) -> Result<DefiTvl, ApiError> {
        match protocol {
            Some(p) => {
                let slug = sanitize_slug(p).ok_or_else(|| ValidationError::Unsupported {
                    name: "protocol",
                    value: p.to_string(),
                })?;
                let path = format!("protocol/{}", slug);
                let payload = self.fetch(Provider::DefiLlama, &path, &[]).await?;
                Ok(DefiTvl::Protocol(parse_protocol_tvl(&payload)))
            }
            None => {
                let payload = self.fetch(Provider::DefiLlama, "v2/historicalChainTvl", &[]).await?;
                Ok(DefiTvl::Global(parse_global_tvl(&payload)))
            }
        }
    }

    /// Ethereum mainnet gas oracle. Requires an Etherscan key.
    pub async fn get_gas_prices(&self) -> Result<GasPrices, ApiError> {
        let api_key = self.require(&self.keys.etherscan, ETHERSCAN_KEY_VAR).await?;
        let params = [
            ("chainid", "1".to_string()),
            ("module", "gastracker".to_string()),
            ("action", "gasoracle".to_string()),
            ("apikey", api_key.to_string()),
        ];
        let payload = self.fetch(Provider::Etherscan, "api", &params).await?;
        parse_gas_prices(&payload)
    }

    /// The `limit` (1 to 250) highest-ranked exchanges by trust score and
    /// volume.
    pub async fn get_top_exchanges(&self, limit: usize) -> Result<Vec<ExchangeSummary>, ApiError> {
        ensure_range("limit", limit as f64, 1.0, 250.0)?;
        let params = [("per_page", limit.to_string()), ("page", "1".to_string())];
        let payload = self.fetch(Provider::CoinGecko, "exchanges", &params).await?;
        parse_exchanges(&payload, limit)
    }

    /// Transfers worth at least `min_value_usd` in the last `hours` hours
    /// (1 to 24), newest first. Requires a Whale Alert key.
    pub async fn get_whale_alerts(
        &self,
        min_value_usd: f64,
        hours: u32,
    ) -> Result<Vec<WhaleAlert>, ApiError> {
        let api_key = self.require(&self.keys.whale_alert, WHALE_ALERT_KEY_VAR).await?;
        ensure_range("min_value_usd", min_value_usd, MIN_WHALE_VALUE_USD, 1e12)?;
        ensure_range("hours", f64::from(hours), 1.0, 24.0)?;

        let start = Utc::now() - ChronoDuration::hours(i64::from(hours));
        let params = [
            ("api_key", api_key.to_string()),
            ("min_value", (min_value_usd.round() as u64).to_string()),
            ("start", start.timestamp().to_string()),
        ];
        let payload = self.fetch(Provider::WhaleAlert, "transactions", &params).await?;
        let alerts = parse_whale_alerts(&payload, min_value_usd)?;
        self.logger
            .debug(
                "Whale alerts fetched",
                Some(serde_json::json!({"count": alerts.len(), "hours": hours})),
            )
            .await;
        Ok(alerts)
    }
}
