//! # Runtime Configuration
//!
//! Layered settings for the market clients and binaries. Precedence, highest
//! first:
//!
//! 1. command-line flags,
//! 2. environment variables (after `.env` is loaded with `dotenvy`),
//! 3. the JSON file named by `FINDATA_CONFIG_PATH` (default `findata.conf.json`),
//! 4. built-in defaults.
//!
//! [`ConfigLayer`] is one partial layer; [`FinDataConfig`] is the resolved,
//! validated result.

use crate::loggers::logrecord::{
    level_from_name, LEVEL_DEBUG, LEVEL_INFO, LEVEL_SILLY, LEVEL_TRACE, LEVEL_WARN,
};
use clap::{Args, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fmt, fs};
use thiserror::Error;

/// File read when `FINDATA_CONFIG_PATH` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "findata.conf.json";
/// Request timeout when nothing else is configured.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
/// Directory for log files.
pub const DEFAULT_LOG_DIR: &str = "./logs";
/// Minimum level for the local logger.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Unusual-volume multiple used by the flow analysis.
pub const DEFAULT_VOLUME_THRESHOLD: f64 = 1.5;

const LOG_LEVEL_NAMES: [&str; 8] =
    ["silly", "trace", "debug", "info", "warn", "warning", "error", "fatal"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {field}: {value}")]
    Invalid { field: &'static str, value: String },

    #[error("Argument error: {0}")]
    Args(String),
}

/// One partial configuration layer. Every field is optional so that layers
/// can be stacked with [`ConfigLayer::merge`].
#[derive(Debug, Clone, Default, PartialEq, Args, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    /// JSON configuration file.
    #[arg(long, env = "FINDATA_CONFIG_PATH", value_name = "FILE")]
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Alpha Vantage API key.
    #[arg(long, env = "ALPHA_VANTAGE_API_KEY", hide_env_values = true)]
    pub alpha_vantage_api_key: Option<String>,

    /// NewsAPI key.
    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    pub news_api_key: Option<String>,

    /// FRED API key.
    #[arg(long, env = "FRED_API_KEY", hide_env_values = true)]
    pub fred_api_key: Option<String>,

    /// User-Agent required by SEC EDGAR ("name email").
    #[arg(long, env = "SEC_USER_AGENT")]
    pub sec_user_agent: Option<String>,

    /// Glassnode API key (exchange flows).
    #[arg(long, env = "GLASSNODE_API_KEY", hide_env_values = true)]
    pub glassnode_api_key: Option<String>,

    /// Etherscan API key (gas prices).
    #[arg(long, env = "ETHERSCAN_API_KEY", hide_env_values = true)]
    pub etherscan_api_key: Option<String>,

    /// Whale Alert API key (large transfers).
    #[arg(long, env = "WHALE_ALERT_API_KEY", hide_env_values = true)]
    pub whale_alert_api_key: Option<String>,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "FINDATA_HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: Option<u64>,

    /// Directory for log files.
    #[arg(long, env = "FINDATA_LOG_DIR", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Minimum log level (silly, trace, debug, info, warn, error, fatal).
    #[arg(long, env = "FINDATA_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Unusual-volume multiple of the average contract volume.
    #[arg(long, env = "FINDATA_VOLUME_THRESHOLD")]
    pub volume_threshold: Option<f64>,
}

impl ConfigLayer {
    /// Fills every unset field of `self` from `lower`.
    pub fn merge(self, lower: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            config_path: self.config_path.or(lower.config_path),
            alpha_vantage_api_key: self.alpha_vantage_api_key.or(lower.alpha_vantage_api_key),
            news_api_key: self.news_api_key.or(lower.news_api_key),
            fred_api_key: self.fred_api_key.or(lower.fred_api_key),
            sec_user_agent: self.sec_user_agent.or(lower.sec_user_agent),
            glassnode_api_key: self.glassnode_api_key.or(lower.glassnode_api_key),
            etherscan_api_key: self.etherscan_api_key.or(lower.etherscan_api_key),
            whale_alert_api_key: self.whale_alert_api_key.or(lower.whale_alert_api_key),
            http_timeout_secs: self.http_timeout_secs.or(lower.http_timeout_secs),
            log_dir: self.log_dir.or(lower.log_dir),
            log_level: self.log_level.or(lower.log_level),
            volume_threshold: self.volume_threshold.or(lower.volume_threshold),
        }
    }

    /// Reads a layer from a JSON file. A missing file is an empty layer.
    pub fn from_file(path: &Path) -> Result<ConfigLayer, ConfigError> {
        if !path.is_file() {
            return Ok(ConfigLayer::default());
        }
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Loads `.env` from the working directory or its parents, if present.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

#[derive(Parser)]
struct EnvOnly {
    #[command(flatten)]
    layer: ConfigLayer,
}

/// Resolved settings. API keys are never serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinDataConfig {
    #[serde(skip_serializing)]
    pub alpha_vantage_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub news_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub fred_api_key: Option<String>,
    pub sec_user_agent: Option<String>,
    #[serde(skip_serializing)]
    pub glassnode_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub etherscan_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub whale_alert_api_key: Option<String>,
    pub http_timeout_secs: u64,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub volume_threshold: f64,
}

impl Default for FinDataConfig {
    fn default() -> Self {
        Self {
            alpha_vantage_api_key: None,
            news_api_key: None,
            fred_api_key: None,
            sec_user_agent: None,
            glassnode_api_key: None,
            etherscan_api_key: None,
            whale_alert_api_key: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            volume_threshold: DEFAULT_VOLUME_THRESHOLD,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl FinDataConfig {
    /// Stacks `top` (flags and environment, as parsed by clap) over the JSON
    /// file it points at, then over the defaults.
    pub fn resolve(top: ConfigLayer) -> Result<Self, ConfigError> {
        let path = top
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let merged = top.merge(ConfigLayer::from_file(&path)?);
        Self::from_layer(merged)
    }

    /// Applies defaults to a merged layer and validates it.
    pub fn from_layer(layer: ConfigLayer) -> Result<Self, ConfigError> {
        let defaults = FinDataConfig::default();

        let http_timeout_secs = layer.http_timeout_secs.unwrap_or(defaults.http_timeout_secs);
        if http_timeout_secs == 0 {
            return Err(ConfigError::Invalid { field: "http_timeout_secs", value: "0".to_string() });
        }

        let volume_threshold = layer.volume_threshold.unwrap_or(defaults.volume_threshold);
        if !(volume_threshold.is_finite() && volume_threshold > 0.0) {
            return Err(ConfigError::Invalid {
                field: "volume_threshold",
                value: volume_threshold.to_string(),
            });
        }

        let log_level = layer
            .log_level
            .map(|l| l.trim().to_lowercase())
            .unwrap_or(defaults.log_level);
        if !LOG_LEVEL_NAMES.contains(&log_level.as_str()) {
            return Err(ConfigError::Invalid { field: "log_level", value: log_level });
        }

        Ok(Self {
            alpha_vantage_api_key: non_empty(layer.alpha_vantage_api_key),
            news_api_key: non_empty(layer.news_api_key),
            fred_api_key: non_empty(layer.fred_api_key),
            sec_user_agent: non_empty(layer.sec_user_agent),
            glassnode_api_key: non_empty(layer.glassnode_api_key),
            etherscan_api_key: non_empty(layer.etherscan_api_key),
            whale_alert_api_key: non_empty(layer.whale_alert_api_key),
            http_timeout_secs,
            log_dir: layer.log_dir.unwrap_or(defaults.log_dir),
            log_level,
            volume_threshold,
        })
    }

    /// Environment (after `.env`), JSON file and defaults, without flags.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        let parsed =
            EnvOnly::try_parse_from(["findata"]).map_err(|e| ConfigError::Args(e.to_string()))?;
        Self::resolve(parsed.layer)
    }

    /// Request timeout as a `Duration`.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// `tracing` filter directive matching `log_level`.
    pub fn tracing_directive(&self) -> &'static str {
        match level_from_name(&self.log_level) {
            LEVEL_SILLY | LEVEL_TRACE => "trace",
            LEVEL_DEBUG => "debug",
            LEVEL_INFO => "info",
            LEVEL_WARN => "warn",
            _ => "error",
        }
    }
}

fn mask(key: &Option<String>) -> String {
    match key {
        None => "<unset>".to_string(),
        Some(k) => {
            let chars: Vec<char> = k.chars().collect();
            if chars.len() <= 4 {
                "****".to_string()
            } else {
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("****{}", tail)
            }
        }
    }
}

impl fmt::Display for FinDataConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FinDataConfig
    Alpha Vantage key: {},
    NewsAPI key: {},
    FRED key: {},
    SEC user agent: {},
    Glassnode key: {},
    Etherscan key: {},
    Whale Alert key: {},
    HTTP timeout: {}s,
    Log dir: {},
    Log level: {},
    Volume threshold: {}
",
            mask(&self.alpha_vantage_api_key),
            mask(&self.news_api_key),
            mask(&self.fred_api_key),
            self.sec_user_agent.as_deref().unwrap_or("<unset>"),
            mask(&self.glassnode_api_key),
            mask(&self.etherscan_api_key),
            mask(&self.whale_alert_api_key),
            self.http_timeout_secs,
            self.log_dir.display(),
            self.log_level,
            self.volume_threshold
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let cfg = FinDataConfig::from_layer(ConfigLayer::default()).unwrap();
        assert_eq!(cfg, FinDataConfig::default());
        assert_eq!(cfg.http_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.tracing_directive(), "info");
    }

    #[test]
    fn test_merge_prefers_upper_layer() {
        let upper = ConfigLayer { news_api_key: Some("cli".into()), ..Default::default() };
        let lower = ConfigLayer {
            news_api_key: Some("file".into()),
            http_timeout_secs: Some(30),
            ..Default::default()
        };
        let merged = upper.merge(lower);
        assert_eq!(merged.news_api_key.as_deref(), Some("cli"));
        assert_eq!(merged.http_timeout_secs, Some(30));
    }

    #[test]
    fn test_file_layer() {
        let dir = tempdir().expect("Failed to create temporary directory");
        let path = dir.path().join("findata.conf.json");
        let body =
            r#"{"news_api_key": "from-file", "log_level": "DEBUG", "volume_threshold": 2.5}"#;
        fs::write(&path, body).unwrap();

        let top = ConfigLayer {
            config_path: Some(path.clone()),
            log_level: Some("warn".into()),
            ..Default::default()
        };
        let cfg = FinDataConfig::resolve(top).unwrap();
        assert_eq!(cfg.news_api_key.as_deref(), Some("from-file"));
        assert_eq!(cfg.log_level, "warn");
        assert_eq!(cfg.volume_threshold, 2.5);
        assert_eq!(cfg.tracing_directive(), "warn");

        let missing = ConfigLayer::from_file(&dir.path().join("absent.json")).unwrap();
        assert_eq!(missing, ConfigLayer::default());
    }

    #[test]
    fn test_bad_file_is_reported() {
        let dir = tempdir().expect("Failed to create temporary directory");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(ConfigLayer::from_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validation() {
        let zero = ConfigLayer { http_timeout_secs: Some(0), ..Default::default() };
        assert!(matches!(
            FinDataConfig::from_layer(zero),
            Err(ConfigError::Invalid { field: "http_timeout_secs", .. })
        ));

        let negative = ConfigLayer { volume_threshold: Some(-1.0), ..Default::default() };
        assert!(matches!(
            FinDataConfig::from_layer(negative),
            Err(ConfigError::Invalid { field: "volume_threshold", .. })
        ));

        let level = ConfigLayer { log_level: Some("loud".into()), ..Default::default() };
        assert!(matches!(
            FinDataConfig::from_layer(level),
            Err(ConfigError::Invalid { field: "log_level", .. })
        ));

        let blank = ConfigLayer { news_api_key: Some("   ".into()), ..Default::default() };
        assert_eq!(FinDataConfig::from_layer(blank).unwrap().news_api_key, None);
    }

    #[test]
    fn test_flags_parse() {
        let parsed = EnvOnly::try_parse_from([
            "findata",
            "--news-api-key",
            "abc",
            "--http-timeout-secs",
            "7",
            "--volume-threshold",
            "2.0",
        ])
        .unwrap();
        assert_eq!(parsed.layer.news_api_key.as_deref(), Some("abc"));
        assert_eq!(parsed.layer.http_timeout_secs, Some(7));
        assert_eq!(parsed.layer.volume_threshold, Some(2.0));
    }

    #[test]
    fn test_display_masks_keys() {
        let cfg = FinDataConfig {
            news_api_key: Some("0123456789abcdef".into()),
            fred_api_key: Some("abc".into()),
            ..Default::default()
        };
        let text = cfg.to_string();
        assert!(text.contains("NewsAPI key: ****cdef"));
        assert!(text.contains("FRED key: ****"));
        assert!(text.contains("Alpha Vantage key: <unset>"));
        assert!(!text.contains("0123456789"));
    }

    #[test]
    fn test_serialization_omits_keys() {
        let cfg = FinDataConfig {
            alpha_vantage_api_key: Some("av-secret".into()),
            news_api_key: Some("news-secret".into()),
            fred_api_key: Some("fred-secret".into()),
            glassnode_api_key: Some("gn-secret".into()),
            etherscan_api_key: Some("es-secret".into()),
            whale_alert_api_key: Some("wa-secret".into()),
            sec_user_agent: Some("Desk desk@example.org".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&cfg).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.keys().all(|k| !k.ends_with("_api_key")));
        assert_eq!(value["sec_user_agent"], "Desk desk@example.org");
        assert_eq!(value["http_timeout_secs"], 15);
        assert!(!value.to_string().contains("secret"));
    }

    #[test]
    fn test_onchain_keys_layer() {
        let args = ["findata", "--glassnode-api-key", "gn", "--whale-alert-api-key", " "];
        let parsed = EnvOnly::try_parse_from(args).unwrap();
        let cfg = FinDataConfig::from_layer(parsed.layer).unwrap();
        assert_eq!(cfg.glassnode_api_key.as_deref(), Some("gn"));
        assert_eq!(cfg.whale_alert_api_key, None);
        assert!(cfg.to_string().contains("Glassnode key: ****"));
    }

    #[test]
    fn test_tracing_directives() {
        let cases =
            [("silly", "trace"), ("debug", "debug"), ("fatal", "error"), ("warning", "warn")];
        for (level, directive) in cases {
            let cfg = FinDataConfig { log_level: level.into(), ..Default::default() };
            assert_eq!(cfg.tracing_directive(), directive);
        }
    }
}
