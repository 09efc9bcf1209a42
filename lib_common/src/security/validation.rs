//! # Input Validation
//!
//! Checks applied to user-supplied identifiers before they are interpolated
//! into request paths or file names.
//!
//! Supported ticker shapes include US listings (`AAPL`, `BRK.B`), exchange
//! suffixes (`0700.HK`, `7203.T`, `2330.TW`, `005930.KS`, `600519.SS`),
//! indices (`^GSPC`) and futures (`ES=F`).

use super::errors::ValidationError;
use chrono::NaiveDate;
use regex::Regex;
use static_init::dynamic;

/// Default date layout accepted by [`validate_date_string`].
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

const MAX_TICKER_LEN: usize = 20;

/// Substrings that never belong in a symbol.
const DANGEROUS_FRAGMENTS: [&str; 8] = [
    "SELECT", "INSERT", "UPDATE", "DELETE", "DROP", "UNION", "--", ";",
];

/// Characters rejected outright in file names.
const UNSAFE_FILENAME_FRAGMENTS: [&str; 14] = [
    "..", "/", "\\", "~", "$", "%", "&", "*", "|", "<", ">", "`", "\"", "'",
];

#[dynamic]
static TICKER_CHARS: Option<Regex> = Regex::new(r"^[A-Z0-9\^\.=\-]+$").ok();

#[dynamic]
static FILENAME_CHARS: Option<Regex> = Regex::new(r"^[a-zA-Z0-9_\-\.]+$").ok();

/// FRED series ids: `DFF`, `CPIAUCSL`, `A191RL1Q225SBEA`.
#[dynamic]
static SERIES_ID_CHARS: Option<Regex> = Regex::new(r"^[A-Z0-9_]{1,40}$").ok();

/// Lower-case path slugs such as DeFiLlama protocol names (`aave-v3`).
#[dynamic]
static SLUG_CHARS: Option<Regex> = Regex::new(r"^[a-z0-9][a-z0-9\-\.]{0,63}$").ok();

/// Returns `true` when `ticker` (after trimming and upper-casing) is a
/// plausible market symbol.
pub fn validate_ticker(ticker: &str) -> bool {
    let ticker = ticker.trim().to_uppercase();

    let len = ticker.chars().count();
    if len == 0 || len > MAX_TICKER_LEN {
        return false;
    }

    let charset_ok = TICKER_CHARS
        .as_ref()
        .map(|re| re.is_match(&ticker))
        .unwrap_or(false);
    if !charset_ok {
        return false;
    }

    if ticker.contains("..") || ticker.contains('/') || ticker.contains('\\') {
        return false;
    }

    !DANGEROUS_FRAGMENTS.iter().any(|d| ticker.contains(d))
}

/// Trims and upper-cases `ticker`, returning it only when it validates.
pub fn sanitize_ticker(ticker: &str) -> Option<String> {
    let cleaned = ticker.trim().to_uppercase();
    if cleaned.is_empty() {
        return None;
    }
    validate_ticker(&cleaned).then_some(cleaned)
}

/// Returns `true` when `date_str` parses with the chrono `format`.
pub fn validate_date_string(date_str: &str, format: &str) -> bool {
    !date_str.is_empty() && NaiveDate::parse_from_str(date_str, format).is_ok()
}

/// Returns `true` when `value` parses as a number inside the optional bounds.
pub fn validate_numeric(value: &str, min_val: Option<f64>, max_val: Option<f64>) -> bool {
    let Ok(num) = value.trim().parse::<f64>() else {
        return false;
    };
    if let Some(min) = min_val {
        if num < min {
            return false;
        }
    }
    if let Some(max) = max_val {
        if num > max {
            return false;
        }
    }
    true
}

/// Trims and upper-cases a FRED series id, returning it only when it is
/// alphanumeric (underscores allowed) and at most 40 characters.
pub fn sanitize_series_id(series_id: &str) -> Option<String> {
    let cleaned = series_id.trim().to_uppercase();
    SERIES_ID_CHARS
        .as_ref()
        .filter(|re| re.is_match(&cleaned))
        .map(|_| cleaned)
}

/// Trims and lower-cases a URL slug. Dots are allowed but not `..`.
pub fn sanitize_slug(slug: &str) -> Option<String> {
    let cleaned = slug.trim().to_lowercase();
    if cleaned.contains("..") {
        return None;
    }
    SLUG_CHARS.as_ref().filter(|re| re.is_match(&cleaned)).map(|_| cleaned)
}

/// Rejects `value` outside `min..=max` with [`ValidationError::OutOfRange`].
pub fn ensure_range(
    name: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, ValidationError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange { name, value, min, max })
    }
}

/// Returns `true` when `filename` cannot escape its directory or smuggle shell
/// metacharacters.
pub fn is_safe_filename(filename: &str) -> bool {
    if filename.is_empty() {
        return false;
    }
    if UNSAFE_FILENAME_FRAGMENTS.iter().any(|p| filename.contains(p)) {
        return false;
    }
    FILENAME_CHARS
        .as_ref()
        .map(|re| re.is_match(filename))
        .unwrap_or(false)
}

/// Caps `value` at `max_length` characters, appending a `... [truncated]` marker.
pub fn truncate_string(value: &str, max_length: usize) -> String {
    if value.chars().count() <= max_length {
        return value.to_string();
    }
    let head: String = value.chars().take(max_length).collect();
    format!("{}... [truncated]", head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_tickers_across_markets() {
        let valid = [
            "AAPL",
            "brk.b",
            " 0700.HK ",
            "7203.T",
            "005930.KS",
            "600519.SS",
            "^GSPC",
            "ES=F",
            "BF-A",
        ];
        for t in valid {
            assert!(validate_ticker(t), "{} should be valid", t);
        }
    }

    #[test]
    fn test_rejected_tickers() {
        let too_long = "A".repeat(21);
        let rejected = [
            "",
            "   ",
            "AA PL",
            "../etc",
            "A..B",
            "AAPL;",
            "DROPX",
            "A--B",
            "SELECT",
            too_long.as_str(),
            "$AAPL",
        ];
        for t in rejected {
            assert!(!validate_ticker(t), "{:?} should be rejected", t);
        }
    }

    #[test]
    fn test_sanitize_ticker_normalizes_case() {
        assert_eq!(sanitize_ticker("  msft "), Some("MSFT".to_string()));
        assert_eq!(sanitize_ticker("ms/ft"), None);
        assert_eq!(sanitize_ticker(""), None);
    }

    #[test]
    fn test_date_validation() {
        assert!(validate_date_string("2024-01-19", DEFAULT_DATE_FORMAT));
        assert!(!validate_date_string("2024-13-01", DEFAULT_DATE_FORMAT));
        assert!(!validate_date_string("", DEFAULT_DATE_FORMAT));
        assert!(validate_date_string("01/19/2024", "%m/%d/%Y"));
    }

    #[test]
    fn test_numeric_bounds() {
        assert!(validate_numeric("1.5", Some(0.0), Some(10.0)));
        assert!(validate_numeric(" 42 ", None, None));
        assert!(!validate_numeric("-1", Some(0.0), None));
        assert!(!validate_numeric("11", None, Some(10.0)));
        assert!(!validate_numeric("abc", None, None));
    }

    #[test]
    fn test_filenames() {
        assert!(is_safe_filename("aapl_options-2024.json"));
        assert!(!is_safe_filename("../secrets"));
        assert!(!is_safe_filename("a b.txt"));
        assert!(!is_safe_filename("$(rm).sh"));
        assert!(!is_safe_filename(""));
    }

    #[test]
    fn test_series_ids_and_slugs() {
        assert_eq!(sanitize_series_id(" dff "), Some("DFF".to_string()));
        assert_eq!(sanitize_series_id("A191RL1Q225SBEA"), Some("A191RL1Q225SBEA".to_string()));
        assert_eq!(sanitize_series_id("DFF&api_key=x"), None);
        assert_eq!(sanitize_series_id(""), None);

        assert_eq!(sanitize_slug("Aave-V3"), Some("aave-v3".to_string()));
        assert_eq!(sanitize_slug("uniswap.v2"), Some("uniswap.v2".to_string()));
        assert_eq!(sanitize_slug("../admin"), None);
        assert_eq!(sanitize_slug("a..b"), None);
        assert_eq!(sanitize_slug("lido?x=1"), None);
    }

    #[test]
    fn test_ensure_range() {
        assert_eq!(ensure_range("days", 30.0, 1.0, 5000.0), Ok(30.0));
        assert_eq!(
            ensure_range("days", 0.0, 1.0, 5000.0),
            Err(ValidationError::OutOfRange { name: "days", value: 0.0, min: 1.0, max: 5000.0 })
        );
        assert!(ensure_range("limit", f64::NAN, 1.0, 10.0).is_err());
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("abcdefghij", 4), "abcd... [truncated]");
        assert_eq!(truncate_string("ééééé", 2), "éé... [truncated]");
    }
}
