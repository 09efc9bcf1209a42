//! # Options Flow Analytics
//!
//! Pure functions over the two legs of a chain: Max Pain, volume and open
//! interest aggregation, the sentiment decision table, unusual-volume alerts
//! and the largest open-interest positions. Nothing here allocates shared
//! state or performs I/O, and no input shape makes these functions fail.

use super::contract::{OptionContract, OptionType};
use crate::utils::misc::utils::round_to;
use serde::{Serialize, Serializer};

/// Underlying shares covered by one contract.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;
/// Default multiple of the average volume that counts as unusual.
pub const DEFAULT_VOLUME_THRESHOLD: f64 = 1.5;
/// Volume must be strictly above this to be flagged, whatever the average.
pub const MIN_UNUSUAL_VOLUME: u64 = 10;
/// Length cap of the alert and position lists.
pub const TOP_N: usize = 10;

/// Distinct strikes across both legs, ascending.
pub fn distinct_strikes(calls: &[OptionContract], puts: &[OptionContract]) -> Vec<f64> {
    let mut strikes: Vec<f64> = calls.iter().chain(puts.iter()).map(|c| c.strike()).collect();
    strikes.sort_by(|a, b| a.total_cmp(b));
    strikes.dedup();
    strikes
}

/// Intrinsic value option writers owe if the underlying settles at `settle`.
pub fn writer_payout(settle: f64, calls: &[OptionContract], puts: &[OptionContract]) -> f64 {
    let call_pain: f64 = calls
        .iter()
        .filter(|c| c.strike() < settle)
        .map(|c| (settle - c.strike()) * c.open_interest() as f64 * CONTRACT_MULTIPLIER)
        .sum();
    let put_pain: f64 = puts
        .iter()
        .filter(|p| p.strike() > settle)
        .map(|p| (p.strike() - settle) * p.open_interest() as f64 * CONTRACT_MULTIPLIER)
        .sum();
    call_pain + put_pain
}

/// The listed strike that minimizes [`writer_payout`].
///
/// Ties resolve to the lowest strike. Returns `0.0` for an empty chain.
pub fn max_pain(calls: &[OptionContract], puts: &[OptionContract]) -> f64 {
    let mut min_pain = f64::INFINITY;
    let mut max_pain_strike = 0.0;

    for strike in distinct_strikes(calls, puts) {
        let total = writer_payout(strike, calls, puts);
        if total < min_pain {
            min_pain = total;
            max_pain_strike = strike;
        }
    }

    max_pain_strike
}

/// A ratio whose denominator may be zero.
///
/// `Unbounded` is the explicit +infinity sentinel; it serializes as the string
/// `"Infinity"` so JSON consumers never see a non-standard number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowRatio {
    /// A finite ratio.
    Value(f64),
    /// Non-zero numerator over a zero denominator.
    Unbounded,
}

impl FlowRatio {
    /// `num / den`. `x / 0` is `Unbounded` for `x > 0` and `Value(0.0)` for `0 / 0`.
    pub fn of(num: u64, den: u64) -> Self {
        match (num, den) {
            (0, 0) => FlowRatio::Value(0.0),
            (_, 0) => FlowRatio::Unbounded,
            (n, d) => FlowRatio::Value(n as f64 / d as f64),
        }
    }

    /// The ratio as a float, with `Unbounded` mapped to `f64::INFINITY`.
    pub fn as_f64(self) -> f64 {
        match self {
            FlowRatio::Value(v) => v,
            FlowRatio::Unbounded => f64::INFINITY,
        }
    }

    /// Rounds a finite value to `places` decimals.
    pub fn rounded(self, places: u32) -> Self {
        match self {
            FlowRatio::Value(v) => FlowRatio::Value(round_to(v, places)),
            FlowRatio::Unbounded => FlowRatio::Unbounded,
        }
    }

    /// `true` for the +infinity sentinel.
    pub fn is_unbounded(self) -> bool {
        matches!(self, FlowRatio::Unbounded)
    }
}

impl Serialize for FlowRatio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FlowRatio::Value(v) => serializer.serialize_f64(*v),
            FlowRatio::Unbounded => serializer.serialize_str("Infinity"),
        }
    }
}

/// Volume and open-interest sums per leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlowTotals {
    /// Sum of call volume.
    pub call_volume: u64,
    /// Sum of put volume.
    pub put_volume: u64,
    /// Sum of call open interest.
    pub call_open_interest: u64,
    /// Sum of put open interest.
    pub put_open_interest: u64,
}

impl FlowTotals {
    /// Sums both legs.
    pub fn from_legs(calls: &[OptionContract], puts: &[OptionContract]) -> Self {
        Self {
            call_volume: calls.iter().map(|c| c.volume()).sum(),
            put_volume: puts.iter().map(|p| p.volume()).sum(),
            call_open_interest: calls.iter().map(|c| c.open_interest()).sum(),
            put_open_interest: puts.iter().map(|p| p.open_interest()).sum(),
        }
    }

    /// Calls plus puts.
    pub fn total_volume(&self) -> u64 {
        self.call_volume + self.put_volume
    }

    /// Call plus put open interest.
    pub fn total_open_interest(&self) -> u64 {
        self.call_open_interest + self.put_open_interest
    }

    /// Call volume over put volume.
    pub fn call_put_ratio(&self) -> FlowRatio {
        FlowRatio::of(self.call_volume, self.put_volume)
    }

    /// Call open interest over put open interest; `+inf` whenever put OI is zero.
    pub fn oi_ratio(&self) -> f64 {
        if self.put_open_interest == 0 {
            f64::INFINITY
        } else {
            self.call_open_interest as f64 / self.put_open_interest as f64
        }
    }
}

/// Mean implied volatility over contracts quoting a positive IV; `0.0` if none do.
pub fn average_implied_volatility(calls: &[OptionContract], puts: &[OptionContract]) -> f64 {
    let (sum, count) = calls
        .iter()
        .chain(puts.iter())
        .map(|c| c.implied_volatility())
        .filter(|iv| *iv > 0.0)
        .fold((0.0, 0usize), |(s, n), iv| (s + iv, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Direction of the positioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentBias {
    /// Calls dominate.
    Bullish,
    /// Puts dominate.
    Bearish,
    /// Neither dominates.
    Neutral,
}

/// Conviction of the positioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentStrength {
    /// Volume and open interest agree.
    Strong,
    /// Volume alone leans one way.
    Moderate,
    /// Balanced.
    Weak,
}

/// Output of [`classify_sentiment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sentiment {
    /// Direction.
    pub bias: SentimentBias,
    /// Conviction.
    pub strength: SentimentStrength,
    /// Short human readable explanation.
    pub description: &'static str,
}

/// Sentiment decision table. Rows are checked top to bottom with strict
/// inequalities; the first match wins.
///
/// | call/put ratio | OI ratio | result |
/// |---|---|---|
/// | > 1.5 | > 1.2 | BULLISH / STRONG |
/// | > 1.2 | any | BULLISH / MODERATE |
/// | < 0.7 | < 0.8 | BEARISH / STRONG |
/// | < 0.9 | any | BEARISH / MODERATE |
/// | otherwise | | NEUTRAL / WEAK |
pub fn classify_sentiment(call_put_ratio: f64, oi_ratio: f64) -> Sentiment {
    use SentimentBias::*;
    use SentimentStrength::*;

    if call_put_ratio > 1.5 && oi_ratio > 1.2 {
        Sentiment {
            bias: Bullish,
            strength: Strong,
            description: "High call volume and open interest",
        }
    } else if call_put_ratio > 1.2 {
        Sentiment {
            bias: Bullish,
            strength: Moderate,
            description: "Elevated call activity",
        }
    } else if call_put_ratio < 0.7 && oi_ratio < 0.8 {
        Sentiment {
            bias: Bearish,
            strength: Strong,
            description: "High put volume and open interest",
        }
    } else if call_put_ratio < 0.9 {
        Sentiment {
            bias: Bearish,
            strength: Moderate,
            description: "Elevated put activity",
        }
    } else {
        Sentiment {
            bias: Neutral,
            strength: Weak,
            description: "Balanced call/put activity",
        }
    }
}

/// Reading of a single unusual-volume alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivitySignal {
    /// Call struck above its last price.
    Bullish,
    /// Call struck at or below its last price.
    Speculative,
    /// Put struck below its last price.
    Bearish,
    /// Put struck at or above its last price.
    Hedge,
}

impl ActivitySignal {
    fn for_contract(contract: &OptionContract) -> Self {
        match contract.option_type() {
            OptionType::Call if contract.strike() > contract.last_price() => {
                ActivitySignal::Bullish
            }
            OptionType::Call => ActivitySignal::Speculative,
            OptionType::Put if contract.strike() < contract.last_price() => ActivitySignal::Bearish,
            OptionType::Put => ActivitySignal::Hedge,
        }
    }
}

/// A contract trading far above the chain's average volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnusualActivity {
    /// Call or put.
    #[serde(rename = "type")]
    pub option_type: OptionType,
    /// Strike price.
    pub strike: f64,
    /// Session volume.
    pub volume: u64,
    /// Open interest.
    pub open_interest: u64,
    /// Implied volatility in percent, 2 decimals.
    pub implied_volatility: f64,
    /// Reading of the flow.
    pub sentiment: ActivitySignal,
}

/// Flags contracts whose volume is at least `threshold` times the chain's mean
/// volume and above [`MIN_UNUSUAL_VOLUME`].
///
/// Calls are scanned before puts; the result is stably sorted by volume
/// (descending) and capped at [`TOP_N`]. A zero mean yields no alerts.
pub fn detect_unusual_volume(
    calls: &[OptionContract],
    puts: &[OptionContract],
    threshold: f64,
) -> Vec<UnusualActivity> {
    let count = calls.len() + puts.len();
    if count == 0 {
        return Vec::new();
    }
    let total: u64 = calls.iter().chain(puts.iter()).map(|c| c.volume()).sum();
    let avg_volume = total as f64 / count as f64;
    if avg_volume == 0.0 {
        return Vec::new();
    }

    let threshold_volume = avg_volume * threshold;

    let mut alerts: Vec<UnusualActivity> = calls
        .iter()
        .chain(puts.iter())
        .filter(|c| c.volume() as f64 >= threshold_volume && c.volume() > MIN_UNUSUAL_VOLUME)
        .map(|c| UnusualActivity {
            option_type: c.option_type(),
            strike: c.strike(),
            volume: c.volume(),
            open_interest: c.open_interest(),
            implied_volatility: round_to(c.implied_volatility() * 100.0, 2),
            sentiment: ActivitySignal::for_contract(c),
        })
        .collect();

    alerts.sort_by(|a, b| b.volume.cmp(&a.volume));
    alerts.truncate(TOP_N);
    alerts
}

/// One row of the largest-positions ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSummary {
    /// Call or put.
    #[serde(rename = "type")]
    pub option_type: OptionType,
    /// Strike price.
    pub strike: f64,
    /// Open interest.
    pub open_interest: u64,
    /// Implied volatility in percent, 2 decimals.
    pub implied_volatility: f64,
}

/// Calls then puts, stably sorted by open interest (descending), top [`TOP_N`].
pub fn find_largest_positions(
    calls: &[OptionContract],
    puts: &[OptionContract],
) -> Vec<PositionSummary> {
    let mut positions: Vec<PositionSummary> = calls
        .iter()
        .chain(puts.iter())
        .map(|c| PositionSummary {
            option_type: c.option_type(),
            strike: c.strike(),
            open_interest: c.open_interest(),
            implied_volatility: round_to(c.implied_volatility() * 100.0, 2),
        })
        .collect();

    positions.sort_by(|a, b| b.open_interest.cmp(&a.open_interest));
    positions.truncate(TOP_N);
    positions
}
