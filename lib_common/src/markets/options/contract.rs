//! # Option Contracts and Chains
//!
//! Validated, immutable records produced by chain ingestion and consumed by the
//! analytics in [`super::analytics`]. Construction is the only place where input
//! can be rejected; once a chain exists every analytic is total.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    /// Right to buy.
    Call,
    /// Right to sell.
    Put,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionType::Call => write!(f, "CALL"),
            OptionType::Put => write!(f, "PUT"),
        }
    }
}

/// A contract record violated one of its invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractError {
    /// Strike must be strictly positive (and finite).
    #[error("contract {symbol}: strike must be > 0, got {strike}")]
    NonPositiveStrike {
        /// Contract symbol.
        symbol: String,
        /// Rejected strike.
        strike: f64,
    },

    /// Implied volatility must be finite and non-negative.
    #[error("contract {symbol}: implied volatility must be >= 0, got {value}")]
    NegativeImpliedVolatility {
        /// Contract symbol.
        symbol: String,
        /// Rejected value.
        value: f64,
    },

    /// Prices (last, bid, ask) must be finite and non-negative.
    #[error("contract {symbol}: {field} must be >= 0, got {value}")]
    NegativePrice {
        /// Contract symbol.
        symbol: String,
        /// Which price.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// Volume and open interest are counts.
    #[error("contract {symbol}: {field} must be a non-negative count, got {value}")]
    NegativeCount {
        /// Contract symbol.
        symbol: String,
        /// Which count.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// A required upstream field was absent.
    #[error("contract {symbol}: missing required field {field}")]
    MissingField {
        /// Contract symbol (may be empty when the symbol itself is missing).
        symbol: String,
        /// Field name as it appears upstream.
        field: &'static str,
    },
}

/// Why a chain could not be produced. This is the value the flow analysis
/// forwards unchanged when ingestion fails.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    /// The upstream had no chain for the symbol.
    #[error("No options data found for {ticker}")]
    NoData {
        /// Requested symbol.
        ticker: String,
    },

    /// The symbol has no listed expirations.
    #[error("No options expirations found for {ticker}")]
    NoExpirations {
        /// Requested symbol.
        ticker: String,
    },

    /// The requested expiration is not listed. `available` holds the first few.
    #[error("Invalid expiration {requested}. Available: {}", format_dates(.available))]
    InvalidExpiration {
        /// Requested date.
        requested: NaiveDate,
        /// Listed dates (truncated).
        available: Vec<NaiveDate>,
    },

    /// A contract's expiration differs from the chain's.
    #[error("contract {symbol} expires {found}, chain expires {expected}")]
    MixedExpiration {
        /// Contract symbol.
        symbol: String,
        /// Chain expiration.
        expected: NaiveDate,
        /// Contract expiration.
        found: NaiveDate,
    },

    /// A contract was placed in the wrong leg.
    #[error("contract {symbol} placed in the {expected} leg but is not a {expected}")]
    WrongLeg {
        /// Contract symbol.
        symbol: String,
        /// The leg it was found in.
        expected: OptionType,
    },

    /// The symbol failed validation before any request was made.
    #[error("Invalid ticker symbol: {0:?}")]
    InvalidTicker(String),

    /// A contract record was rejected.
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Transport or upstream failure while fetching.
    #[error("Error fetching options: {0}")]
    Fetch(String),

    /// The payload did not have the expected shape.
    #[error("Unexpected options payload: {0}")]
    Schema(String),
}

fn format_dates(dates: &[NaiveDate]) -> String {
    dates
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One exchange-listed option.
///
/// Fields are private; build through [`OptionContract::builder`] so that the
/// invariants (strike > 0, prices and IV >= 0) always hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionContract {
    symbol: String,
    strike: f64,
    expiration: NaiveDate,
    option_type: OptionType,
    last_price: f64,
    bid: f64,
    ask: f64,
    volume: u64,
    open_interest: u64,
    implied_volatility: f64,
    delta: Option<f64>,
    gamma: Option<f64>,
    theta: Option<f64>,
    vega: Option<f64>,
}

impl OptionContract {
    /// Starts a contract with its identifying fields. Everything else defaults
    /// to zero / absent.
    pub fn builder(
        symbol: impl Into<String>,
        option_type: OptionType,
        strike: f64,
        expiration: NaiveDate,
    ) -> OptionContractBuilder {
        OptionContractBuilder {
            inner: OptionContract {
                symbol: symbol.into(),
                strike,
                expiration,
                option_type,
                last_price: 0.0,
                bid: 0.0,
                ask: 0.0,
                volume: 0,
                open_interest: 0,
                implied_volatility: 0.0,
                delta: None,
                gamma: None,
                theta: None,
                vega: None,
            },
        }
    }

    /// Exchange contract symbol (e.g. `AAPL240119C00150000`).
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
    /// Strike price.
    pub fn strike(&self) -> f64 {
        self.strike
    }
    /// Expiration date.
    pub fn expiration(&self) -> NaiveDate {
        self.expiration
    }
    /// Call or put.
    pub fn option_type(&self) -> OptionType {
        self.option_type
    }
    /// Last traded premium.
    pub fn last_price(&self) -> f64 {
        self.last_price
    }
    /// Best bid.
    pub fn bid(&self) -> f64 {
        self.bid
    }
    /// Best ask.
    pub fn ask(&self) -> f64 {
        self.ask
    }
    /// Contracts traded in the current session.
    pub fn volume(&self) -> u64 {
        self.volume
    }
    /// Outstanding contracts.
    pub fn open_interest(&self) -> u64 {
        self.open_interest
    }
    /// Implied volatility as a fraction (0.25 = 25%).
    pub fn implied_volatility(&self) -> f64 {
        self.implied_volatility
    }
    /// Delta, when the upstream provides greeks.
    pub fn delta(&self) -> Option<f64> {
        self.delta
    }
    /// Gamma, when the upstream provides greeks.
    pub fn gamma(&self) -> Option<f64> {
        self.gamma
    }
    /// Theta, when the upstream provides greeks.
    pub fn theta(&self) -> Option<f64> {
        self.theta
    }
    /// Vega, when the upstream provides greeks.
    pub fn vega(&self) -> Option<f64> {
        self.vega
    }
}

/// Builder returned by [`OptionContract::builder`].
#[derive(Debug, Clone)]
pub struct OptionContractBuilder {
    inner: OptionContract,
}

impl OptionContractBuilder {
    /// Last, bid and ask prices.
    pub fn prices(mut self, last_price: f64, bid: f64, ask: f64) -> Self {
        self.inner.last_price = last_price;
        self.inner.bid = bid;
        self.inner.ask = ask;
        self
    }

    /// Session volume and open interest.
    pub fn activity(mut self, volume: u64, open_interest: u64) -> Self {
        self.inner.volume = volume;
        self.inner.open_interest = open_interest;
        self
    }

    /// Implied volatility as a fraction.
    pub fn implied_volatility(mut self, iv: f64) -> Self {
        self.inner.implied_volatility = iv;
        self
    }

    /// Optional greeks.
    pub fn greeks(
        mut self,
        delta: Option<f64>,
        gamma: Option<f64>,
        theta: Option<f64>,
        vega: Option<f64>,
    ) -> Self {
        self.inner.delta = delta;
        self.inner.gamma = gamma;
        self.inner.theta = theta;
        self.inner.vega = vega;
        self
    }

    /// Validates and returns the contract.
    pub fn build(self) -> Result<OptionContract, ContractError> {
        let c = self.inner;

        if !(c.strike.is_finite() && c.strike > 0.0) {
            return Err(ContractError::NonPositiveStrike { symbol: c.symbol, strike: c.strike });
        }
        if !(c.implied_volatility.is_finite() && c.implied_volatility >= 0.0) {
            return Err(ContractError::NegativeImpliedVolatility {
                symbol: c.symbol,
                value: c.implied_volatility,
            });
        }
        for (field, value) in [("last_price", c.last_price), ("bid", c.bid), ("ask", c.ask)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ContractError::NegativePrice { symbol: c.symbol, field, value });
            }
        }

        Ok(c)
    }
}

/// A single-expiration options chain snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionsChain {
    ticker: String,
    expiration: NaiveDate,
    underlying_price: Option<f64>,
    calls: Vec<OptionContract>,
    puts: Vec<OptionContract>,
    available_expirations: Vec<NaiveDate>,
}

impl OptionsChain {
    /// Assembles a chain, checking that every contract sits in the right leg
    /// and shares the chain's expiration.
    pub fn new(
        ticker: impl Into<String>,
        expiration: NaiveDate,
        underlying_price: Option<f64>,
        calls: Vec<OptionContract>,
        puts: Vec<OptionContract>,
        available_expirations: Vec<NaiveDate>,
    ) -> Result<Self, ChainError> {
        for (leg, expected) in [(&calls, OptionType::Call), (&puts, OptionType::Put)] {
            for contract in leg.iter() {
                if contract.option_type != expected {
                    return Err(ChainError::WrongLeg { symbol: contract.symbol.clone(), expected });
                }
                if contract.expiration != expiration {
                    return Err(ChainError::MixedExpiration {
                        symbol: contract.symbol.clone(),
                        expected: expiration,
                        found: contract.expiration,
                    });
                }
            }
        }

        Ok(Self {
            ticker: ticker.into(),
            expiration,
            underlying_price,
            calls,
            puts,
            available_expirations,
        })
    }

    /// Underlying symbol.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }
    /// Shared expiration of every contract.
    pub fn expiration(&self) -> NaiveDate {
        self.expiration
    }
    /// Spot price of the underlying, when the upstream quoted one.
    pub fn underlying_price(&self) -> Option<f64> {
        self.underlying_price
    }
    /// Call leg in upstream order.
    pub fn calls(&self) -> &[OptionContract] {
        &self.calls
    }
    /// Put leg in upstream order.
    pub fn puts(&self) -> &[OptionContract] {
        &self.puts
    }
    /// Other listed expirations.
    pub fn available_expirations(&self) -> &[NaiveDate] {
        &self.available_expirations
    }
    /// `true` when neither leg has a contract.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 19).unwrap()
    }

    #[test]
    fn test_builder_accepts_valid_contract() {
        let c = OptionContract::builder("AAPL240119C00150000", OptionType::Call, 150.0, exp())
            .prices(2.5, 2.4, 2.6)
            .activity(120, 900)
            .implied_volatility(0.31)
            .greeks(Some(0.45), None, Some(-0.05), None)
            .build()
            .unwrap();
        assert_eq!(c.strike(), 150.0);
        assert_eq!(c.volume(), 120);
        assert_eq!(c.delta(), Some(0.45));
        assert_eq!(c.gamma(), None);
    }

    #[test]
    fn test_builder_rejects_invariant_violations() {
        let zero = OptionContract::builder("X", OptionType::Put, 0.0, exp()).build();
        assert!(matches!(zero, Err(ContractError::NonPositiveStrike { .. })));

        let nan = OptionContract::builder("X", OptionType::Put, f64::NAN, exp()).build();
        assert!(matches!(nan, Err(ContractError::NonPositiveStrike { .. })));

        let iv = OptionContract::builder("X", OptionType::Put, 10.0, exp())
            .implied_volatility(-0.1)
            .build();
        assert!(matches!(iv, Err(ContractError::NegativeImpliedVolatility { .. })));

        let bid = OptionContract::builder("X", OptionType::Put, 10.0, exp())
            .prices(1.0, -1.0, 1.0)
            .build();
        assert_eq!(
            bid,
            Err(ContractError::NegativePrice { symbol: "X".into(), field: "bid", value: -1.0 })
        );
    }

    #[test]
    fn test_chain_rejects_mixed_expiration() {
        let other = NaiveDate::from_ymd_opt(2024, 2, 16).unwrap();
        let call = OptionContract::builder("C1", OptionType::Call, 100.0, other).build().unwrap();
        let err = OptionsChain::new("AAPL", exp(), Some(100.0), vec![call], vec![], vec![])
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::MixedExpiration { symbol: "C1".into(), expected: exp(), found: other }
        );
    }

    #[test]
    fn test_chain_rejects_wrong_leg() {
        let put = OptionContract::builder("P1", OptionType::Put, 100.0, exp()).build().unwrap();
        let err = OptionsChain::new("AAPL", exp(), None, vec![put], vec![], vec![]).unwrap_err();
        assert!(matches!(err, ChainError::WrongLeg { expected: OptionType::Call, .. }));
    }

    #[test]
    fn test_invalid_expiration_message_lists_dates() {
        let err = ChainError::InvalidExpiration {
            requested: exp(),
            available: vec![NaiveDate::from_ymd_opt(2024, 1, 26).unwrap()],
        };
        assert_eq!(err.to_string(), "Invalid expiration 2024-01-19. Available: 2024-01-26");
    }
}
