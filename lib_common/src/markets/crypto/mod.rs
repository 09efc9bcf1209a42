//! # Crypto On-Chain Data
//!
//! Exchange flows (Glassnode), DeFi total value locked (DeFiLlama),
//! Ethereum gas prices (Etherscan), exchange rankings (CoinGecko) and large
//! transfers (Whale Alert). DeFiLlama and CoinGecko need no key; the other
//! providers fail with a missing-key error until one is configured.

/// Multi-provider on-chain client.
pub mod onchain;
