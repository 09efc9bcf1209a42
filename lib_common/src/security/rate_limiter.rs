//! # Sliding-Window Rate Limiter
//!
//! Tracks call timestamps over a rolling `period` and rejects the call that
//! would exceed `max_calls`. The limiter never sleeps: callers get a
//! [`RateLimitExceeded`] telling them how long to wait, which maps onto the
//! free-tier quotas of the upstream providers.

use static_init::dynamic;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Returned when a call would exceed the limiter's quota.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Rate limit exceeded ({max_calls} calls per {period_secs}s). \
     Wait {wait_secs}s or upgrade your API tier."
)]
pub struct RateLimitExceeded {
    /// Quota size.
    pub max_calls: usize,
    /// Window length in seconds.
    pub period_secs: u64,
    /// Seconds until the oldest recorded call leaves the window.
    pub wait_secs: u64,
}

/// A thread-safe sliding-window rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    period: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter allowing `max_calls` within any rolling `period`.
    pub fn new(max_calls: usize, period: Duration) -> Self {
        Self {
            max_calls,
            period,
            calls: Mutex::new(VecDeque::with_capacity(max_calls)),
        }
    }

    /// Quota size.
    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    /// Window length.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Records a call now, or rejects it when the window is full.
    pub fn acquire(&self) -> Result<(), RateLimitExceeded> {
        self.acquire_at(Instant::now())
    }

    /// Number of calls still available in the current window.
    pub fn remaining(&self) -> usize {
        let now = Instant::now();
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        self.evict(&mut calls, now);
        self.max_calls.saturating_sub(calls.len())
    }

    /// Runs `fut` only if a slot is available.
    ///
    /// The slot is consumed before the future is polled, so a failing call
    /// still counts against the quota (upstreams bill attempts, not successes).
    pub async fn guard<F, T>(&self, fut: F) -> Result<T, RateLimitExceeded>
    where
        F: Future<Output = T>,
    {
        self.acquire()?;
        Ok(fut.await)
    }

    fn acquire_at(&self, now: Instant) -> Result<(), RateLimitExceeded> {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        self.evict(&mut calls, now);

        if calls.len() >= self.max_calls {
            let elapsed = calls
                .front()
                .map(|oldest| now.saturating_duration_since(*oldest))
                .unwrap_or_default();
            return Err(RateLimitExceeded {
                max_calls: self.max_calls,
                period_secs: self.period.as_secs(),
                wait_secs: self.period.saturating_sub(elapsed).as_secs(),
            });
        }

        calls.push_back(now);
        Ok(())
    }

    /// Drops timestamps that are no longer inside the window.
    fn evict(&self, calls: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = calls.front() {
            if now.saturating_duration_since(*oldest) >= self.period {
                calls.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Alpha Vantage free tier: 25 calls per day.
#[dynamic]
pub static ALPHA_VANTAGE_LIMITER: RateLimiter = RateLimiter::new(25, Duration::from_secs(86_400));

/// SEC EDGAR fair-access policy: 10 calls per minute.
#[dynamic]
pub static SEC_EDGAR_LIMITER: RateLimiter = RateLimiter::new(10, Duration::from_secs(60));

/// NewsAPI developer tier: 100 calls per day.
#[dynamic]
pub static NEWS_API_LIMITER: RateLimiter = RateLimiter::new(100, Duration::from_secs(86_400));

/// FRED: 120 calls per minute.
#[dynamic]
pub static FRED_LIMITER: RateLimiter = RateLimiter::new(120, Duration::from_secs(60));

/// CoinGecko public API: 30 calls per minute.
#[dynamic]
pub static COINGECKO_LIMITER: RateLimiter = RateLimiter::new(30, Duration::from_secs(60));

/// DeFiLlama open API, capped at 60 calls per minute.
#[dynamic]
pub static DEFILLAMA_LIMITER: RateLimiter = RateLimiter::new(60, Duration::from_secs(60));

/// Etherscan free tier: 5 calls per second.
#[dynamic]
pub static ETHERSCAN_LIMITER: RateLimiter = RateLimiter::new(5, Duration::from_secs(1));

/// Glassnode and Whale Alert free tiers: 10 calls per minute each.
#[dynamic]
pub static GLASSNODE_LIMITER: RateLimiter = RateLimiter::new(10, Duration::from_secs(60));

/// See [`GLASSNODE_LIMITER`].
#[dynamic]
pub static WHALE_ALERT_LIMITER: RateLimiter = RateLimiter::new(10, Duration::from_secs(60));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_call_over_quota() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(limiter.acquire_at(t0).is_ok());
        assert!(limiter.acquire_at(t0 + Duration::from_secs(10)).is_ok());

        let err = limiter.acquire_at(t0 + Duration::from_secs(20)).unwrap_err();
        assert_eq!(err.max_calls, 2);
        assert_eq!(err.period_secs, 60);
        assert_eq!(err.wait_secs, 40);
        assert!(err.to_string().contains("2 calls per 60s"));
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(limiter.acquire_at(t0).is_ok());
        assert!(limiter.acquire_at(t0 + Duration::from_secs(59)).is_err());
        assert!(limiter.acquire_at(t0 + Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn test_rejected_calls_are_not_recorded() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();
        limiter.acquire_at(t0).unwrap();
        for s in 1..5 {
            assert!(limiter.acquire_at(t0 + Duration::from_secs(s)).is_err());
        }
        assert!(limiter.acquire_at(t0 + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn test_presets() {
        assert_eq!(ALPHA_VANTAGE_LIMITER.max_calls(), 25);
        assert_eq!(SEC_EDGAR_LIMITER.period(), Duration::from_secs(60));
        assert_eq!(NEWS_API_LIMITER.max_calls(), 100);
        assert_eq!(FRED_LIMITER.max_calls(), 120);
        assert_eq!(COINGECKO_LIMITER.max_calls(), 30);
        assert_eq!(ETHERSCAN_LIMITER.period(), Duration::from_secs(1));
        assert_eq!(WHALE_ALERT_LIMITER.max_calls(), GLASSNODE_LIMITER.max_calls());
    }

    #[tokio::test]
    async fn test_guard_skips_future_when_exhausted() {
        let limiter = RateLimiter::new(1, Duration::from_secs(3600));
        let first = limiter.guard(async { 7 }).await;
        assert_eq!(first, Ok(7));
        assert_eq!(limiter.remaining(), 0);

        let mut ran = false;
        let second = limiter.guard(async { ran = true; }).await;
        assert!(second.is_err());
        assert!(!ran);
    }
}
