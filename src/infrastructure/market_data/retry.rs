//! Bounded retry with exponential backoff for transient fetch failures

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::warn;

use super::{BarFetcher, FetchRequest};
use crate::shared::config::MarketDataCfg;
use crate::shared::errors::FetchError;
use crate::shared::types::Bar;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &MarketDataCfg) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: Duration::from_millis(cfg.backoff_base_ms),
        }
    }

    /// `base * 2^(attempt-1)` plus up to a quarter of `base` of jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
        let jitter_cap = self.base_delay.as_millis() as u64 / 4;
        let jitter = if jitter_cap > 0 {
            rand::thread_rng().gen_range(0..=jitter_cap)
        } else {
            0
        };
        exp + Duration::from_millis(jitter)
    }
}

/// Wraps a fetcher and retries transient errors.
pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: BarFetcher> RetryingFetcher<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<F: BarFetcher> BarFetcher for RetryingFetcher<F> {
    async fn fetch_bars(&self, request: &FetchRequest) -> Result<Vec<Bar>, FetchError> {
        let mut attempt = 1;
        loop {
            match self.inner.fetch_bars(request).await {
                Ok(bars) => return Ok(bars),
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        pool = %request.pool_address,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
