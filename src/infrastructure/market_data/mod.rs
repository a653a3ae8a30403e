pub mod coingecko_client;
pub mod history;
pub mod retry;

pub use coingecko_client::CoinGeckoClient;
pub use history::fetch_history;
pub use retry::{RetryPolicy, RetryingFetcher};

use async_trait::async_trait;

use crate::shared::errors::FetchError;
use crate::shared::types::Bar;

/// One OHLCV page request
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub network: String,
    pub pool_address: String,
    pub timeframe: String,
    pub aggregate: u32,
    /// Only bars strictly older than this (unix seconds)
    pub before_timestamp: Option<i64>,
    pub limit: u32,
}

impl FetchRequest {
    pub fn before(&self, before_timestamp: i64) -> Self {
        Self {
            before_timestamp: Some(before_timestamp),
            ..self.clone()
        }
    }
}

/// Source of OHLCV bars for a pool
#[async_trait]
pub trait BarFetcher: Send + Sync {
    /// Bars sorted ascending by timestamp.
    async fn fetch_bars(&self, request: &FetchRequest) -> Result<Vec<Bar>, FetchError>;
}
