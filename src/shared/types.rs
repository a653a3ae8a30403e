//! Common types used across the application

use serde::{Deserialize, Serialize};
use std::fmt;

/// One OHLCV sample for a fixed time bucket.
///
/// `timestamp` is unix seconds (UTC). Only `close` feeds level detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Flat bar where every price field equals `close`.
    pub fn flat(timestamp: i64, close: f64) -> Self {
        Self::new(timestamp, close, close, close, close, 0.0)
    }
}

/// Stable identifier for a tracked token series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenKey(String);

impl TokenKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TokenKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A tracked token: where to fetch its bars from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedToken {
    pub symbol: String,
    pub pool_address: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
}

impl TrackedToken {
    pub fn key(&self) -> TokenKey {
        TokenKey::new(self.symbol.clone())
    }
}

/// Price zone built from clustered local minima.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportLevel {
    /// Centroid of the cluster
    pub price: f64,
    /// Number of minima merged into the cluster
    pub frequency: usize,
}

/// Emitted when the live price approaches a strong level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub token: TokenKey,
    pub level_price: f64,
    pub level_frequency: usize,
    pub current_price: f64,
    pub distance_percent: f64,
    /// Unix seconds at evaluation time
    pub timestamp: i64,
}

/// Deduplication unit: token plus level price rounded to 8 decimals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertKey(String);

impl AlertKey {
    pub fn new(token: &TokenKey, level_price: f64) -> Self {
        Self(format!("{}_{:.8}", token, level_price))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata record from the enrichment dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub fdv_usd: Option<f64>,
    #[serde(default)]
    pub price_usd: Option<f64>,
    #[serde(default)]
    pub twitter_handle: Option<String>,
    #[serde(default)]
    pub telegram_handle: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub ath_usd: Option<f64>,
    #[serde(default)]
    pub max_drawdown_percentage: Option<f64>,
    #[serde(default)]
    pub age_days: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_key_rounds_to_eight_decimals() {
        let token = TokenKey::from("PEPE");
        let a = AlertKey::new(&token, 0.000_099_800_000_1);
        let b = AlertKey::new(&token, 0.000_099_800_000_4);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "PEPE_0.00009980");
    }

    #[test]
    fn test_alert_key_is_namespaced_by_token() {
        let a = AlertKey::new(&TokenKey::from("A"), 1.5);
        let b = AlertKey::new(&TokenKey::from("B"), 1.5);
        assert_ne!(a, b);
    }
}
