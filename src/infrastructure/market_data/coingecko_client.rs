//! CoinGecko on-chain OHLCV client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{BarFetcher, FetchRequest};
use crate::shared::config::MarketDataCfg;
use crate::shared::errors::FetchError;
use crate::shared::types::Bar;

const API_KEY_HEADER: &str = "x-cg-pro-api-key";

pub struct CoinGeckoClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(cfg: &MarketDataCfg) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        Ok(Self {
            http_client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        })
    }

    fn ohlcv_url(&self, request: &FetchRequest) -> String {
        format!(
            "{}/onchain/networks/{}/pools/{}/ohlcv/{}",
            self.base_url, request.network, request.pool_address, request.timeframe
        )
    }
}

#[async_trait]
impl BarFetcher for CoinGeckoClient {
    async fn fetch_bars(&self, request: &FetchRequest) -> Result<Vec<Bar>, FetchError> {
        let url = self.ohlcv_url(request);

        let mut query: Vec<(&str, String)> = vec![
            ("aggregate", request.aggregate.to_string()),
            ("limit", request.limit.to_string()),
        ];
        if let Some(before) = request.before_timestamp {
            query.push(("before_timestamp", before.to_string()));
        }

        let mut req = self
            .http_client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&query);
        if let Some(key) = &self.api_key {
            req = req.header(API_KEY_HEADER, key);
        }

        debug!(pool = %request.pool_address, before = ?request.before_timestamp, "fetching OHLCV");
        let response = req.send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response.json().await?;
        parse_ohlcv(&data)
    }
}

/// Parse `data.attributes.ohlcv_list` rows of `[ts, o, h, l, c, v]`.
pub fn parse_ohlcv(data: &Value) -> Result<Vec<Bar>, FetchError> {
    let rows = data
        .get("data")
        .and_then(|d| d.get("attributes"))
        .and_then(|a| a.get("ohlcv_list"))
        .and_then(|l| l.as_array())
        .ok_or_else(|| FetchError::MalformedPayload("missing data.attributes.ohlcv_list".into()))?;

    let mut bars = rows
        .iter()
        .enumerate()
        .map(|(i, row)| parse_row(row).ok_or_else(|| {
            FetchError::MalformedPayload(format!("row {} is not [ts,o,h,l,c,v]: {}", i, row))
        }))
        .collect::<Result<Vec<_>, _>>()?;

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

fn parse_row(row: &Value) -> Option<Bar> {
    let fields = row.as_array()?;
    if fields.len() < 6 {
        return None;
    }
    let num = |i: usize| lenient_f64(&fields[i]);
    Some(Bar::new(
        num(0).map(|ts| ts as i64)?,
        num(1)?,
        num(2)?,
        num(3)?,
        num(4)?,
        num(5)?,
    ))
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn lenient_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ohlcv_sorts_and_accepts_strings() {
        let payload = json!({
            "data": { "attributes": { "ohlcv_list": [
                [1_700_000_900, "0.00010", 0.00011, 0.00009, "0.000101", 1234.5],
                [1_700_000_000, 1.0, 2.0, 0.5, 1.5, 10]
            ]}}
        });
        let bars = parse_ohlcv(&payload).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, 1_700_000_000);
        assert_eq!(bars[1].close, 0.000101);
        assert_eq!(bars[1].open, 0.0001);
    }

    #[test]
    fn test_parse_ohlcv_missing_path_is_malformed() {
        let err = parse_ohlcv(&json!({"data": {}})).unwrap_err();
        assert!(matches!(err, FetchError::MalformedPayload(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_parse_ohlcv_rejects_short_rows() {
        let payload = json!({"data": {"attributes": {"ohlcv_list": [[1, 2, 3]]}}});
        assert!(parse_ohlcv(&payload).is_err());
    }

    #[test]
    fn test_empty_list_is_not_an_error() {
        let payload = json!({"data": {"attributes": {"ohlcv_list": []}}});
        assert!(parse_ohlcv(&payload).unwrap().is_empty());
    }

    #[test]
    fn test_ohlcv_url() {
        let client = CoinGeckoClient::new(&MarketDataCfg::default()).unwrap();
        let request = FetchRequest {
            network: "solana".into(),
            pool_address: "PooL".into(),
            timeframe: "minute".into(),
            aggregate: 15,
            before_timestamp: None,
            limit: 10,
        };
        assert_eq!(
            client.ohlcv_url(&request),
            "https://pro-api.coingecko.com/api/v3/onchain/networks/solana/pools/PooL/ohlcv/minute"
        );
    }
}
