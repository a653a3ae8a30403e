//! Token metadata dataset (`<data_root>/token_info.json`)

use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::infrastructure::storage::JsonStore;
use crate::shared::types::TokenInfo;

const DOCUMENT: &str = "token_info";

/// Enrichment records keyed by lowercase symbol.
#[derive(Debug, Default, Clone)]
pub struct TokenInfoCatalog {
    by_symbol: HashMap<String, TokenInfo>,
}

impl TokenInfoCatalog {
    pub fn from_records(records: Vec<TokenInfo>) -> Self {
        let by_symbol = records
            .into_iter()
            .map(|r| (r.symbol.to_lowercase(), r))
            .collect();
        Self { by_symbol }
    }

    /// Missing or unreadable datasets yield an empty catalog.
    pub async fn load<P: AsRef<Path>>(data_root: P) -> Self {
        let store = JsonStore::new(data_root);
        match store.load::<Vec<TokenInfo>>(DOCUMENT).await {
            Ok(Some(records)) => {
                info!(records = records.len(), "loaded token metadata");
                Self::from_records(records)
            }
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(error = %e, "unreadable token metadata, continuing without enrichment");
                Self::default()
            }
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&TokenInfo> {
        self.by_symbol.get(&symbol.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}
