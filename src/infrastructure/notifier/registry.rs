//! Registered notification destinations (`<data_root>/chat_ids.json`)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::infrastructure::storage::JsonStore;
use crate::shared::errors::StoreError;

const DOCUMENT: &str = "chat_ids";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationMeta {
    pub registered_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

pub struct DestinationRegistry {
    store: JsonStore,
    destinations: BTreeMap<String, DestinationMeta>,
}

impl DestinationRegistry {
    pub async fn load<P: AsRef<Path>>(data_root: P) -> Result<Self, StoreError> {
        let store = JsonStore::new(data_root);
        let destinations: BTreeMap<String, DestinationMeta> =
            store.load(DOCUMENT).await?.unwrap_or_default();
        Ok(Self {
            store,
            destinations,
        })
    }

    pub fn ids(&self) -> Vec<String> {
        self.destinations.keys().cloned().collect()
    }

    pub fn entries(&self) -> &BTreeMap<String, DestinationMeta> {
        &self.destinations
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    /// Returns false when the id was already registered.
    pub fn add(&mut self, id: &str, label: Option<String>, now: i64) -> bool {
        if self.destinations.contains_key(id) {
            return false;
        }
        self.destinations.insert(
            id.to_string(),
            DestinationMeta {
                registered_at: now,
                label,
            },
        );
        info!(destination = id, "registered destination");
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.destinations.remove(id).is_some()
    }

    pub async fn save(&self) -> Result<(), StoreError> {
        self.store.save(DOCUMENT, &self.destinations).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_add_remove_persist() {
        let dir = TempDir::new().unwrap();
        let mut registry = DestinationRegistry::load(dir.path()).await.unwrap();
        assert!(registry.is_empty());

        assert!(registry.add("42", Some("ops".into()), 100));
        assert!(!registry.add("42", None, 200));
        assert!(registry.add("-1001", None, 300));
        assert!(registry.remove("-1001"));
        assert!(!registry.remove("missing"));
        registry.save().await.unwrap();

        let reloaded = DestinationRegistry::load(dir.path()).await.unwrap();
        assert_eq!(reloaded.ids(), vec!["42".to_string()]);
        assert_eq!(reloaded.entries()["42"].registered_at, 100);
        assert_eq!(reloaded.entries()["42"].label.as_deref(), Some("ops"));
    }
}
