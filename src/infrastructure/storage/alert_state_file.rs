use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

use super::json_store::JsonStore;
use crate::domain::alerts::{AlertStateStore, InMemoryAlertStateStore};
use crate::shared::errors::StoreError;
use crate::shared::types::AlertKey;

const DOCUMENT: &str = "alert_state";

/// `<data_root>/alert_state.json`: alert key -> last fired unix seconds.
pub struct AlertStateFile {
    store: JsonStore,
}

impl AlertStateFile {
    pub fn new<P: AsRef<Path>>(data_root: P) -> Self {
        Self {
            store: JsonStore::new(data_root),
        }
    }

    /// Missing or unreadable state starts empty.
    pub async fn load(&self) -> InMemoryAlertStateStore {
        match self.store.load::<BTreeMap<AlertKey, i64>>(DOCUMENT).await {
            Ok(Some(entries)) => InMemoryAlertStateStore::from_entries(entries),
            Ok(None) => InMemoryAlertStateStore::new(),
            Err(e) => {
                warn!(error = %e, "unreadable alert state, starting empty");
                InMemoryAlertStateStore::new()
            }
        }
    }

    pub async fn save(&self, state: &dyn AlertStateStore) -> Result<(), StoreError> {
        let entries: BTreeMap<AlertKey, i64> = state.entries().into_iter().collect();
        self.store.save(DOCUMENT, &entries).await
    }
}
