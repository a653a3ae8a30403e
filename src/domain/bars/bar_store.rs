//! Bar Store: per-token persisted history with duplicate-free append

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::catalog::SeriesHandle;
use super::merge::merge_bars;
use crate::shared::errors::StoreError;
use crate::shared::types::{Bar, TokenKey};

/// Persistence port for per-token bar tables.
#[async_trait]
pub trait SeriesRepository: Send + Sync {
    /// `Ok(None)` when the token has no table yet.
    async fn load(&self, key: &TokenKey) -> Result<Option<Vec<Bar>>, StoreError>;

    /// Replace the whole table.
    async fn save(&self, key: &TokenKey, bars: &[Bar]) -> Result<(), StoreError>;

    async fn exists(&self, key: &TokenKey) -> bool;
}

/// Result of one merge
#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    pub added: usize,
    /// Full persisted history after the merge
    pub history: Vec<Bar>,
}

/// Merges fetched bars into persisted history.
///
/// Writes for the same token are serialized through the handle's lock; different
/// tokens proceed independently.
pub struct BarStore {
    repository: Arc<dyn SeriesRepository>,
}

impl BarStore {
    pub fn new(repository: Arc<dyn SeriesRepository>) -> Self {
        Self { repository }
    }

    pub async fn merge(
        &self,
        handle: &SeriesHandle,
        new_bars: &[Bar],
    ) -> Result<MergeResult, StoreError> {
        let _guard = handle.write_lock().lock().await;
        let key = handle.key();

        let existing = self.load_or_empty(&key).await;
        let had_history = existing.as_ref().map_or(false, |h| !h.is_empty());
        let (history, added) = merge_bars(existing, new_bars);

        if added > 0 {
            self.repository.save(&key, &history).await?;
            if had_history {
                debug!(token = %key, added, total = history.len(), "appended bars");
            } else {
                info!(token = %key, added, "created bar table");
            }
        } else {
            debug!(token = %key, "no new bars");
        }

        Ok(MergeResult { added, history })
    }

    /// Read the persisted history; unreadable tables count as no history.
    pub async fn load_or_empty(&self, key: &TokenKey) -> Option<Vec<Bar>> {
        match self.repository.load(key).await {
            Ok(history) => history,
            Err(e) => {
                warn!(token = %key, error = %e, "unreadable bar table, treating as empty history");
                None
            }
        }
    }

    /// True only for a readable, non-empty table. A corrupt file counts as absent.
    pub async fn has_history(&self, key: &TokenKey) -> bool {
        if !self.repository.exists(key).await {
            return false;
        }
        self.load_or_empty(key)
            .await
            .map_or(false, |history| !history.is_empty())
    }
}
