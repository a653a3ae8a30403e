//! In-memory catalog of tracked series

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::shared::types::{TokenKey, TrackedToken};

/// Handle to one tracked series. Cloning shares the write lock.
#[derive(Debug, Clone)]
pub struct SeriesHandle {
    pub token: TrackedToken,
    write_lock: Arc<Mutex<()>>,
}

impl SeriesHandle {
    pub fn new(token: TrackedToken) -> Self {
        Self {
            token,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn key(&self) -> TokenKey {
        self.token.key()
    }

    pub(crate) fn write_lock(&self) -> &Arc<Mutex<()>> {
        &self.write_lock
    }
}

/// Catalog of tracked tokens, populated once at startup.
#[derive(Debug, Default)]
pub struct TokenCatalog {
    series: BTreeMap<TokenKey, SeriesHandle>,
}

impl TokenCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tokens<I: IntoIterator<Item = TrackedToken>>(tokens: I) -> Self {
        let mut catalog = Self::new();
        for token in tokens {
            catalog.insert(token);
        }
        catalog
    }

    /// Adds a token. Re-inserting an existing key keeps its handle (and lock)
    /// but replaces the fetch coordinates.
    pub fn insert(&mut self, token: TrackedToken) -> SeriesHandle {
        let key = token.key();
        let handle = match self.series.get(&key) {
            Some(existing) => SeriesHandle {
                token,
                write_lock: existing.write_lock.clone(),
            },
            None => SeriesHandle::new(token),
        };
        self.series.insert(key, handle.clone());
        handle
    }

    pub fn get(&self, key: &TokenKey) -> Option<&SeriesHandle> {
        self.series.get(key)
    }

    /// Case-insensitive symbol lookup for CLI input.
    pub fn find_symbol(&self, symbol: &str) -> Option<&SeriesHandle> {
        self.series
            .values()
            .find(|h| h.token.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn handles(&self) -> impl Iterator<Item = &SeriesHandle> {
        self.series.values()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
