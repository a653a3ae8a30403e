//! Append-only log of delivered alerts

use chrono::{TimeZone, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::shared::errors::StoreError;
use crate::shared::types::AlertRecord;

#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    alerted_at: String,
    timestamp: i64,
    token: &'a str,
    current_price: f64,
    level_price: f64,
    level_frequency: usize,
    distance_percent: f64,
    strength: f64,
}

pub struct AlertHistoryLog {
    path: PathBuf,
}

impl AlertHistoryLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header is written only when the file is created.
    pub async fn append(&self, record: &AlertRecord, strength: f64) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let is_new = fs::metadata(&self.path).await.is_err();

        let alerted_at = Utc
            .timestamp_opt(record.timestamp, 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let row = HistoryRow {
            alerted_at,
            timestamp: record.timestamp,
            token: record.token.as_str(),
            current_price: record.current_price,
            level_price: record.level_price,
            level_frequency: record.level_frequency,
            distance_percent: record.distance_percent,
            strength,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(Vec::new());
        writer.serialize(&row)?;
        let bytes = writer
            .into_inner()
            .map_err(|e| StoreError::Io(e.into_error()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(())
    }
}
