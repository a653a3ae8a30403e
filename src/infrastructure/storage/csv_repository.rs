//! Per-token CSV bar tables under `<data_root>/token/`

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::bars::SeriesRepository;
use crate::shared::errors::StoreError;
use crate::shared::types::{Bar, TokenKey};

const COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

pub struct CsvSeriesRepository {
    dir: PathBuf,
}

impl CsvSeriesRepository {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &TokenKey) -> PathBuf {
        self.dir.join(format!("{}.csv", key))
    }
}

#[async_trait]
impl SeriesRepository for CsvSeriesRepository {
    async fn load(&self, key: &TokenKey) -> Result<Option<Vec<Bar>>, StoreError> {
        let path = self.path_for(key);
        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        parse_table(&content, &path).map(Some)
    }

    async fn save(&self, key: &TokenKey, bars: &[Bar]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;
        let final_path = self.path_for(key);
        let tmp_path = self.dir.join(format!("{}.csv.tmp", key));

        let bytes = encode_table(bars)?;
        fs::write(&tmp_path, bytes).await?;
        fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }

    async fn exists(&self, key: &TokenKey) -> bool {
        fs::metadata(self.path_for(key)).await.is_ok()
    }
}

fn encode_table(bars: &[Bar]) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for bar in bars {
        writer.write_record(&[
            bar.timestamp.to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))
}

/// Columns are located by header name; extra columns are ignored.
fn parse_table(content: &[u8], path: &Path) -> Result<Vec<Bar>, StoreError> {
    let malformed = |reason: String| StoreError::Malformed {
        path: path.display().to_string(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new().from_reader(content);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut idx = [0usize; 6];
    for (slot, name) in idx.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| malformed(format!("missing column {}", name)))?;
    }

    let mut bars = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let bad = |i: usize| malformed(format!("row {}: bad {}", line + 1, COLUMNS[i]));
        let field = |i: usize| -> Result<f64, StoreError> {
            record
                .get(idx[i])
                .and_then(|v| v.trim().parse::<f64>().ok())
                .ok_or_else(|| bad(i))
        };
        let timestamp = record
            .get(idx[0])
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| bad(0))?;
        bars.push(Bar::new(
            timestamp,
            field(1)?,
            field(2)?,
            field(3)?,
            field(4)?,
            field(5)?,
        ));
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let repo = CsvSeriesRepository::new(dir.path().join("token"));
        let key = TokenKey::from("BONK");
        let bars = vec![
            Bar::new(900, 1.0, 2.0, 0.5, 1.5, 10.0),
            Bar::new(1800, 1.5, 1.6, 0.000_012_3, 0.000_099_8, 0.0),
        ];

        assert!(repo.load(&key).await.unwrap().is_none());
        assert!(!repo.exists(&key).await);

        repo.save(&key, &bars).await.unwrap();
        assert!(repo.exists(&key).await);
        assert_eq!(repo.load(&key).await.unwrap().unwrap(), bars);
        assert!(!dir.path().join("token/BONK.csv.tmp").exists());

        let raw = std::fs::read_to_string(repo.path_for(&key)).unwrap();
        assert!(raw.starts_with("timestamp,open,high,low,close,volume\n"));
    }

    #[tokio::test]
    async fn test_missing_column_is_malformed() {
        let dir = TempDir::new().unwrap();
        let repo = CsvSeriesRepository::new(dir.path());
        std::fs::write(dir.path().join("X.csv"), "timestamp,open,high,low,volume\n1,1,1,1,1\n")
            .unwrap();

        let err = repo.load(&TokenKey::from("X")).await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_bad_number_is_malformed() {
        let dir = TempDir::new().unwrap();
        let repo = CsvSeriesRepository::new(dir.path());
        std::fs::write(
            dir.path().join("X.csv"),
            "timestamp,open,high,low,close,volume\n1,1,1,1,oops,1\n",
        )
        .unwrap();

        assert!(repo.load(&TokenKey::from("X")).await.is_err());
    }

    #[tokio::test]
    async fn test_fractional_timestamp_is_malformed() {
        let dir = TempDir::new().unwrap();
        let repo = CsvSeriesRepository::new(dir.path());
        std::fs::write(
            dir.path().join("X.csv"),
            "timestamp,open,high,low,close,volume
900.5,1,1,1,1,1
",
        )
        .unwrap();

        let err = repo.load(&TokenKey::from("X")).await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_reordered_columns_are_accepted() {
        let dir = TempDir::new().unwrap();
        let repo = CsvSeriesRepository::new(dir.path());
        std::fs::write(
            dir.path().join("X.csv"),
            "close,timestamp,open,high,low,volume,extra\n2.5,900,1,3,0.5,7,zz\n",
        )
        .unwrap();

        let bars = repo.load(&TokenKey::from("X")).await.unwrap().unwrap();
        assert_eq!(bars, vec![Bar::new(900, 1.0, 3.0, 0.5, 2.5, 7.0)]);
    }
}
