use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::shared::errors::StoreError;

/// JSON documents in a directory, written via a `.tmp` sibling and rename.
#[derive(Debug, Clone)]
pub struct JsonStore {
    pub base_dir: PathBuf,
}

impl JsonStore {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", filename))
    }

    pub async fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_dir).await?;
        let final_path = self.path_for(filename);
        let tmp_path = self.base_dir.join(format!("{}.json.tmp", filename));

        let json_bytes = serde_json::to_vec_pretty(data)?;
        fs::write(&tmp_path, json_bytes).await?;
        fs::rename(tmp_path, final_path).await?;
        Ok(())
    }

    /// `Ok(None)` when the document does not exist.
    pub async fn load<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>, StoreError> {
        let content = match fs::read(self.path_for(filename)).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&content)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_load_and_missing() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());

        let missing: Option<BTreeMap<String, i64>> = store.load("nothing").await.unwrap();
        assert!(missing.is_none());

        let mut doc = BTreeMap::new();
        doc.insert("a".to_string(), 1i64);
        store.save("doc", &doc).await.unwrap();

        let loaded: BTreeMap<String, i64> = store.load("doc").await.unwrap().unwrap();
        assert_eq!(loaded, doc);
        assert!(!dir.path().join("doc.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let store = JsonStore::new(dir.path());
        let result: Result<Option<Vec<u8>>, _> = store.load("bad").await;
        assert!(matches!(result, Err(StoreError::Json(_))));
    }
}
