use crate::domain::ports::KeyValueStore;
use crate::utils::error::{ClientError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// 僅存在於記憶體中的儲存，測試與一次性 CLI 執行使用
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// 將所有 key 存成 base_path 下的一份 JSON 文件
#[derive(Debug)]
pub struct FileStore {
    file_path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub const FILE_NAME: &'static str = "session.json";

    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            file_path: base_path.as_ref().join(Self::FILE_NAME),
            lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<HashMap<String, String>> {
        match tokio::fs::read(&self.file_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| ClientError::Storage {
                message: format!("Corrupt session file {}: {}", self.file_path.display(), e),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(ClientError::Io(e)),
        }
    }

    async fn write_all(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&self.file_path, data).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        if entries.remove(key).is_some() {
            self.write_all(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();

        tokio_test::block_on(async {
            assert_eq!(store.get("zurfy_token").await.unwrap(), None);
            store.set("zurfy_token", "abc").await.unwrap();
            assert_eq!(store.get("zurfy_token").await.unwrap(), Some("abc".to_string()));
            store.remove("zurfy_token").await.unwrap();
            assert_eq!(store.get("zurfy_token").await.unwrap(), None);
        });
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();

        let store = FileStore::new(temp_dir.path());
        store.set("zurfy_token", "access-1").await.unwrap();
        store.set("zurfy_refresh_token", "refresh-1").await.unwrap();

        let reopened = FileStore::new(temp_dir.path());
        assert_eq!(
            reopened.get("zurfy_token").await.unwrap(),
            Some("access-1".to_string())
        );
        assert_eq!(
            reopened.get("zurfy_refresh_token").await.unwrap(),
            Some("refresh-1".to_string())
        );

        reopened.remove("zurfy_token").await.unwrap();
        assert_eq!(store.get("zurfy_token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_missing_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("nested"));

        assert_eq!(store.get("zurfy_user").await.unwrap(), None);
        store.remove("zurfy_user").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(FileStore::FILE_NAME), b"not json").unwrap();

        let store = FileStore::new(temp_dir.path());
        let err = store.get("zurfy_token").await.unwrap_err();
        assert!(matches!(err, ClientError::Storage { .. }));
    }
}
