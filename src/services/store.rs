use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

/// JSON-file-backed key-value store with typed get/set/remove.
///
/// The whole document lives in memory behind an `RwLock` and is rewritten
/// to disk on every mutation via write-to-temp + atomic rename, so a crash
/// mid-write never leaves a truncated store behind. Values are opaque JSON;
/// callers pick the type at the call site.
#[derive(Clone)]
pub struct StoreService {
    path: PathBuf,
    data: Arc<RwLock<HashMap<String, serde_json::Value>>>,
}

impl StoreService {
    /// Open (or create) the store under `data_dir`.
    pub async fn open(data_dir: &str) -> Result<Self> {
        let dir = PathBuf::from(data_dir);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create data dir {}", dir.display()))?;

        let path = dir.join("store.json");
        let data = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Corrupt store file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e).context("Failed to read store file"),
        };

        Ok(Self {
            path,
            data: Arc::new(RwLock::new(data)),
        })
    }

    /// Read and deserialize a value. `None` when the key is absent or the
    /// stored value does not match `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let data = self.data.read().await;
        let value = data.get(key)?.clone();
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                tracing::warn!("Stored value under '{}' has unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Serialize and persist a value under `key`.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_value(value).context("Failed to serialize store value")?;
        let mut data = self.data.write().await;
        data.insert(key.to_string(), json);
        self.persist(&data).await
    }

    /// Remove a key. Returns whether it existed.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let mut data = self.data.write().await;
        let existed = data.remove(key).is_some();
        if existed {
            self.persist(&data).await?;
        }
        Ok(existed)
    }

    /// Drop every key and persist the empty document.
    pub async fn clear(&self) -> Result<()> {
        let mut data = self.data.write().await;
        data.clear();
        self.persist(&data).await
    }

    /// Keys currently present, for diagnostics.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    async fn persist(&self, data: &HashMap<String, serde_json::Value>) -> Result<()> {
        let body = serde_json::to_vec_pretty(data).context("Failed to serialize store")?;
        let tmp = self.path.with_extension("json.tmp");

        fs::write(&tmp, &body)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlaylistLink;

    async fn open_temp() -> (tempfile::TempDir, StoreService) {
        let dir = tempfile::tempdir().unwrap();
        let store = StoreService::open(dir.path().to_str().unwrap()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_round_trips_typed_values() {
        let (_dir, store) = open_temp().await;
        let link = PlaylistLink {
            id: "abc".to_string(),
            name: "My M3U List".to_string(),
            url: Some("http://host/list.m3u".to_string()),
            created_at: 1_700_000_000_000,
            channel_count: 3,
        };

        store.set("links", &vec![link.clone()]).await.unwrap();
        let loaded: Vec<PlaylistLink> = store.get("links").await.unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, link.id);
        assert_eq!(loaded[0].channel_count, 3);
    }

    #[tokio::test]
    async fn test_missing_key_returns_none() {
        let (_dir, store) = open_temp().await;

        assert!(store.get::<Vec<PlaylistLink>>("links").await.is_none());
    }

    #[tokio::test]
    async fn test_survives_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();

        {
            let store = StoreService::open(data_dir).await.unwrap();
            store.set("flag", &true).await.unwrap();
        }

        let reopened = StoreService::open(data_dir).await.unwrap();
        assert_eq!(reopened.get::<bool>("flag").await, Some(true));
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let (_dir, store) = open_temp().await;
        store.set("a", &1u32).await.unwrap();
        store.set("b", &2u32).await.unwrap();

        assert!(store.remove("a").await.unwrap());
        assert!(!store.remove("a").await.unwrap());
        assert_eq!(store.len().await, 1);

        store.clear().await.unwrap();
        assert_eq!(store.len().await, 0);
    }
}
