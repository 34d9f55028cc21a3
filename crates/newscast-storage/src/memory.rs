//! In-memory object store for tests

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use newscast_core::{Error, ObjectStore, Result};

/// A process-local object store backed by a map. Cheap to clone; clones
/// share the same contents.
#[derive(Clone)]
pub struct MemoryObjectStore {
    base_url: String,
    objects: Arc<RwLock<BTreeMap<String, (Bytes, String)>>>,
}

impl MemoryObjectStore {
    /// `base_url` is prepended to keys when forming public URLs.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Content type recorded for a key, if present.
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.read().get(key).map(|(_, ct)| ct.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Bytes> {
        self.objects
            .read()
            .get(key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| Error::Storage(format!("no such object: {key}")))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String> {
        self.objects
            .write()
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.write().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.read().contains_key(key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let store = MemoryObjectStore::new("http://test.local");
        let url = store
            .put("episodes/x.mp3", Bytes::from_static(b"abc"), "audio/mpeg")
            .await
            .unwrap();
        assert_eq!(url, "http://test.local/episodes/x.mp3");
        assert!(store.exists("episodes/x.mp3").await.unwrap());
        assert_eq!(store.get("episodes/x.mp3").await.unwrap(), "abc");
        assert_eq!(
            store.content_type("episodes/x.mp3").as_deref(),
            Some("audio/mpeg")
        );

        store.delete("episodes/x.mp3").await.unwrap();
        assert!(!store.exists("episodes/x.mp3").await.unwrap());
        assert!(store.get("episodes/x.mp3").await.is_err());
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let store = MemoryObjectStore::new("http://test.local");
        for key in ["episodes/a_manifest.json", "episodes/b_manifest.json", "runs/index.json"] {
            store
                .put(key, Bytes::from_static(b"{}"), "application/json")
                .await
                .unwrap();
        }
        let mut episodes = store.list("episodes/").await.unwrap();
        episodes.sort();
        assert_eq!(
            episodes,
            vec!["episodes/a_manifest.json", "episodes/b_manifest.json"]
        );
    }
}
