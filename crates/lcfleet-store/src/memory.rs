//! In-memory object-store backend for tests and local development.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use lcfleet_core::ProviderError;

use crate::backend::{DeleteAck, ObjectStoreBackend};

/// A bucketed blob store held entirely in memory.
///
/// Clones share the same underlying map, mirroring how a handle to a
/// remote store behaves.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<HashMap<(String, String), Vec<u8>>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing the upload path.
    pub fn put_object(&self, bucket: &str, key: &str, bytes: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .expect("object map poisoned")
            .insert((bucket.to_string(), key.to_string()), bytes.into());
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .expect("object map poisoned")
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .expect("object map poisoned")
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }
}

impl ObjectStoreBackend for MemoryObjectStore {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), ProviderError> {
        let bytes = self
            .object(bucket, key)
            .ok_or_else(|| ProviderError::NotFound(format!("{bucket}/{key}")))?;
        tokio::fs::write(dest, bytes).await?;
        Ok(())
    }

    async fn upload(&self, local: &Path, bucket: &str, key: &str) -> Result<(), ProviderError> {
        let bytes = tokio::fs::read(local).await?;
        self.put_object(bucket, key, bytes);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<DeleteAck, ProviderError> {
        let removed = self
            .objects
            .lock()
            .expect("object map poisoned")
            .remove(&(bucket.to_string(), key.to_string()));
        match removed {
            Some(_) => Ok(DeleteAck {
                delete_marker: true,
            }),
            None => Err(ProviderError::NotFound(format!("{bucket}/{key}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn download_of_missing_object_is_not_found() {
        let store = MemoryObjectStore::new();
        let dir = tempfile::tempdir().unwrap();
        let err = store
            .download("b", "missing", &dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let store = MemoryObjectStore::new();
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("lc1.csv");
        tokio::fs::write(&src, b"time,flux\n").await.unwrap();

        store.upload(&src, "lightcurves", "lc1.csv").await.unwrap();
        assert!(store.contains("lightcurves", "lc1.csv"));

        let dest = dir.path().join("fetched.csv");
        store
            .download("lightcurves", "lc1.csv", &dest)
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"time,flux\n");
    }

    #[tokio::test]
    async fn clones_share_the_same_objects() {
        let store = MemoryObjectStore::new();
        let other = store.clone();
        store.put_object("b", "k", b"data".to_vec());
        assert!(other.contains("b", "k"));
    }

    #[tokio::test]
    async fn delete_reports_a_marker_once() {
        let store = MemoryObjectStore::new();
        store.put_object("b", "k", b"data".to_vec());

        let ack = store.delete("b", "k").await.unwrap();
        assert!(ack.delete_marker);
        assert!(matches!(
            store.delete("b", "k").await,
            Err(ProviderError::NotFound(_))
        ));
    }
}
