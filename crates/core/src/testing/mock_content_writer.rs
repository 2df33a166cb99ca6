//! Mock content writer for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::artwork::{sniff_extension, ArtworkError, ContentWriter};
use crate::track::ContentLocation;

/// In-memory implementation of the ContentWriter trait.
#[derive(Debug)]
pub struct MockContentWriter {
    contents: Arc<RwLock<HashMap<ContentLocation, Vec<u8>>>>,
    next_id: AtomicU64,
    fail_writes: Arc<RwLock<bool>>,
}

impl Default for MockContentWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockContentWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self {
            contents: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            fail_writes: Arc::new(RwLock::new(false)),
        }
    }

    /// Make every write fail until reset.
    pub async fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.write().await = fail;
    }

    /// Store content directly at `location`.
    pub async fn insert(&self, location: ContentLocation, bytes: Vec<u8>) {
        self.contents.write().await.insert(location, bytes);
    }

    /// Whether content exists at `location`.
    pub async fn contains(&self, location: &ContentLocation) -> bool {
        self.contents.read().await.contains_key(location)
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.contents.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.contents.read().await.is_empty()
    }
}

#[async_trait]
impl ContentWriter for MockContentWriter {
    async fn write(&self, bytes: &[u8]) -> Result<ContentLocation, ArtworkError> {
        if *self.fail_writes.read().await {
            return Err(ArtworkError::write_failed(
                PathBuf::from("mock"),
                std::io::Error::new(std::io::ErrorKind::Other, "mock write failure"),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let location = ContentLocation::new(format!("mock-{}.{}", id, sniff_extension(bytes)));
        self.contents
            .write()
            .await
            .insert(location.clone(), bytes.to_vec());
        Ok(location)
    }

    async fn read(&self, location: &ContentLocation) -> Result<Vec<u8>, ArtworkError> {
        self.contents
            .read()
            .await
            .get(location)
            .cloned()
            .ok_or_else(|| ArtworkError::ContentMissing(location.clone()))
    }

    async fn prune_orphans(&self, referenced: &[ContentLocation]) -> Result<usize, ArtworkError> {
        let keep: HashSet<&ContentLocation> = referenced.iter().collect();
        let mut contents = self.contents.write().await;
        let before = contents.len();
        contents.retain(|location, _| keep.contains(location));
        Ok(before - contents.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::JPEG_BYTES;

    #[tokio::test]
    async fn test_write_read_prune() {
        let writer = MockContentWriter::new();
        let a = writer.write(JPEG_BYTES).await.unwrap();
        let b = writer.write(b"raw").await.unwrap();

        assert_eq!(a.as_str(), "mock-1.jpg");
        assert_eq!(b.as_str(), "mock-2.bin");
        assert_eq!(writer.read(&a).await.unwrap(), JPEG_BYTES);

        assert_eq!(writer.prune_orphans(&[a.clone()]).await.unwrap(), 1);
        assert!(writer.contains(&a).await);
        assert!(!writer.contains(&b).await);
    }

    #[tokio::test]
    async fn test_fail_writes() {
        let writer = MockContentWriter::new();
        writer.set_fail_writes(true).await;
        assert!(writer.write(JPEG_BYTES).await.is_err());
        assert!(writer.is_empty().await);
    }
}
