//! Mock artwork transport for testing.

use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::fixtures::JPEG_BYTES;
use crate::artwork::{ArtworkError, Transport};

/// Decrements the active counter even when the fetch is aborted.
struct ActiveGuard {
    active: Arc<AtomicUsize>,
}

impl ActiveGuard {
    fn enter(active: &Arc<AtomicUsize>, max_active: &AtomicUsize) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        max_active.fetch_max(now, Ordering::SeqCst);
        Self {
            active: Arc::clone(active),
        }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock implementation of the Transport trait.
///
/// Provides controllable behavior for testing:
/// - Per-URL bodies (a small JPEG by default)
/// - Per-URL failure statuses
/// - A delay applied to every fetch
/// - Recorded calls and peak concurrency for assertions
#[derive(Debug)]
pub struct MockTransport {
    bodies: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    statuses: Arc<RwLock<HashMap<String, u16>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    calls: Arc<RwLock<Vec<String>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a new mock transport that answers every URL with a JPEG.
    pub fn new() -> Self {
        Self {
            bodies: Arc::new(RwLock::new(HashMap::new())),
            statuses: Arc::new(RwLock::new(HashMap::new())),
            delay: Arc::new(RwLock::new(None)),
            calls: Arc::new(RwLock::new(Vec::new())),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Serve `body` for `url`.
    pub async fn set_body(&self, url: &str, body: Vec<u8>) {
        self.bodies.write().await.insert(url.to_string(), body);
    }

    /// Answer `url` with a non-success status.
    pub async fn set_status(&self, url: &str, status: u16) {
        self.statuses.write().await.insert(url.to_string(), status);
    }

    /// Stop failing `url`.
    pub async fn clear_status(&self, url: &str) {
        self.statuses.write().await.remove(url);
    }

    /// Delay every fetch by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Remove the fetch delay.
    pub async fn clear_delay(&self) {
        *self.delay.write().await = None;
    }

    /// URLs fetched so far, in call order.
    pub async fn recorded_calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    /// Number of fetches made so far.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Number of fetches made for `url`.
    pub async fn calls_for(&self, url: &str) -> usize {
        self.calls.read().await.iter().filter(|c| *c == url).count()
    }

    /// Highest number of fetches that ran at the same time.
    pub async fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ArtworkError> {
        let url = url.to_string();
        self.calls.write().await.push(url.clone());
        let _guard = ActiveGuard::enter(&self.active, &self.max_active);

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(status) = self.statuses.read().await.get(&url).copied() {
            return Err(ArtworkError::Status { url, status });
        }

        let body = self.bodies.read().await.get(&url).cloned();
        Ok(body.unwrap_or_else(|| JPEG_BYTES.to_vec()))
    }
}
