//! Collaborator traits for the artwork cache.

use async_trait::async_trait;
use reqwest::Url;

use super::error::ArtworkError;
use crate::track::ContentLocation;

/// Fetches artwork bytes from a remote reference.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the full body behind `url`.
    ///
    /// Non-success responses are errors.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ArtworkError>;
}

/// Persists artwork bytes and hands out opaque locations for them.
#[async_trait]
pub trait ContentWriter: Send + Sync {
    /// Write `bytes` to a fresh location.
    ///
    /// The content must be fully readable at the returned location before
    /// this returns.
    async fn write(&self, bytes: &[u8]) -> Result<ContentLocation, ArtworkError>;

    /// Read back previously written content.
    async fn read(&self, location: &ContentLocation) -> Result<Vec<u8>, ArtworkError>;

    /// Delete content not listed in `referenced`. Returns the number removed.
    async fn prune_orphans(&self, referenced: &[ContentLocation]) -> Result<usize, ArtworkError>;
}
