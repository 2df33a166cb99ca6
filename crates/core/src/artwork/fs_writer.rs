//! Filesystem-backed content writer.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::ArtworkError;
use super::traits::ContentWriter;
use crate::track::ContentLocation;

const PART_SUFFIX: &str = ".part";

/// Extensions `sniff_extension` can produce.
const EXTENSIONS: [&str; 4] = ["jpg", "png", "gif", "bin"];

/// Writes artwork into a flat cache directory as `<uuid>.<ext>` files.
#[derive(Debug, Clone)]
pub struct FsContentWriter {
    root: PathBuf,
}

impl FsContentWriter {
    /// Create a writer rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a location to its file path.
    ///
    /// Locations are bare file names; anything that could escape the cache
    /// directory is rejected.
    pub fn path_for(&self, location: &ContentLocation) -> Result<PathBuf, ArtworkError> {
        let name = location.as_str();
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name == "."
            || name == ".."
            || name.ends_with(PART_SUFFIX)
        {
            return Err(ArtworkError::InvalidLocation(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    async fn ensure_root(&self) -> Result<(), ArtworkError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ArtworkError::write_failed(self.root.clone(), e))
    }
}

/// Guess a file extension from magic bytes.
pub fn sniff_extension(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpg"
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        "png"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "gif"
    } else {
        "bin"
    }
}

/// Whether `name` is a file this writer creates: `<uuid>.<ext>`, or the same
/// name with the temporary `.part` suffix.
fn is_cache_file_name(name: &str) -> bool {
    let name = name.strip_suffix(PART_SUFFIX).unwrap_or(name);
    match name.rsplit_once('.') {
        Some((stem, ext)) => EXTENSIONS.contains(&ext) && Uuid::parse_str(stem).is_ok(),
        None => false,
    }
}

#[async_trait]
impl ContentWriter for FsContentWriter {
    async fn write(&self, bytes: &[u8]) -> Result<ContentLocation, ArtworkError> {
        self.ensure_root().await?;

        let name = format!("{}.{}", Uuid::new_v4(), sniff_extension(bytes));
        let final_path = self.root.join(&name);
        let part_path = self.root.join(format!("{}{}", name, PART_SUFFIX));

        // Readers only ever see the renamed, complete file
        fs::write(&part_path, bytes)
            .await
            .map_err(|e| ArtworkError::write_failed(part_path.clone(), e))?;

        if let Err(e) = fs::rename(&part_path, &final_path).await {
            let _ = fs::remove_file(&part_path).await;
            return Err(ArtworkError::write_failed(final_path, e));
        }

        debug!("Wrote {} bytes to {}", bytes.len(), final_path.display());
        Ok(ContentLocation::new(name))
    }

    async fn read(&self, location: &ContentLocation) -> Result<Vec<u8>, ArtworkError> {
        let path = self.path_for(location)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ArtworkError::ContentMissing(location.clone()))
            }
            Err(e) => Err(ArtworkError::Io(e)),
        }
    }

    async fn prune_orphans(&self, referenced: &[ContentLocation]) -> Result<usize, ArtworkError> {
        let keep: HashSet<&str> = referenced.iter().map(|l| l.as_str()).collect();

        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(ArtworkError::Io(e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if keep.contains(name) {
                continue;
            }
            // the directory may be shared; only touch our own files
            if !is_cache_file_name(name) {
                debug!("Leaving foreign file {} in artwork cache", name);
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => {
                    debug!("Pruned orphaned artwork {}", name);
                    removed += 1;
                }
                Err(e) => warn!("Failed to prune {}: {}", entry.path().display(), e),
            }
        }

        if removed > 0 {
            info!(
                "Pruned {} orphaned artwork file(s) from {}",
                removed,
                self.root.display()
            );
        }
        Ok(removed)
    }
}
