//! Artwork cache - fetches remote artwork once per track and records where it landed.
//!
//! [`ArtworkCacheManager::reconcile`] is called with the tracks produced by a
//! search response. Fetches go through a [`Transport`], content is persisted
//! by a [`ContentWriter`], and results are applied to the track store by the
//! [`CompletionApplier`] background task.

mod error;
mod fs_writer;
mod manager;
mod traits;
mod transport;
mod types;

pub use error::ArtworkError;
pub use fs_writer::{sniff_extension, FsContentWriter};
pub use manager::{create_artwork_system, ArtworkCacheManager, CompletionApplier};
pub use traits::{ContentWriter, Transport};
pub use transport::HttpTransport;
pub use types::{AttemptId, FetchCompletion, ReconcileReport};
