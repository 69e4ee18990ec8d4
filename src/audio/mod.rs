//! Audio extraction from remote video sources.
//!
//! The extractor pulls the best available audio stream of a validated video
//! URL into a request-scoped scratch directory. The resulting
//! [`ExtractedAudio`] handle owns that directory; dropping the handle removes
//! the directory and the audio file in it, so the artifact can never outlive
//! the request that produced it.

mod ytdlp;

pub use ytdlp::YtDlpExtractor;

use crate::error::Result;
use crate::video_url::VideoUrl;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary audio artifact produced by extraction.
pub struct ExtractedAudio {
    // Held only for its Drop impl, which removes the directory.
    _scratch: TempDir,
    path: PathBuf,
    size_bytes: u64,
    source_url: String,
}

impl ExtractedAudio {
    /// Wrap a scratch directory and the audio file extracted into it.
    pub fn new(scratch: TempDir, path: PathBuf, size_bytes: u64, source_url: String) -> Self {
        Self {
            _scratch: scratch,
            path,
            size_bytes,
            source_url,
        }
    }

    /// Path to the audio file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the audio file in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// URL the audio was extracted from.
    pub fn source_url(&self) -> &str {
        &self.source_url
    }
}

/// Trait for audio extraction backends.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract the audio stream of a video into a scratch file.
    async fn extract(&self, url: &VideoUrl) -> Result<ExtractedAudio>;
}
