//! Multimodal communication analysis.
//!
//! The extracted audio is submitted to an inference service which returns
//! raw JSON text; [`schema`] then enforces the response contract. Transient
//! service failures are absorbed by [`retry`].

pub mod gemini;
pub mod models;
pub mod retry;
pub mod schema;

pub use gemini::GeminiClient;
pub use models::{CommunicationAnalysis, Transcript};
pub use retry::{with_retry, RetryPolicy};

use crate::audio::ExtractedAudio;
use crate::error::Result;
use async_trait::async_trait;

/// Trait for inference backends that turn audio into analysis JSON.
#[async_trait]
pub trait InsightService: Send + Sync {
    /// Submit the audio for analysis, returning the raw JSON text produced
    /// by the model. One service call per invocation; retry lives elsewhere.
    async fn analyze(&self, audio: &ExtractedAudio) -> Result<String>;
}
