//! Klar - Video Communication Insights
//!
//! A CLI tool that turns a video URL into a communication analysis: a full
//! transcript, a clarity score, and a one-sentence communication focus.
//!
//! The name "klar" comes from the Norwegian word for "clear."
//!
//! # Overview
//!
//! Klar allows you to:
//! - Analyze spoken communication in YouTube, Vimeo, and Loom videos
//! - Get a 0-100 clarity score for fluency, grammar, and pace
//! - Get a complete transcript of the audio
//! - Serve the same analysis over a small HTTP API
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `video_url` - URL validation against the allowed-host policy
//! - `toolchain` - External tool (yt-dlp/ffmpeg) probing
//! - `audio` - Audio extraction from video URLs
//! - `analysis` - Gemini analysis, response schema, retry policy
//! - `pipeline` - End-to-end coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use klar::config::Settings;
//! use klar::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let api_key = std::env::var("GEMINI_API_KEY")?;
//!     let pipeline = Pipeline::new(&settings, api_key)?;
//!
//!     let analysis = pipeline
//!         .run("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
//!         .await?;
//!     println!("Clarity: {}/100", analysis.clarity_score);
//!
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod toolchain;
pub mod video_url;

pub use error::{KlarError, Result};
