//! yt-dlp backed audio extraction.

use super::{ExtractedAudio, Extractor};
use crate::error::{KlarError, Result};
use crate::video_url::VideoUrl;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Audio formats yt-dlp may produce, in preference order.
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "opus", "m4a", "webm", "ogg"];

/// Extracts audio using the yt-dlp command line tool.
pub struct YtDlpExtractor {
    temp_dir: PathBuf,
    max_duration_seconds: u64,
    timeout: Duration,
}

impl YtDlpExtractor {
    pub fn new(temp_dir: PathBuf, max_duration_seconds: u64, timeout_seconds: u64) -> Self {
        Self {
            temp_dir,
            max_duration_seconds,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    /// Fetch the video's duration without downloading anything.
    ///
    /// Live streams and some sources report no duration; those pass through
    /// and are bounded by the extraction timeout instead.
    async fn probe_duration(&self, url: &VideoUrl) -> Result<Option<f64>> {
        let result = Command::new("yt-dlp")
            .arg("--dump-json")
            .arg("--no-download")
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg(url.as_str())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KlarError::MissingDependency("yt-dlp".into()));
            }
            Err(e) => {
                return Err(KlarError::Extraction(format!("Failed to run yt-dlp: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KlarError::Extraction(format!(
                "Could not fetch video metadata: {}",
                stderr.trim()
            )));
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        let json: serde_json::Value = serde_json::from_str(&json_str)
            .map_err(|e| KlarError::Extraction(format!("Failed to parse yt-dlp output: {e}")))?;

        Ok(json["duration"].as_f64())
    }

    /// Download and extract the audio stream into `scratch` as MP3.
    async fn download_audio(&self, url: &VideoUrl, scratch: &Path) -> Result<()> {
        let template = scratch.join("audio.%(ext)s");

        let mut cmd = Command::new("yt-dlp");
        cmd.arg("--extract-audio")
            .arg("--audio-format").arg("mp3")
            .arg("--audio-quality").arg("0")
            .arg("--output").arg(template.to_str().unwrap_or_default())
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(url.as_str())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            // Dropping the future on timeout must not leave yt-dlp running.
            .kill_on_drop(true);

        let result = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result,
            Err(_) => {
                return Err(KlarError::Extraction(format!(
                    "yt-dlp did not finish within {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KlarError::MissingDependency("yt-dlp".into()));
            }
            Err(e) => {
                return Err(KlarError::Extraction(format!("yt-dlp execution failed: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KlarError::Extraction(format!(
                "yt-dlp failed: {}",
                stderr.trim()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    #[instrument(skip(self), fields(url = %url))]
    async fn extract(&self, url: &VideoUrl) -> Result<ExtractedAudio> {
        let duration = self.probe_duration(url).await?;
        check_duration(duration, self.max_duration_seconds)?;

        std::fs::create_dir_all(&self.temp_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix("klar-")
            .tempdir_in(&self.temp_dir)?;

        info!("Extracting audio from {}", url);
        self.download_audio(url, scratch.path()).await?;

        let path = find_audio_file(scratch.path())?;
        let size_bytes = std::fs::metadata(&path)?.len();
        if size_bytes == 0 {
            return Err(KlarError::Extraction(
                "Extracted audio file is empty".into(),
            ));
        }

        debug!("Extracted {} bytes to {:?}", size_bytes, path);
        Ok(ExtractedAudio::new(
            scratch,
            path,
            size_bytes,
            url.as_str().to_string(),
        ))
    }
}

/// Rejects videos longer than the configured cap before any download work.
fn check_duration(duration: Option<f64>, max_seconds: u64) -> Result<()> {
    match duration {
        Some(d) if d > max_seconds as f64 => Err(KlarError::Extraction(format!(
            "Video is {:.0}s long, which exceeds the {}s limit",
            d, max_seconds
        ))),
        _ => Ok(()),
    }
}

/// Locates the extracted audio file in the scratch directory.
fn find_audio_file(dir: &Path) -> Result<PathBuf> {
    for ext in AUDIO_EXTENSIONS {
        let candidate = dir.join(format!("audio.{}", ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    // Fallback: yt-dlp occasionally keeps an unexpected container extension
    let entries = std::fs::read_dir(dir)
        .map_err(|e| KlarError::Extraction(format!("Cannot read scratch directory: {e}")))?;

    for entry in entries.flatten() {
        if entry.path().is_file() {
            return Ok(entry.path());
        }
    }

    Err(KlarError::Extraction(
        "Audio file not found after extraction".into(),
    ))
}
