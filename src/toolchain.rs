//! External toolchain probing.
//!
//! Verifies that the media toolchain the extractor shells out to is present
//! and invocable, by running a trivial version query against each binary.
//! The check runs once per pipeline invocation rather than once per process,
//! since the environment can change underneath a long-running deployment.

use crate::error::{KlarError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Binaries required for audio extraction.
pub const REQUIRED_TOOLS: &[&str] = &["yt-dlp", "ffmpeg", "ffprobe"];

/// Probe for the presence and executability of external dependencies.
#[async_trait]
pub trait DependencyProbe: Send + Sync {
    /// Verify every required binary responds to a version query.
    ///
    /// Fails with [`KlarError::MissingDependency`] naming the first binary
    /// that is absent or broken.
    async fn verify(&self) -> Result<()>;
}

/// Probe that queries the real binaries on `$PATH`.
pub struct SystemToolchain;

#[async_trait]
impl DependencyProbe for SystemToolchain {
    async fn verify(&self) -> Result<()> {
        for tool in REQUIRED_TOOLS {
            probe_tool(tool).await?;
        }
        Ok(())
    }
}

/// Run a version query against a single tool.
async fn probe_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };

    let result = Command::new(name)
        .arg(version_arg)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await;

    match result {
        Ok(output) if output.status.success() => {
            if let Some(version) = String::from_utf8_lossy(&output.stdout).lines().next() {
                debug!("{}: {}", name, version.trim());
            }
            Ok(())
        }
        Ok(_) => Err(KlarError::MissingDependency(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(KlarError::MissingDependency(name.to_string()))
        }
        Err(e) => Err(KlarError::MissingDependency(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_named() {
        let err = probe_tool("klar-test-tool-that-does-not-exist")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "missing_dependency");
        assert!(err.to_string().contains("klar-test-tool-that-does-not-exist"));
    }

    #[test]
    fn test_required_tools_cover_the_extraction_chain() {
        assert!(REQUIRED_TOOLS.contains(&"yt-dlp"));
        assert!(REQUIRED_TOOLS.contains(&"ffmpeg"));
        assert!(REQUIRED_TOOLS.contains(&"ffprobe"));
    }
}
