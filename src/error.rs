//! Error types for Klar.

use thiserror::Error;

/// Library-level error type for Klar operations.
///
/// The first six variants form the user-facing taxonomy; every pipeline
/// failure surfaces as exactly one of them and is never converted into
/// another kind. The remaining variants cover ambient failures (I/O,
/// configuration) outside that taxonomy.
#[derive(Error, Debug)]
pub enum KlarError {
    #[error("Invalid video URL: {0}")]
    InvalidUrl(String),

    #[error("Required tool not found: {0}. Please install it and ensure it's in your PATH.")]
    MissingDependency(String),

    #[error("Audio extraction failed: {0}")]
    Extraction(String),

    #[error("Analysis service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Analysis response violates schema: {0}")]
    SchemaViolation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl KlarError {
    /// Stable kind identifier for the HTTP API and UI layer.
    pub fn kind(&self) -> &'static str {
        match self {
            KlarError::InvalidUrl(_) => "invalid_url",
            KlarError::MissingDependency(_) => "missing_dependency",
            KlarError::Extraction(_) => "extraction_failed",
            KlarError::ServiceUnavailable(_) => "service_unavailable",
            KlarError::AnalysisFailed(_) => "analysis_failed",
            KlarError::SchemaViolation(_) => "schema_violation",
            _ => "internal",
        }
    }

    /// Whether this is a transient service condition worth retrying.
    ///
    /// Only overload/rate-limit signals and network timeouts qualify;
    /// everything else fails after a single attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, KlarError::ServiceUnavailable(_))
    }
}

/// Result type alias for Klar operations.
pub type Result<T> = std::result::Result<T, KlarError>;
