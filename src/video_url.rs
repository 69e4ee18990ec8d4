//! Video URL validation.
//!
//! Validates raw user input into a [`VideoUrl`] before any subprocess or
//! network call happens. Validation is purely syntactic plus a host
//! allowlist check; it has no side effects.

use crate::error::{KlarError, Result};
use url::Url;

/// Default set of supported video platforms.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &["youtube.com", "youtu.be", "vimeo.com", "loom.com"];

/// A validated video URL.
///
/// Guaranteed to be a well-formed absolute http(s) URL whose host is on the
/// configured allowlist. The inner string is safe to pass as a single
/// argument-vector element to external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoUrl(Url);

impl VideoUrl {
    /// The URL as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Host component of the URL.
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }
}

impl std::fmt::Display for VideoUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validation policy for video URLs.
#[derive(Debug, Clone)]
pub struct UrlPolicy {
    allowed_hosts: Vec<String>,
}

impl UrlPolicy {
    /// Create a policy accepting the given hosts (and their subdomains).
    pub fn new(allowed_hosts: &[String]) -> Self {
        Self {
            allowed_hosts: allowed_hosts.iter().map(|h| h.to_lowercase()).collect(),
        }
    }

    /// Validate raw input into a [`VideoUrl`].
    ///
    /// Rejects empty input, malformed URLs, non-http(s) schemes, and hosts
    /// outside the allowlist, all with [`KlarError::InvalidUrl`].
    pub fn validate(&self, input: &str) -> Result<VideoUrl> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(KlarError::InvalidUrl("URL is empty".to_string()));
        }

        let url = Url::parse(trimmed)
            .map_err(|e| KlarError::InvalidUrl(format!("'{}': {}", trimmed, e)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(KlarError::InvalidUrl(format!(
                    "Unsupported scheme '{}' (expected http or https)",
                    other
                )));
            }
        }

        let host = url
            .host_str()
            .ok_or_else(|| KlarError::InvalidUrl(format!("'{}' has no host", trimmed)))?
            .to_lowercase();

        if !self.is_allowed(&host) {
            return Err(KlarError::InvalidUrl(format!(
                "'{}' is not a supported video platform",
                host
            )));
        }

        Ok(VideoUrl(url))
    }

    /// Exact match or subdomain of an allowed host.
    ///
    /// Matching is suffix-anchored on a dot boundary, so
    /// `youtube.com.evil.example` does not pass for `youtube.com`.
    fn is_allowed(&self, host: &str) -> bool {
        self.allowed_hosts
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }
}

impl Default for UrlPolicy {
    fn default() -> Self {
        let hosts: Vec<String> = DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect();
        Self::new(&hosts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_allowlisted_hosts() {
        let policy = UrlPolicy::default();

        for input in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "http://vimeo.com/123456789",
            "https://www.loom.com/share/abc123",
        ] {
            assert!(policy.validate(input).is_ok(), "should accept {}", input);
        }
    }

    #[test]
    fn test_rejects_empty_and_whitespace() {
        let policy = UrlPolicy::default();
        assert!(policy.validate("").is_err());
        assert!(policy.validate("   ").is_err());
    }

    #[test]
    fn test_rejects_malformed_input() {
        let policy = UrlPolicy::default();
        // No scheme, bare IDs, garbage
        assert!(policy.validate("youtube.com/watch?v=dQw4w9WgXcQ").is_err());
        assert!(policy.validate("dQw4w9WgXcQ").is_err());
        assert!(policy.validate("not a url at all").is_err());
    }

    #[test]
    fn test_rejects_non_http_schemes() {
        let policy = UrlPolicy::default();
        assert!(policy.validate("ftp://youtube.com/video").is_err());
        assert!(policy.validate("file:///etc/passwd").is_err());
        assert!(policy.validate("javascript:alert(1)").is_err());
    }

    #[test]
    fn test_rejects_hosts_outside_allowlist() {
        let policy = UrlPolicy::default();
        assert!(policy.validate("https://example.com/watch?v=abc").is_err());
        assert!(policy.validate("https://dailymotion.com/video/x1").is_err());
    }

    #[test]
    fn test_rejects_suffix_spoofing() {
        let policy = UrlPolicy::default();
        // Allowed host embedded in a hostile domain
        assert!(policy.validate("https://youtube.com.evil.example/watch").is_err());
        assert!(policy.validate("https://notyoutube.com/watch").is_err());
        // Allowed host in the userinfo position, real host elsewhere
        assert!(policy.validate("https://youtube.com@evil.example/watch").is_err());
    }

    #[test]
    fn test_host_matching_is_case_insensitive() {
        let policy = UrlPolicy::new(&["YouTube.com".to_string()]);
        assert!(policy.validate("https://WWW.YOUTUBE.COM/watch?v=abc").is_ok());
    }

    #[test]
    fn test_validated_url_preserves_input() {
        let policy = UrlPolicy::default();
        let url = policy
            .validate("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .unwrap();
        assert_eq!(url.as_str(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(url.host(), "www.youtube.com");
    }

    #[test]
    fn test_error_kind_is_invalid_url() {
        let policy = UrlPolicy::default();
        let err = policy.validate("https://example.com/x").unwrap_err();
        assert_eq!(err.kind(), "invalid_url");
    }
}
