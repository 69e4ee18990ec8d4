//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::error::{KlarError, Result};

/// Environment variable holding the Gemini API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Fetch the API key from the environment.
///
/// Absence is a startup failure with an actionable message; no pipeline is
/// constructed without a key.
pub fn require_api_key() -> Result<String> {
    match std::env::var(API_KEY_VAR) {
        Ok(key) if !key.is_empty() => Ok(key),
        Ok(_) => Err(KlarError::Config(format!(
            "{API_KEY_VAR} is empty. Set it with: export {API_KEY_VAR}='AIza...'"
        ))),
        Err(_) => Err(KlarError::Config(format!(
            "{API_KEY_VAR} not set. Set it with: export {API_KEY_VAR}='AIza...'"
        ))),
    }
}
