//! Gemini REST client for audio analysis.

use super::models::response_schema;
use super::InsightService;
use crate::audio::ExtractedAudio;
use crate::config::{AnalysisPrompts, AnalysisSettings};
use crate::error::{KlarError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// MIME type sent with the inline audio payload.
const AUDIO_MIME_TYPE: &str = "audio/mp3";

/// Client for the Gemini `generateContent` endpoint.
///
/// Performs exactly one request per `analyze` call; attempts are fully
/// independent, so the retry layer can simply call again.
pub struct GeminiClient {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    prompts: AnalysisPrompts,
}

impl GeminiClient {
    pub fn new(
        settings: &AnalysisSettings,
        api_key: String,
        prompts: AnalysisPrompts,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()
            .map_err(|e| KlarError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
            prompts,
        })
    }

    fn build_request(&self, audio_bytes: &[u8]) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: Content {
                parts: vec![Part::text(self.prompts.system_instruction.clone())],
            },
            contents: vec![Content {
                parts: vec![
                    Part::text(self.prompts.user_prompt.clone()),
                    Part::inline(AUDIO_MIME_TYPE, BASE64.encode(audio_bytes)),
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        }
    }
}

#[async_trait]
impl InsightService for GeminiClient {
    #[instrument(skip(self, audio), fields(size_bytes = audio.size_bytes()))]
    async fn analyze(&self, audio: &ExtractedAudio) -> Result<String> {
        let audio_bytes = tokio::fs::read(audio.path()).await?;
        let request = self.build_request(&audio_bytes);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        debug!("Submitting {} bytes of audio for analysis", audio_bytes.len());

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| KlarError::AnalysisFailed(format!("Unreadable service response: {e}")))?;

        extract_text(body)
    }
}

/// Timeouts and connect failures are worth retrying; anything else that
/// breaks at the transport layer is a permanent failure for this attempt.
fn classify_transport_error(e: reqwest::Error) -> KlarError {
    if e.is_timeout() || e.is_connect() {
        KlarError::ServiceUnavailable(format!("Request failed: {e}"))
    } else {
        KlarError::AnalysisFailed(format!("Request failed: {e}"))
    }
}

/// 429 and 503 signal overload or rate limiting; other non-success statuses
/// are rejections that retrying cannot fix.
fn classify_status(status: reqwest::StatusCode, body: &str) -> KlarError {
    let message = format!("Service returned {}: {}", status, service_error_message(body));
    match status.as_u16() {
        429 | 503 => KlarError::ServiceUnavailable(message),
        _ => KlarError::AnalysisFailed(message),
    }
}

/// Pulls the human-readable message out of a Gemini error body, falling back
/// to the raw body when it isn't the expected shape.
fn service_error_message(body: &str) -> String {
    if let Some(message) = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
    {
        return message;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no details provided".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

/// Pulls the first text part out of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| KlarError::AnalysisFailed("Service returned no candidates".into()))?;

    let finish_reason = candidate.finish_reason;
    let text = candidate
        .content
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .filter(|t| !t.trim().is_empty());

    match text {
        Some(t) => Ok(t),
        None => {
            let reason = finish_reason.unwrap_or_else(|| "unknown".to_string());
            Err(KlarError::AnalysisFailed(format!(
                "Service response contained no text (finish reason: {reason})"
            )))
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }

    fn inline(mime_type: &str, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data,
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}
