//! Data structures for communication analysis results.

use serde::{Deserialize, Serialize};

/// Transcript of the spoken audio.
///
/// The service is asked for a single text block, but responses sometimes
/// arrive pre-segmented as an array of strings. Both shapes deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Transcript {
    Text(String),
    Segments(Vec<String>),
}

impl Transcript {
    /// The transcript as one contiguous string.
    pub fn full_text(&self) -> String {
        match self {
            Transcript::Text(text) => text.clone(),
            Transcript::Segments(parts) => parts.join(" "),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Transcript::Text(text) => text.trim().is_empty(),
            Transcript::Segments(parts) => parts.iter().all(|p| p.trim().is_empty()),
        }
    }
}

/// A validated communication analysis for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationAnalysis {
    /// The complete text transcription of the audio content.
    pub transcript: Transcript,
    /// Score (0-100) for the speaker's fluency, grammar, and pace.
    pub clarity_score: u8,
    /// Single sentence summarizing the main topic of the video.
    pub communication_focus: String,
}

/// The JSON schema the service is constrained to respond with.
///
/// Field descriptions double as instructions to the model, so they stay
/// prescriptive rather than documentary.
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "transcript": {
                "type": "STRING",
                "description": "The complete text transcription of the audio content."
            },
            "clarity_score": {
                "type": "INTEGER",
                "description": "A numerical score (0-100) indicating the speaker's fluency, grammar, and pace."
            },
            "communication_focus": {
                "type": "STRING",
                "description": "A single, concise sentence summarizing the main topic of the video."
            }
        },
        "required": ["transcript", "clarity_score", "communication_focus"]
    })
}
