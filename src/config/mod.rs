//! Configuration module for klar.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnalysisPrompts, Prompts};
pub use settings::{
    AnalysisSettings, ExtractionSettings, GeneralSettings, PromptSettings, RetrySettings,
    Settings, SourceSettings,
};
