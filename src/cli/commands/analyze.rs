//! Analyze command implementation.

use crate::analysis::CommunicationAnalysis;
use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::error::KlarError;
use crate::pipeline::{Pipeline, PipelineError};
use anyhow::Result;
use console::style;

/// Run the analyze command.
pub async fn run_analyze(
    url: &str,
    json: bool,
    no_transcript: bool,
    settings: Settings,
) -> Result<()> {
    let api_key = match preflight::require_api_key() {
        Ok(key) => key,
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'klar doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    let pipeline = Pipeline::new(&settings, api_key)?;

    let spinner = Output::spinner(&format!("Analyzing {}", url));
    let result = pipeline.run(url).await;
    spinner.finish_and_clear();

    match result {
        Ok(analysis) => {
            if json {
                let payload = serde_json::json!({
                    "url": url,
                    "clarity_score": analysis.clarity_score,
                    "communication_focus": analysis.communication_focus,
                    "transcript": analysis.transcript.full_text(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print_insight_card(&analysis, no_transcript);
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Analysis failed: {}", e.error));
            Output::info(user_hint(&e));
            Err(e.into())
        }
    }
}

/// Print the insight card for a finished analysis.
fn print_insight_card(analysis: &CommunicationAnalysis, no_transcript: bool) {
    Output::header("Communication Insights");
    println!();
    Output::kv("Clarity score", &render_score(analysis.clarity_score));
    Output::kv("Focus", &analysis.communication_focus);

    if !no_transcript {
        Output::header("Transcript");
        println!();
        println!("{}", analysis.transcript.full_text());
    }
    println!();
}

/// Color the score by band: strong, middling, weak.
fn render_score(score: u8) -> String {
    let text = format!("{}/100", score);
    let styled = match score {
        80..=100 => style(text).green(),
        50..=79 => style(text).yellow(),
        _ => style(text).red(),
    };
    styled.bold().to_string()
}

/// An actionable next step for each failure kind.
fn user_hint(error: &PipelineError) -> &'static str {
    match error.error {
        KlarError::InvalidUrl(_) => {
            "Check the URL and that its host is on the allowed list (klar config show)."
        }
        KlarError::MissingDependency(_) => "Run 'klar doctor' for install instructions.",
        KlarError::Extraction(_) => "Make sure the video is public and reachable, then try again.",
        KlarError::ServiceUnavailable(_) => {
            "The analysis service is overloaded. Try again in a few minutes."
        }
        KlarError::AnalysisFailed(_) => {
            "The service rejected this request. Check your API key and usage limits."
        }
        KlarError::SchemaViolation(_) => {
            "The service returned a malformed analysis. This is a defect worth reporting."
        }
        _ => "Run 'klar doctor' for detailed diagnostics.",
    }
}
