//! CLI module for klar.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// klar - Video Communication Insights
///
/// Turns a public video URL into structured communication insights: a full
/// transcript, a clarity score, and the speaker's communication focus.
/// The name "klar" comes from the Norwegian word for "clear."
#[derive(Parser, Debug)]
#[command(name = "klar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize klar and verify system requirements
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Analyze the communication quality of a video
    Analyze {
        /// Public video URL (YouTube, Vimeo, Loom, ...)
        url: String,

        /// Print the result as JSON instead of the insight card
        #[arg(long)]
        json: bool,

        /// Leave the transcript out of the insight card
        #[arg(long)]
        no_transcript: bool,
    },

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "analysis.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
