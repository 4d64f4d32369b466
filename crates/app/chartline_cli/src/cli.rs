use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chartline", version, about = "Chartline chat-to-chart tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the chart system prompt sent ahead of every conversation.
    Prompt,
    /// Run a saved model reply through the chart pipeline and print the response body.
    Normalize {
        /// File holding the raw model output. Reads stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Show version information.
    Version,
}
