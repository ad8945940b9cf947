use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "chatguard")]
#[command(about = "Real-time moderation and redaction of typed text", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true, env = "CHATGUARD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a piece of text and show how it would be redacted
    Check {
        /// Text to classify
        text: String,

        /// Use the local word list only
        #[arg(long)]
        offline: bool,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Probe the classifier endpoint
    Health,

    /// Show or change feature flags
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// Type edits into a simulated page, then submit its form
    Simulate {
        /// Successive contents of the field, as if typed
        #[arg(required = true)]
        edits: Vec<String>,

        /// Use a contenteditable region instead of a textarea
        #[arg(long)]
        contenteditable: bool,

        /// Use the local word list only
        #[arg(long)]
        offline: bool,

        /// Hostname of the simulated page
        #[arg(long, default_value = "example.com")]
        host: String,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print every flag
    Show,

    /// Set a flag (e.g. enableHighlighting false)
    Set {
        /// Setting key
        key: String,

        /// New value
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
}
