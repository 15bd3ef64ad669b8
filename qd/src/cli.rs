//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::surface::ApplyMode;

/// Qasida - compose a prompt, hand it off, get a poem back
#[derive(Parser)]
#[command(
    name = "qasida",
    about = "Compose prompts and apply generated poems to a live text surface",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive keyboard surface (default)
    Keyboard {
        /// Generate through the hand-off store instead of HTTP
        #[arg(long)]
        handoff: bool,

        /// Text already before the cursor
        #[arg(long, default_value = "")]
        context: String,
    },

    /// Step-by-step generation wizard
    Wizard {
        /// Generate through the hand-off store instead of HTTP
        #[arg(long)]
        handoff: bool,
    },

    /// Compose and generate once, then print the result
    Generate {
        /// Subject text
        #[arg(required = true)]
        text: Vec<String>,

        /// Verse count (1-7)
        #[arg(short = 'n', long)]
        lines: Option<u8>,

        /// Topic
        #[arg(short, long)]
        topic: Option<String>,

        /// Poetic style
        #[arg(short, long)]
        style: Option<String>,

        /// Generate through the hand-off store instead of HTTP
        #[arg(long)]
        handoff: bool,
    },

    /// Write an instruction to the hand-off store and wait for the answer
    Submit {
        /// Instruction text, sent as-is
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Answer prompts from the hand-off store over HTTP
    Executor {
        /// Handle one waiting prompt and exit
        #[arg(long)]
        once: bool,
    },

    /// Print the effective configuration
    Config,
}

impl Command {
    /// Where results land for this command
    pub fn apply_mode(&self) -> ApplyMode {
        match self {
            Command::Wizard { .. } => ApplyMode::Document,
            _ => ApplyMode::Preview,
        }
    }

    /// Apply mode after the `surface.apply-mode` config override
    ///
    /// The wizard only shows the document, so it always uses document mode.
    pub fn resolve_apply_mode(&self, configured: Option<ApplyMode>) -> ApplyMode {
        match self {
            Command::Wizard { .. } => ApplyMode::Document,
            _ => configured.unwrap_or_else(|| self.apply_mode()),
        }
    }
}
