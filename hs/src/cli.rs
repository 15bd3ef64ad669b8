//! CLI argument parsing for handoffstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hs")]
#[command(author, version, about = "Inspect the shared hand-off store", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Store directory (overrides config)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List keys present in the store
    List,

    /// Print the entry stored under a key
    Read {
        /// Key to read
        #[arg(required = true)]
        key: String,
    },

    /// Write a JSON payload under a key
    Write {
        /// Key to write
        #[arg(required = true)]
        key: String,

        /// JSON payload
        #[arg(required = true)]
        payload: String,
    },

    /// Remove a key
    Remove {
        /// Key to remove
        #[arg(required = true)]
        key: String,
    },

    /// Show the store change counter
    Version,
}
