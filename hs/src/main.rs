use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use handoffstore::cli::{Cli, Command};
use handoffstore::config::Config;
use handoffstore::{Entry, HandoffStore, WriteOutcome};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let store_path = cli.store.unwrap_or(config.store_path);

    info!("hs opening store at {}", store_path.display());
    let store = HandoffStore::open(&store_path)?;

    match cli.command {
        Command::List => {
            let keys = store.keys()?;
            if keys.is_empty() {
                println!("No entries found");
            } else {
                for key in keys {
                    println!("{}", key);
                }
            }
        }
        Command::Read { key } => match store.read(&key)? {
            Some(entry) => {
                println!("{} {}", entry.key.cyan(), entry.written_at.to_string().dimmed());
                println!("{}", serde_json::to_string_pretty(&entry.payload)?);
            }
            None => println!("{} {} is pending or absent", "…".yellow(), key),
        },
        Command::Write { key, payload } => {
            let payload: serde_json::Value = serde_json::from_str(&payload).context("Payload is not valid JSON")?;
            match store.write(&Entry::new(key.clone(), payload))? {
                WriteOutcome::Written => println!("{} Wrote {}", "✓".green(), key.cyan()),
                WriteOutcome::Stale { current_written_at } => {
                    println!("{} {} already has a newer entry ({})", "✗".red(), key, current_written_at)
                }
            }
        }
        Command::Remove { key } => {
            if store.remove(&key)? {
                println!("{} Removed {}", "✓".green(), key);
            } else {
                println!("No entry for {}", key);
            }
        }
        Command::Version => {
            println!("{}", store.version());
        }
    }

    Ok(())
}
