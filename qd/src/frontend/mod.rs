//! Terminal front-ends standing in for the keyboard extension and the wizard
//!
//! Both drive a [`Session`](crate::session::Session); neither touches the
//! composer, tracker or surface directly.

mod keyboard;
mod wizard;

pub use keyboard::{KeyboardInput, KeyboardRepl, parse_keyboard_line};
pub use wizard::{WizardInput, WizardRepl, parse_wizard_line};

use std::sync::Arc;

use eyre::{Context, Result};
use tracing::{debug, info};

use crate::composer::InstructionTemplate;
use crate::config::Config;
use crate::generator::{Generator, create_generator};
use crate::handoff::{FileHandoff, HandoffGenerator};

/// Instruction template from config, or the embedded one
pub fn load_template(config: &Config) -> Result<Arc<InstructionTemplate>> {
    match config.composer.load_template()? {
        Some(source) => {
            info!("Using custom instruction template");
            Ok(Arc::new(InstructionTemplate::with_custom(&source)?))
        }
        None => Ok(Arc::new(InstructionTemplate::embedded())),
    }
}

/// Generator for an input surface: direct HTTP, or through the hand-off store
pub fn build_generator(config: &Config, handoff: bool) -> Result<Arc<dyn Generator>> {
    debug!(handoff, "build_generator: called");
    if handoff {
        let channel = FileHandoff::open(&config.handoff.store_path).context(format!(
            "Failed to open hand-off store at {}",
            config.handoff.store_path.display()
        ))?;
        info!(store = %config.handoff.store_path.display(), "Generating through hand-off store");
        Ok(Arc::new(HandoffGenerator::from_config(Arc::new(channel), &config.handoff)))
    } else {
        info!(endpoint = %config.generator.endpoint, "Generating over HTTP");
        create_generator(&config.generator).context("Failed to create HTTP generator")
    }
}
