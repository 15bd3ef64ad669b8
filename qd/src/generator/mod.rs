//! Generation Client
//!
//! Owns one round trip to whatever produces poems: the HTTP endpoint, or the
//! hand-off store when the network-capable executor lives in another process.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod http;
mod types;

pub use client::{Generator, generate};
pub use error::GenerateError;
pub use http::HttpGenerator;
pub use types::{ErrorKind, GenerationResult, normalize_line_breaks};

use crate::config::GeneratorConfig;

/// Create the HTTP generator described by config
pub fn create_generator(config: &GeneratorConfig) -> Result<Arc<dyn Generator>, GenerateError> {
    debug!(endpoint = %config.endpoint, timeout_ms = config.timeout_ms, "create_generator: called");
    Ok(Arc::new(HttpGenerator::from_config(config)?))
}
