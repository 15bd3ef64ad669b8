//! Qasida configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::surface::ApplyMode;

/// Main Qasida configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level used when `--log-level` is not given
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Generation endpoint
    pub generator: GeneratorConfig,

    /// Cross-process hand-off
    pub handoff: HandoffConfig,

    /// Instruction template
    pub composer: ComposerConfig,

    /// Where results land
    pub surface: SurfaceConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .qasida.yml
        let local_config = PathBuf::from(".qasida.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/qasida/qasida.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("qasida").join("qasida.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Log level from config, read before logging is set up
    ///
    /// Errors are swallowed here; the full `load` reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".qasida.yml")];
                if let Some(config_dir) = dirs::config_dir() {
                    paths.push(config_dir.join("qasida").join("qasida.yml"));
                }
                paths
            }
        };

        candidates
            .iter()
            .filter(|path| path.exists())
            .find_map(|path| fs::read_to_string(path).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Validate values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.generator.endpoint.trim().is_empty() {
            return Err(eyre::eyre!("generator.endpoint must not be empty"));
        }
        if self.generator.timeout_ms == 0 {
            return Err(eyre::eyre!("generator.timeout-ms must be greater than zero"));
        }
        if self.handoff.poll_interval_ms == 0 {
            return Err(eyre::eyre!("handoff.poll-interval-ms must be greater than zero"));
        }
        if self.handoff.max_wait_ms < self.handoff.poll_interval_ms {
            return Err(eyre::eyre!(
                "handoff.max-wait-ms ({}) is shorter than handoff.poll-interval-ms ({})",
                self.handoff.max_wait_ms,
                self.handoff.poll_interval_ms
            ));
        }
        Ok(())
    }
}

/// Generation endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// URL receiving `{"prompt": ...}`
    pub endpoint: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/generate_poem".to_string(),
            timeout_ms: 60_000,
        }
    }
}

/// Hand-off store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    /// Directory shared by the input surface and the executor
    #[serde(rename = "store-path")]
    pub store_path: PathBuf,

    /// Longest time to wait for the executor's answer
    #[serde(rename = "max-wait-ms")]
    pub max_wait_ms: u64,

    /// How often to look for an answer
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            store_path: handoffstore::default_store_path(),
            max_wait_ms: 30_000,
            poll_interval_ms: 250,
        }
    }
}

/// Composer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Handlebars file replacing the embedded instruction template
    pub template: Option<PathBuf>,
}

impl ComposerConfig {
    /// Read the custom template, if one is configured
    pub fn load_template(&self) -> Result<Option<String>> {
        match &self.template {
            Some(path) => {
                let source = fs::read_to_string(path)
                    .context(format!("Failed to read instruction template {}", path.display()))?;
                Ok(Some(source))
            }
            None => Ok(None),
        }
    }
}

/// Surface configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    #[serde(rename = "apply-mode")]
    pub apply_mode: Option<ApplyMode>,
}
