//! Runtime configuration
//!
//! Provides centralized configuration management with:
//! - Config file loading (optional, TOML)
//! - Environment variable overrides
//! - Runtime defaults
//! - Validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub processing: ProcessingConfig,
    pub streaming: StreamingConfig,
    pub output: OutputConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Number of event files parsed in parallel per chunk
    pub batch_size: usize,
    /// Whether directories given on the command line are searched recursively
    pub recursive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    pub poll_interval_secs: u64,
    /// Stop after this many polling cycles; unbounded when absent
    pub max_cycles: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub json_pretty: bool,
    pub metrics_file: String,
    pub top_chains_file: String,
    pub top_quantities_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub log_directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "ERROR".to_string(),
                format: "pretty".to_string(),
                output: "console".to_string(),
            },
            processing: ProcessingConfig {
                batch_size: 10,
                recursive: true,
            },
            streaming: StreamingConfig {
                poll_interval_secs: 5,
                max_cycles: None,
            },
            output: OutputConfig {
                json_pretty: true,
                metrics_file: "metrics_by_npi_ndc.json".to_string(),
                top_chains_file: "top2_chain_per_ndc.json".to_string(),
                top_quantities_file: "most_common_qty_per_ndc.json".to_string(),
            },
            paths: PathsConfig {
                log_directory: PathBuf::from("logs"),
            },
        }
    }
}

impl Config {
    /// Load configuration from file, environment, and defaults
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        let config_paths = [
            PathBuf::from("claims-processor.toml"),
            PathBuf::from(".claims-processor.toml"),
            dirs::config_dir()
                .map(|d| d.join("claims-processor").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                info!(config_file = %path.display(), "Loading configuration from file");
                config = Self::load_from_file(path)?;
                break;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        if let Ok(val) = env::var("CLAIMS_BATCH_SIZE") {
            self.processing.batch_size = val.parse().context("Invalid CLAIMS_BATCH_SIZE")?;
        }
        if let Ok(val) = env::var("CLAIMS_POLL_INTERVAL_SECS") {
            self.streaming.poll_interval_secs =
                val.parse().context("Invalid CLAIMS_POLL_INTERVAL_SECS")?;
        }
        if let Ok(val) = env::var("CLAIMS_JSON_PRETTY") {
            self.output.json_pretty = val.parse().context("Invalid CLAIMS_JSON_PRETTY")?;
        }

        if let Ok(val) = env::var("CLAIMS_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.processing.batch_size == 0 {
            anyhow::bail!("Batch size must be greater than 0");
        }

        if self.streaming.poll_interval_secs == 0 {
            anyhow::bail!("Poll interval must be at least 1 second");
        }

        let names = [
            &self.output.metrics_file,
            &self.output.top_chains_file,
            &self.output.top_quantities_file,
        ];
        if names.iter().any(|name| name.trim().is_empty()) {
            anyhow::bail!("Output file names must not be empty");
        }
        if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
            anyhow::bail!("Output file names must be distinct");
        }

        Ok(())
    }

    /// Save current configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(path = %path.display(), "Configuration saved to file");

        Ok(())
    }
}
