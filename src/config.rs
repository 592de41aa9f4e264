//! Widecheck Configuration
//!
//! Handles parsing and management of widecheck.toml configuration files.

use crate::explorer::DEFAULT_BASE_URL;
use crate::grade::{BaselineError, PerfectBaseline};
use crate::report::DEFAULT_ROWS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the configuration file searched for from the working directory up.
pub const CONFIG_FILE: &str = "widecheck.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching widecheck.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WidecheckConfig {
    /// Compiler Explorer endpoint
    #[serde(default)]
    pub explorer: ExplorerConfig,

    /// Codegen grading
    #[serde(default)]
    pub grading: GradingConfig,

    /// Self-checking program generation
    #[serde(default)]
    pub fuzz: FuzzConfig,
}

impl WidecheckConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let mut config: WidecheckConfig = toml::from_str(&content)?;
        config.resolve_paths(path.parent().unwrap_or_else(|| Path::new(".")));
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().map_err(ConfigError::Io)?;
        Self::find_and_load(&cwd)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                tracing::debug!(path = %config_path.display(), "loading config");
                return Self::load(&config_path);
            }
            if !dir.pop() {
                // Reached root without finding config
                return Ok(Self::default());
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.explorer.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "explorer.timeout_secs must be positive".to_string(),
            ));
        }
        if self.grading.workers == 0 {
            return Err(ConfigError::Invalid(
                "grading.workers must be at least 1".to_string(),
            ));
        }
        if self.grading.rows.is_empty() {
            return Err(ConfigError::Invalid(
                "grading.rows must name at least one function".to_string(),
            ));
        }
        if self.fuzz.widths.is_empty() {
            return Err(ConfigError::Invalid(
                "fuzz.widths must name at least one width".to_string(),
            ));
        }
        Ok(())
    }

    /// Relative paths in a config file are relative to that file.
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.grading.template);
        if let Some(baselines) = self.grading.baselines.as_mut() {
            resolve(baselines);
        }
    }

    /// The baseline table to grade against: the configured file if any,
    /// otherwise the bundled one.
    pub fn perfect_baseline(&self) -> Result<PerfectBaseline, BaselineError> {
        match &self.grading.baselines {
            Some(path) => {
                tracing::warn!(path = %path.display(), "using baselines from file instead of bundled table");
                PerfectBaseline::load(path)
            }
            None => PerfectBaseline::bundled(),
        }
    }
}

/// Compiler Explorer endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Base URL of the instance
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl ExplorerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Codegen grading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Header whose commented-out harness is activated per measurement
    #[serde(default = "default_template")]
    pub template: PathBuf,

    /// Replacement baseline table (TOML)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baselines: Option<PathBuf>,

    /// Concurrent compile requests; 1 runs sequentially
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Harness functions to grade, in table order
    #[serde(default = "default_rows")]
    pub rows: Vec<String>,
}

fn default_template() -> PathBuf {
    PathBuf::from("wider.h")
}

fn default_workers() -> usize {
    1
}

fn default_rows() -> Vec<String> {
    DEFAULT_ROWS.iter().map(|r| r.to_string()).collect()
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            baselines: None,
            workers: default_workers(),
            rows: default_rows(),
        }
    }
}

/// Self-checking program generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzConfig {
    /// Blocks per bit width
    #[serde(default = "default_count")]
    pub count: usize,

    /// Bit widths to exercise
    #[serde(default = "default_widths")]
    pub widths: Vec<u32>,

    /// Output file path
    #[serde(default = "default_fuzz_output")]
    pub output: String,
}

fn default_count() -> usize {
    1000
}

fn default_widths() -> Vec<u32> {
    vec![128]
}

fn default_fuzz_output() -> String {
    "fuzzy.cc".to_string()
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            widths: default_widths(),
            output: default_fuzz_output(),
        }
    }
}
