//! Configuration loading and validation for ClawPipe.
//!
//! Loads configuration from `$CLAWPIPE_CONFIG` or `~/.clawpipe/config.toml`
//! with environment variable overrides. Validates all settings at startup.

use clawpipe_core::AgentOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.clawpipe/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Reasoning loop behavior
    #[serde(default)]
    pub agent: AgentOptions,

    /// Middleware chain settings
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Skill enablement
    #[serde(default)]
    pub skills: SkillsConfig,
}

/// Which cross-cutting layers wrap the reasoning loop, and the deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Hard wall-clock deadline for one execution
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Convert failures into user-safe text at the public boundary
    #[serde(default = "default_true")]
    pub contain_errors: bool,

    /// Mask credentials in the final answer
    #[serde(default = "default_true")]
    pub redact_secrets: bool,

    /// Log input, output and timing of every execution
    #[serde(default = "default_true")]
    pub log_requests: bool,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            contain_errors: true,
            redact_secrets: true,
            log_requests: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillsConfig {
    /// Skill names disabled at startup (case-insensitive)
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl AppConfig {
    /// Load configuration from `$CLAWPIPE_CONFIG`, falling back to
    /// `~/.clawpipe/config.toml`.
    ///
    /// Environment overrides (highest priority):
    /// - `CLAWPIPE_SYSTEM_PROMPT`
    /// - `CLAWPIPE_MAX_ITERATIONS`
    /// - `CLAWPIPE_TIMEOUT_SECS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("CLAWPIPE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));

        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides read through `lookup` (normally the process environment).
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(prompt) = lookup("CLAWPIPE_SYSTEM_PROMPT") {
            self.agent.system_prompt = Some(prompt).filter(|p| !p.trim().is_empty());
        }

        if let Some(raw) = lookup("CLAWPIPE_MAX_ITERATIONS") {
            self.agent.max_iterations = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "CLAWPIPE_MAX_ITERATIONS must be a non-negative integer, got '{raw}'"
                ))
            })?;
        }

        if let Some(raw) = lookup("CLAWPIPE_TIMEOUT_SECS") {
            self.middleware.timeout_secs = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "CLAWPIPE_TIMEOUT_SECS must be a positive integer, got '{raw}'"
                ))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".clawpipe")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.middleware.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "middleware.timeout_secs must be > 0".into(),
            ));
        }

        if self.skills.disabled.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "skills.disabled must not contain empty names".into(),
            ));
        }

        Ok(())
    }

    /// The execution deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.middleware.timeout_secs)
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
