//! Pipeline configuration, persisted as TOML.
//!
//! Every field has a default, so a partial file (or none at all) yields a
//! working configuration. The CLI layers its flags on top of whatever is
//! loaded here.

use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::canonicalize::DEFAULT_BATCH_SIZE;
use crate::grounding::{DEFAULT_MIN_LEN, GroundingRules};
use crate::model::TagStyle;
use crate::oracle::OllamaConfig;
use crate::tagger::CollisionPolicy;

/// Errors from loading, saving or validating a config file.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(lore::config::read),
        help("Ensure the config file exists, or create one with `loregraph init-config`.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(lore::config::parse),
        help("Check the TOML syntax. Unknown keys are ignored; values must have the right type.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(lore::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config value `{field}`: {message}")]
    #[diagnostic(code(lore::config::invalid), help("Fix the value in the config file or on the command line."))]
    Invalid { field: String, message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Settings for a full pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Values per oracle request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Minimum canonical-name length kept by grounding.
    #[serde(default = "default_min_len")]
    pub min_name_len: usize,
    /// Minimum alias length kept by grounding.
    #[serde(default = "default_min_len")]
    pub min_alias_len: usize,
    #[serde(default)]
    pub tag_style: TagStyle,
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
    /// Tag chapters on the rayon pool.
    #[serde(default)]
    pub parallel_tagging: bool,
    #[serde(default)]
    pub oracle: OllamaConfig,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_min_len() -> usize {
    DEFAULT_MIN_LEN
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            min_name_len: default_min_len(),
            min_alias_len: default_min_len(),
            tag_style: TagStyle::default(),
            collision_policy: CollisionPolicy::default(),
            parallel_tagging: false,
            oracle: OllamaConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse from TOML text. `origin` names the source in errors.
    pub fn from_toml_str(text: &str, origin: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Save to a TOML file, creating the parent directory.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        let positive = [
            ("batch_size", self.batch_size),
            ("min_name_len", self.min_name_len),
            ("min_alias_len", self.min_alias_len),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    message: "must be at least 1".into(),
                });
            }
        }
        if !self.oracle.temperature.is_finite() || self.oracle.temperature < 0.0 {
            return Err(ConfigError::Invalid {
                field: "oracle.temperature".into(),
                message: format!("must be a non-negative number, got {}", self.oracle.temperature),
            });
        }
        if self.oracle.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "oracle.model".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn grounding_rules(&self) -> GroundingRules {
        GroundingRules {
            min_name_len: self.min_name_len,
            min_alias_len: self.min_alias_len,
        }
    }
}
