//! `cook.yaml` parsing and validation.
//!
//! Parses the sprout table and validates structural constraints:
//! - At least one sprout must be declared
//! - Every sprout path must be non-empty and absolute
//! - `default_sprout` must name a declared sprout

use super::error::{CookError, Result};
use super::types::{IncludePolicy, Sprout};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level `cook.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CookConfig {
    /// Named sprouts (order-preserving).
    #[serde(default)]
    pub sprouts: IndexMap<String, SproutConfig>,

    /// Sprout used when none is named on the command line.
    #[serde(default)]
    pub default_sprout: Option<String>,

    #[serde(default)]
    pub include_policy: IncludePolicy,
}

/// A single sprout entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SproutConfig {
    pub path: PathBuf,
}

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl CookConfig {
    /// Pick a sprout: `name` if given, else `default_sprout`, else the only
    /// declared sprout.
    pub fn sprout(&self, name: Option<&str>) -> Result<Sprout> {
        let name = match name.or(self.default_sprout.as_deref()) {
            Some(name) => name,
            None if self.sprouts.len() == 1 => {
                self.sprouts.keys().next().map_or("", |k| k.as_str())
            }
            None => {
                return Err(CookError::Config(
                    "no sprout selected and no default_sprout set".to_string(),
                ))
            }
        };
        let entry = self
            .sprouts
            .get(name)
            .ok_or_else(|| CookError::Config(format!("unknown sprout '{name}'")))?;
        Ok(Sprout::new(name, &entry.path))
    }
}

/// Parse a cook.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<CookConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CookError::io(path, e))?;
    parse_config(&content)
}

/// Parse a cook.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<CookConfig> {
    serde_yaml_ng::from_str(yaml).map_err(|e| CookError::Config(format!("YAML parse error: {e}")))
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &CookConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.sprouts.is_empty() {
        errors.push(ValidationError {
            message: "no sprouts declared".to_string(),
        });
    }

    for (name, sprout) in &config.sprouts {
        if sprout.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                message: format!("sprout '{name}' has an empty path"),
            });
        } else if sprout.path.is_relative() {
            errors.push(ValidationError {
                message: format!(
                    "sprout '{name}' path {} must be absolute",
                    sprout.path.display()
                ),
            });
        }
    }

    if let Some(default) = &config.default_sprout {
        if !config.sprouts.contains_key(default) {
            errors.push(ValidationError {
                message: format!("default_sprout '{default}' is not a declared sprout"),
            });
        }
    }

    errors
}
