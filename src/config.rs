//! Engine configuration
//!
//! Loaded from YAML; every field has a default so an empty file is valid.

use crate::graph::{ConceptId, IS_A, ROOT_CONCEPT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Which information content model to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IcStrategy {
    /// Derived from descendant counts
    #[default]
    Structural,
    /// Derived from an external concept frequency table
    Corpus,
}

/// Constants of the Choi–Kim measure: `exp(-alpha * len) * tanh(beta * depth(lca))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoiKimParams {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for ChoiKimParams {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            beta: 0.6,
        }
    }
}

/// Matrix output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Cell text written for unresolvable entries
    pub missing_label: String,
    /// Field separator for delimited output
    pub delimiter: char,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            missing_label: "NA".to_string(),
            delimiter: '\t',
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Top-level concept every concept generalizes to
    pub root: ConceptId,
    /// Relationship type treated as "is a"
    pub is_a: ConceptId,
    /// Keep rows whose status flag is 0
    pub include_inactive: bool,
    pub ic_strategy: IcStrategy,
    /// `conceptId<TAB>count` table for the corpus strategy
    pub frequency_table: Option<PathBuf>,
    pub choi_kim: ChoiKimParams,
    /// Matrix worker threads, 0 = one per core
    pub workers: usize,
    pub output: OutputConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: ROOT_CONCEPT,
            is_a: IS_A,
            include_inactive: false,
            ic_strategy: IcStrategy::Structural,
            frequency_table: None,
            choi_kim: ChoiKimParams::default(),
            workers: 0,
            output: OutputConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.ic_strategy == IcStrategy::Corpus && self.frequency_table.is_none() {
            return Err(ConfigError::Invalid(
                "ic_strategy 'corpus' needs frequency_table".to_string(),
            ));
        }
        if !(self.choi_kim.alpha >= 0.0 && self.choi_kim.beta >= 0.0) {
            return Err(ConfigError::Invalid(
                "choi_kim constants must be non-negative".to_string(),
            ));
        }
        if self.output.delimiter == '\n' || self.output.delimiter == '"' {
            return Err(ConfigError::Invalid(format!(
                "unusable delimiter {:?}",
                self.output.delimiter
            )));
        }
        Ok(())
    }
}
