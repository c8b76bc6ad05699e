//! Run configuration for `predict`: an optional TOML file merged with
//! command-line flags (flags win).

use std::fs;
use std::path::{Path, PathBuf};

use ecrisk_model::{Grouping, PredictError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL_PATH: &str = "final_result/model_artifact.json";
pub const DEFAULT_OUTPUT_PATH: &str = "prediction_results";
pub const DEFAULT_MAX_REPORTED_ERRORS: usize = 20;

/// Contents of a `predict.toml` file. Every key is optional.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PredictConfig {
    pub model: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub id_column: Option<String>,
    pub sheet: Option<String>,
    pub grouping: Option<Grouping>,
    pub skip_invalid: Option<bool>,
    pub max_reported_errors: Option<usize>,
}

impl PredictConfig {
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, PredictError> {
        let origin = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|e| PredictError::Config {
            origin: origin.clone(),
            reason: e.to_string(),
        })?;
        let config = Self::parse(&text).map_err(|e| PredictError::Config {
            origin,
            reason: e.message().to_string(),
        })?;
        log::debug!("loaded run configuration from {}", path.display());
        Ok(config)
    }
}

/// Values given on the command line. `None` / `false` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub id_column: Option<String>,
    pub sheet: Option<String>,
    pub grouping: Option<Grouping>,
    pub skip_invalid: bool,
}

/// Fully resolved settings for one prediction run.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictOptions {
    pub input: PathBuf,
    pub model: PathBuf,
    pub output: PathBuf,
    /// Overrides the artifact's `id_column` when set.
    pub id_column: Option<String>,
    pub sheet: Option<String>,
    pub grouping: Grouping,
    pub skip_invalid: bool,
    pub max_reported_errors: usize,
}

impl PredictOptions {
    /// Defaults, then the config file, then command-line flags.
    pub fn resolve(input: PathBuf, config: PredictConfig, cli: Overrides) -> Self {
        Self {
            input,
            model: cli
                .model
                .or(config.model)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            output: cli
                .output
                .or(config.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH)),
            id_column: cli.id_column.or(config.id_column),
            sheet: cli.sheet.or(config.sheet),
            grouping: cli.grouping.or(config.grouping).unwrap_or_default(),
            skip_invalid: cli.skip_invalid || config.skip_invalid.unwrap_or(false),
            max_reported_errors: config
                .max_reported_errors
                .unwrap_or(DEFAULT_MAX_REPORTED_ERRORS),
        }
    }
}
