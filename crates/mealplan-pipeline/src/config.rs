//! Persisted solver options and nutrient target files.
//!
//! The tuner config is a flat JSON object of option name to scalar value,
//! e.g. `{"threads": 2}`. Writes are last-writer-wins with no file locking:
//! two tuning runs finishing together can overwrite each other's result.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mealplan_solver::SolverOptions;
use thiserror::Error;

use crate::builder::NutrientTargets;

pub const DEFAULT_CONFIG_FILE: &str = "mealplan-tuner.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read the tuner config, failing on any problem.
pub fn try_load_config(path: impl AsRef<Path>) -> Result<SolverOptions, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the tuner config; a missing or unreadable file yields no options.
pub fn load_config(path: impl AsRef<Path>) -> SolverOptions {
    let path = path.as_ref();
    match try_load_config(path) {
        Ok(options) => {
            tracing::debug!(path = %path.display(), count = options.len(), "loaded tuner config");
            options
        }
        Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no tuner config, using solver defaults");
            SolverOptions::new()
        }
        Err(err) => {
            tracing::warn!("ignoring tuner config: {}", err);
            SolverOptions::new()
        }
    }
}

/// Overwrite the tuner config with `options`, pretty-printed.
pub fn save_config(path: impl AsRef<Path>, options: &SolverOptions) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(options).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json + "\n").map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "saved tuner config");
    Ok(())
}

/// Read nutrient targets; nutrients missing from the file keep their defaults.
pub fn load_targets(path: impl AsRef<Path>) -> Result<NutrientTargets, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}
