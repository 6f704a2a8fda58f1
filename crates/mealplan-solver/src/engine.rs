use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::model::{Model, ModelError};
use crate::solution::{ModelStatus, RunOutput};

/// Scalar option value, one of the four kinds HiGHS options take.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl OptionValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(v) => Some(*v),
            OptionValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            OptionValue::Int(v) => Some(*v as f64),
            OptionValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Parse a command-line style value: `true`/`false`, integer, float, or text.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Ok(b) = text.parse::<bool>() {
            OptionValue::Bool(b)
        } else if let Ok(i) = text.parse::<i64>() {
            OptionValue::Int(i)
        } else if let Ok(f) = text.parse::<f64>() {
            OptionValue::Float(f)
        } else {
            OptionValue::Str(text.to_string())
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(v) => write!(f, "{}", v),
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Float(v)
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Str(v.to_string())
    }
}

/// Named solver options, ordered by key so application order is deterministic.
pub type SolverOptions = BTreeMap<String, OptionValue>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionError {
    #[error("Unknown option '{0}'")]
    Unknown(String),
    #[error("Invalid value '{value}' for option '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid model: {0}")]
    InvalidModel(#[from] ModelError),
    #[error("Backend failure: {0}")]
    Backend(String),
}

/// A solver backend.
///
/// An engine instance owns its option state; one instance solves one model at a time.
pub trait Engine {
    fn name(&self) -> &str;

    fn version(&self) -> String;

    /// Apply a single option. Rejections leave earlier options in place.
    fn set_option(&mut self, key: &str, value: &OptionValue) -> Result<(), OptionError>;

    /// Solve `model` synchronously.
    fn run(&mut self, model: &Model) -> Result<RunOutput, EngineError>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn version(&self) -> String {
        (**self).version()
    }

    fn set_option(&mut self, key: &str, value: &OptionValue) -> Result<(), OptionError> {
        (**self).set_option(key, value)
    }

    fn run(&mut self, model: &Model) -> Result<RunOutput, EngineError> {
        (**self).run(model)
    }
}

/// Apply every option, logging the ones the engine rejects.
///
/// Returns the keys that were rejected.
pub fn apply_options<E: Engine + ?Sized>(engine: &mut E, options: &SolverOptions) -> Vec<String> {
    let mut rejected = Vec::new();
    for (key, value) in options {
        match engine.set_option(key, value) {
            Ok(()) => tracing::debug!(engine = engine.name(), %key, %value, "option applied"),
            Err(err) => {
                tracing::warn!(engine = engine.name(), %key, %value, "ignoring option: {}", err);
                rejected.push(key.clone());
            }
        }
    }
    rejected
}

#[derive(Error, Debug)]
pub enum PreflightError {
    #[error("{engine} failed the startup check: {source}")]
    Engine {
        engine: String,
        #[source]
        source: EngineError,
    },
    #[error("{engine} returned status {status:?} for a trivial model")]
    WrongStatus { engine: String, status: ModelStatus },
    #[error("{engine} returned {value} for a trivial model, expected 1")]
    WrongValue { engine: String, value: f64 },
}

/// Startup validation: solve `x in [0, 2], 1 <= x <= 1` and check the answer.
pub fn preflight<E: Engine + ?Sized>(engine: &mut E) -> Result<(), PreflightError> {
    tracing::info!(engine = engine.name(), version = %engine.version(), "solver backend");

    let mut model = Model::new(1);
    model.set_column_bounds(0, 0.0, 2.0);
    model.add_row(1.0, 1.0, &[(0, 1.0)]);

    let output = engine.run(&model).map_err(|source| PreflightError::Engine {
        engine: engine.name().to_string(),
        source,
    })?;
    if !output.status.is_optimal() {
        return Err(PreflightError::WrongStatus {
            engine: engine.name().to_string(),
            status: output.status,
        });
    }
    let value = output.column_values.first().copied().unwrap_or(f64::NAN);
    if (value - 1.0).abs() > 1e-6 {
        return Err(PreflightError::WrongValue {
            engine: engine.name().to_string(),
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_option_values() {
        assert_eq!(OptionValue::parse("4"), OptionValue::Int(4));
        assert_eq!(OptionValue::parse("2.5"), OptionValue::Float(2.5));
        assert_eq!(OptionValue::parse("true"), OptionValue::Bool(true));
        assert_eq!(OptionValue::parse(" choose "), OptionValue::Str("choose".into()));
    }

    #[test]
    fn test_whole_floats_read_as_ints() {
        assert_eq!(OptionValue::Float(2.0).as_int(), Some(2));
        assert_eq!(OptionValue::Float(2.5).as_int(), None);
        assert_eq!(OptionValue::Str("2".into()).as_int(), None);
    }
}
