use mealplan_solver::{EngineError, SolverError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::dataset::DatasetError;
use crate::tuner::TuneError;

/// Any failure between reading the dataset and producing a plan
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tune(#[from] TuneError),
    #[error("Solver failed: {0}")]
    Engine(#[from] EngineError),
    #[error("{}: {}", .0.code, .0.message)]
    Solver(#[from] SolverError),
}
