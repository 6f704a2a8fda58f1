mod engine;
#[cfg(feature = "highs")]
mod highs_engine;
mod model;
pub mod presolve;
mod simplex;
mod solution;
mod status;

pub use engine::{
    Engine, EngineError, OptionError, OptionValue, PreflightError, SolverOptions, apply_options,
    preflight,
};
#[cfg(feature = "highs")]
pub use highs_engine::HighsEngine;
pub use model::{Model, ModelError, RowMatrix};
pub use presolve::{Presolved, PresolveStats};
pub use simplex::SimplexEngine;
pub use solution::{ModelStatus, RunOutput};
pub use status::{ErrorKind, RawStatus, SolverError, StatusInfo, interpret_status};
