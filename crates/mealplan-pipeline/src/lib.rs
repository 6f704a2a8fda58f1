//! Meal-plan optimization pipeline.
//!
//! Dataset loading, model building, optional presolve and tuning, solving,
//! and the plan report. The LP machinery lives in `mealplan-solver`.

pub mod builder;
pub mod config;
pub mod dataset;
pub mod driver;
pub mod error;
pub mod report;
pub mod tuner;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use builder::{ModelBuilder, Nutrient, NutrientTargets, PlanObjective, Range, build_model};
pub use config::{ConfigError, DEFAULT_CONFIG_FILE, load_config, load_targets, save_config};
pub use dataset::{Dataset, DatasetError, LoadMode, MealRecord};
pub use driver::{
    MealPlanner, PlanOutcome, SolveInfo, SolveOutcome, SolveRequest, default_engine, solve,
    solve_presolved,
};
pub use error::PipelineError;
pub use report::{NutrientTotals, PlanReport, SelectedMeal};
pub use tuner::{Clock, SystemClock, TuneError, TuneReport, Tuner, auto_tune};
