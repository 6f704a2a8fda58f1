use std::path::{Path, PathBuf};

use mealplan_solver::presolve::{self, PresolveStats};
use mealplan_solver::{
    Engine, EngineError, ErrorKind, Model, ModelStatus, SolverError, SolverOptions, apply_options,
};

use crate::builder::ModelBuilder;
use crate::config::{DEFAULT_CONFIG_FILE, load_config};
use crate::dataset::Dataset;
use crate::error::PipelineError;
use crate::report::PlanReport;
use crate::tuner::Tuner;

/// Engine used when the caller does not bring one.
pub fn default_engine() -> Box<dyn Engine> {
    #[cfg(feature = "highs")]
    {
        Box::new(mealplan_solver::HighsEngine::new())
    }
    #[cfg(not(feature = "highs"))]
    {
        Box::new(mealplan_solver::SimplexEngine::new())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SolveInfo {
    pub engine: String,
    pub iterations: usize,
    /// Option keys the engine refused
    pub rejected_options: Vec<String>,
    /// Column counts when the model was presolved first
    pub presolve: Option<PresolveStats>,
}

/// Result of one solve: status in HiGHS numbering, objective, and one value per column
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SolveOutcome {
    pub status: i32,
    pub objective: f64,
    pub column_values: Vec<f64>,
    pub info: SolveInfo,
}

impl SolveOutcome {
    pub fn is_optimal(&self) -> bool {
        self.status == ModelStatus::OPTIMAL
    }

    /// Interpreted failure for any status other than optimal.
    pub fn diagnostic(&self) -> Option<SolverError> {
        if self.is_optimal() {
            None
        } else {
            Some(SolverError::from_status(self.status))
        }
    }

    /// Keep optimal and numerically shaky results, reject the rest.
    pub fn into_result(self) -> Result<Self, SolverError> {
        match self.diagnostic() {
            Some(err) if err.code != ErrorKind::Numerical => Err(err),
            _ => Ok(self),
        }
    }
}

/// Config-file options overlaid with `overrides`, key by key.
pub fn effective_options(config_path: &Path, overrides: &SolverOptions) -> SolverOptions {
    let mut options = load_config(config_path);
    for (key, value) in overrides {
        options.insert(key.clone(), value.clone());
    }
    options
}

/// Apply `options` best-effort and run `model` on `engine`.
///
/// Engine failures propagate; solver statuses are reported in the outcome.
pub fn solve<E: Engine + ?Sized>(
    engine: &mut E,
    model: &Model,
    options: &SolverOptions,
) -> Result<SolveOutcome, EngineError> {
    let rejected_options = apply_options(engine, options);
    let output = engine.run(model)?;

    let outcome = SolveOutcome {
        status: output.status_code(),
        objective: output.objective,
        column_values: output.column_values,
        info: SolveInfo {
            engine: engine.name().to_string(),
            iterations: output.iterations,
            rejected_options,
            presolve: None,
        },
    };

    match outcome.diagnostic() {
        None => tracing::info!(
            engine = %outcome.info.engine,
            iterations = outcome.info.iterations,
            objective = outcome.objective,
            "solve finished"
        ),
        Some(err) if err.code == ErrorKind::Numerical => {
            tracing::warn!(status = outcome.status, "{}; continuing with the returned values", err)
        }
        Some(err) => tracing::warn!(status = outcome.status, kind = %err.code, "{}", err),
    }
    Ok(outcome)
}

/// Presolve `model`, solve the reduced model, and map the values back.
pub fn solve_presolved<E: Engine + ?Sized>(
    engine: &mut E,
    model: &Model,
    options: &SolverOptions,
) -> Result<SolveOutcome, EngineError> {
    let reduced = presolve::run_with_postsolve(model);
    let stats = PresolveStats {
        before: model.column_count,
        after: reduced.model.column_count,
    };
    tracing::info!(before = stats.before, after = stats.after, "presolved model");

    let mut outcome = solve(engine, &reduced.model, options)?;
    if !outcome.column_values.is_empty() {
        outcome.column_values = reduced.expand(&outcome.column_values);
    }
    outcome.info.presolve = Some(stats);
    Ok(outcome)
}

/// How a plan should be produced
#[derive(Debug, Clone)]
pub struct SolveRequest {
    pub config_path: PathBuf,
    /// Caller options, applied over the persisted config
    pub overrides: SolverOptions,
    /// Re-run the tuner before solving and persist its winner
    pub auto_tune: bool,
    pub presolve: bool,
}

impl Default for SolveRequest {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            overrides: SolverOptions::new(),
            auto_tune: false,
            presolve: false,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PlanOutcome {
    pub solve: SolveOutcome,
    /// Present when the solver returned a point
    pub report: Option<PlanReport>,
}

/// Dataset to report: build, optionally tune and presolve, solve.
pub struct MealPlanner<F> {
    pub builder: ModelBuilder,
    engine_factory: F,
}

impl MealPlanner<fn() -> Box<dyn Engine>> {
    pub fn with_default_engine(builder: ModelBuilder) -> Self {
        Self::new(builder, default_engine)
    }
}

impl<F, E> MealPlanner<F>
where
    F: FnMut() -> E,
    E: Engine,
{
    pub fn new(builder: ModelBuilder, engine_factory: F) -> Self {
        Self {
            builder,
            engine_factory,
        }
    }

    pub fn plan(&mut self, dataset: &Dataset, request: &SolveRequest) -> Result<PlanOutcome, PipelineError> {
        if request.auto_tune {
            let builder = &self.builder;
            Tuner::new(&mut self.engine_factory).tune(
                dataset,
                |d: &Dataset| builder.build(d),
                &request.config_path,
            )?;
        }

        let options = effective_options(&request.config_path, &request.overrides);
        let model = self.builder.build(dataset);
        tracing::info!(
            meals = dataset.meal_count(),
            rows = model.row_count,
            "solving meal plan"
        );

        let mut engine = (self.engine_factory)();
        let outcome = if request.presolve {
            solve_presolved(&mut engine, &model, &options)?
        } else {
            solve(&mut engine, &model, &options)?
        };

        let report = (!outcome.column_values.is_empty()).then(|| {
            PlanReport::from_column_values(dataset, &outcome.column_values, self.builder.targets)
        });
        Ok(PlanOutcome {
            solve: outcome,
            report,
        })
    }
}
