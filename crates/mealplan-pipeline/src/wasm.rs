//! WASM bindings for the meal-plan pipeline
//!
//! The dataset arrives as CSV text and results go back as plain JS objects.
//! There is no filesystem here, so tuner results are returned rather than
//! persisted and solver options come from the caller only.

use std::time::Duration;

use wasm_bindgen::prelude::*;

use mealplan_solver::SolverOptions;
use mealplan_solver::presolve;

use crate::builder::{ModelBuilder, NutrientTargets, PlanObjective};
use crate::dataset::{Dataset, LoadMode};
use crate::driver::{SolveOutcome, default_engine, solve, solve_presolved};
use crate::report::PlanReport;
use crate::tuner::{Clock, Tuner};

/// Options accepted by [`solve_meal_plan`]
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WasmSolveOptions {
    options: SolverOptions,
    presolve: bool,
    strict: bool,
    targets: Option<NutrientTargets>,
    objective: PlanObjective,
    max_half_servings: Option<f64>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct WasmSolveResult {
    status: i32,
    objective: f64,
    column_values: Vec<f64>,
    /// Interpreted status for anything other than optimal
    error: Option<mealplan_solver::StatusInfo>,
    report: Option<PlanReport>,
    iterations: usize,
}

/// Millisecond clock backed by `Date.now()`
struct JsClock;

impl Clock for JsClock {
    type Mark = f64;

    fn start(&mut self) -> f64 {
        js_sys::Date::now()
    }

    fn stop(&mut self, mark: f64) -> Duration {
        Duration::from_secs_f64(((js_sys::Date::now() - mark) / 1000.0).max(0.0))
    }
}

fn load(csv: &str, strict: bool) -> Result<Dataset, JsValue> {
    let mode = if strict { LoadMode::Strict } else { LoadMode::Lenient };
    Dataset::from_reader(csv.as_bytes(), mode).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Solve a meal plan for a CSV dataset and return status, values and report
#[wasm_bindgen]
pub fn solve_meal_plan(csv: &str, options: JsValue) -> Result<JsValue, JsValue> {
    let request: WasmSolveOptions = if options.is_undefined() || options.is_null() {
        WasmSolveOptions::default()
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))?
    };

    let dataset = load(csv, request.strict)?;
    let mut builder = ModelBuilder::new().with_objective(request.objective);
    if let Some(targets) = request.targets {
        builder = builder.with_targets(targets);
    }
    if let Some(max) = request.max_half_servings {
        builder = builder.with_max_half_servings(max);
    }
    let model = builder.build(&dataset);

    let mut engine = default_engine();
    let outcome: SolveOutcome = if request.presolve {
        solve_presolved(&mut engine, &model, &request.options)
    } else {
        solve(&mut engine, &model, &request.options)
    }
    .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let report = (!outcome.column_values.is_empty())
        .then(|| PlanReport::from_column_values(&dataset, &outcome.column_values, builder.targets));
    let result = WasmSolveResult {
        status: outcome.status,
        objective: outcome.objective,
        error: outcome
            .diagnostic()
            .map(|e| mealplan_solver::StatusInfo { code: e.code, message: e.message }),
        column_values: outcome.column_values,
        report,
        iterations: outcome.info.iterations,
    };
    serde_wasm_bindgen::to_value(&result).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Column counts before and after presolve, as `{before, after}`
#[wasm_bindgen]
pub fn presolve_stats(csv: &str) -> Result<JsValue, JsValue> {
    let dataset = load(csv, false)?;
    let stats = presolve::stats(&ModelBuilder::new().build(&dataset));
    serde_wasm_bindgen::to_value(&stats).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Time the default thread grid on this dataset and return every trial
#[wasm_bindgen]
pub fn tune_meal_plan(csv: &str) -> Result<JsValue, JsValue> {
    let dataset = load(csv, false)?;
    let builder = ModelBuilder::new();
    let report = Tuner::new(default_engine)
        .with_clock(JsClock)
        .run(&dataset, |d: &Dataset| builder.build(d))
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&report).map_err(|e| JsValue::from_str(&e.to_string()))
}
