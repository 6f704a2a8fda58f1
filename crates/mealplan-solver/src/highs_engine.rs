//! HiGHS backend, enabled with the `highs` feature.

use ::highs::{HighsModelStatus, RowProblem, Sense};

use crate::engine::{Engine, EngineError, OptionError, OptionValue};
use crate::model::Model;
use crate::solution::{ModelStatus, RunOutput};

/// Engine that hands the model to HiGHS.
///
/// Options are checked against a scratch HiGHS instance when set and replayed
/// on the real instance at solve time.
#[derive(Default)]
pub struct HighsEngine {
    options: Vec<(String, OptionValue)>,
}

impl HighsEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply(model: &mut ::highs::Model, key: &str, value: &OptionValue) -> Result<(), OptionError> {
    let result = match value {
        OptionValue::Bool(v) => model.try_set_option(key, *v),
        OptionValue::Int(v) => match i32::try_from(*v) {
            Ok(v) => model.try_set_option(key, v),
            Err(_) => {
                return Err(OptionError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "integer out of range".to_string(),
                });
            }
        },
        OptionValue::Float(v) => model.try_set_option(key, *v),
        OptionValue::Str(v) => model.try_set_option(key, v.as_str()),
    };
    result.map_err(|status| OptionError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: format!("HiGHS rejected the option ({:?})", status),
    })
}

fn map_status(status: HighsModelStatus) -> ModelStatus {
    match status {
        HighsModelStatus::NotSet => ModelStatus::NotSet,
        HighsModelStatus::LoadError => ModelStatus::LoadError,
        HighsModelStatus::ModelError => ModelStatus::ModelError,
        HighsModelStatus::PresolveError => ModelStatus::PresolveError,
        HighsModelStatus::SolveError => ModelStatus::SolveError,
        HighsModelStatus::PostsolveError => ModelStatus::PostsolveError,
        HighsModelStatus::ModelEmpty => ModelStatus::ModelEmpty,
        HighsModelStatus::Optimal => ModelStatus::Optimal,
        HighsModelStatus::Infeasible => ModelStatus::Infeasible,
        HighsModelStatus::UnboundedOrInfeasible => ModelStatus::UnboundedOrInfeasible,
        HighsModelStatus::Unbounded => ModelStatus::Unbounded,
        HighsModelStatus::ObjectiveBound => ModelStatus::ObjectiveBound,
        HighsModelStatus::ObjectiveTarget => ModelStatus::ObjectiveTarget,
        HighsModelStatus::ReachedTimeLimit => ModelStatus::TimeLimit,
        HighsModelStatus::ReachedIterationLimit => ModelStatus::IterationLimit,
        #[allow(unreachable_patterns)]
        _ => ModelStatus::Unknown,
    }
}

impl Engine for HighsEngine {
    fn name(&self) -> &str {
        "highs"
    }

    fn version(&self) -> String {
        "bundled".to_string()
    }

    fn set_option(&mut self, key: &str, value: &OptionValue) -> Result<(), OptionError> {
        let mut scratch = RowProblem::default().optimise(Sense::Minimise);
        apply(&mut scratch, key, value)?;
        self.options.retain(|(k, _)| k != key);
        self.options.push((key.to_string(), value.clone()));
        Ok(())
    }

    fn run(&mut self, model: &Model) -> Result<RunOutput, EngineError> {
        model.validate()?;

        let mut problem = RowProblem::default();
        let columns: Vec<_> = (0..model.column_count)
            .map(|j| {
                problem.add_column(
                    model.objective_linear_weights[j],
                    model.column_lower_bounds[j]..=model.column_upper_bounds[j],
                )
            })
            .collect();
        for i in 0..model.row_count {
            let terms: Vec<_> = model
                .weights
                .row(i)
                .map(|(j, value)| (columns[j], value))
                .collect();
            problem.add_row(model.row_lower_bounds[i]..=model.row_upper_bounds[i], &terms);
        }

        let sense = if model.is_maximization {
            Sense::Maximise
        } else {
            Sense::Minimise
        };
        let mut highs = problem.optimise(sense);
        for (key, value) in &self.options {
            if let Err(err) = apply(&mut highs, key, value) {
                tracing::warn!(%key, "ignoring option: {}", err);
            }
        }

        let solved = highs
            .try_solve()
            .map_err(|status| EngineError::Backend(format!("HiGHS run failed: {:?}", status)))?;
        let status = map_status(solved.status());
        if !status.is_optimal() {
            return Ok(RunOutput::without_point(status, 0));
        }

        let column_values = solved.get_solution().columns().to_vec();
        Ok(RunOutput {
            status,
            objective: model.objective_value(&column_values),
            column_values,
            iterations: 0,
        })
    }
}
