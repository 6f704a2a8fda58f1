use std::time::{Duration, Instant};

use crate::engine::{Engine, EngineError, OptionError, OptionValue};
use crate::model::Model;
use crate::solution::{ModelStatus, RunOutput};

/// Consecutive degenerate pivots before pricing switches to Bland's rule
const BLAND_AFTER: usize = 50;

/// Bounded two-phase simplex over a dense tableau.
///
/// Every model column and every row activity is a variable with its own
/// `[lower, upper]` bounds; nonbasic variables rest at one of their bounds, so
/// column bounds never become tableau rows and the tableau stays `row_count` high.
pub struct SimplexEngine {
    /// Maximum pivots and bound flips across both phases
    max_iterations: usize,
    /// Tolerance for pivot and reduced-cost comparisons
    tolerance: f64,
    /// Tolerance on bound and row violations of the final point
    feasibility_tolerance: f64,
    time_limit: Option<Duration>,
    threads: usize,
}

impl Default for SimplexEngine {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
            tolerance: 1e-9,
            feasibility_tolerance: 1e-7,
            time_limit: None,
            threads: 1,
        }
    }
}

impl SimplexEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Solve the model with the two-phase bounded simplex method
    pub fn solve(&self, model: &Model) -> RunOutput {
        if model.column_count == 0 && model.row_count == 0 {
            return RunOutput::without_point(ModelStatus::ModelEmpty, 0);
        }
        if !model.is_numeric() {
            tracing::warn!("model contains NaN bounds or non-finite coefficients");
            return RunOutput::without_point(ModelStatus::ModelError, 0);
        }
        if has_crossed_bounds(&model.column_lower_bounds, &model.column_upper_bounds)
            || has_crossed_bounds(&model.row_lower_bounds, &model.row_upper_bounds)
        {
            return RunOutput::without_point(ModelStatus::Infeasible, 0);
        }

        let mut tableau = self.build_tableau(model);
        let mut budget = Budget {
            iterations: 0,
            limit: self.max_iterations,
            deadline: self.time_limit.and_then(|limit| Instant::now().checked_add(limit)),
        };

        // Phase 1: drive the artificial variables to zero
        let phase1_costs: Vec<f64> = (0..tableau.n_total())
            .map(|j| if j >= tableau.art_start { 1.0 } else { 0.0 })
            .collect();
        tableau.set_costs(&phase1_costs);
        match self.iterate(&mut tableau, &mut budget) {
            PhaseResult::Optimal => {}
            PhaseResult::Unbounded => {
                return RunOutput::without_point(ModelStatus::SolveError, budget.iterations);
            }
            PhaseResult::Limit(status) => {
                return RunOutput::without_point(status, budget.iterations);
            }
        }

        let infeasibility: f64 = (tableau.art_start..tableau.n_total())
            .map(|j| tableau.values[j])
            .sum();
        if infeasibility > self.feasibility_tolerance * (1.0 + row_bound_scale(model)) {
            return RunOutput::without_point(ModelStatus::Infeasible, budget.iterations);
        }

        // Artificials may stay basic, but only at zero
        for j in tableau.art_start..tableau.n_total() {
            tableau.upper[j] = 0.0;
            if !tableau.is_basic[j] {
                tableau.values[j] = 0.0;
            }
        }

        // Phase 2: optimize the real objective (the engine always minimizes)
        let sign = if model.is_maximization { -1.0 } else { 1.0 };
        let mut phase2_costs = vec![0.0; tableau.n_total()];
        for (j, &c) in model.objective_linear_weights.iter().enumerate() {
            phase2_costs[j] = sign * c;
        }
        tableau.set_costs(&phase2_costs);
        match self.iterate(&mut tableau, &mut budget) {
            PhaseResult::Optimal => {}
            PhaseResult::Unbounded => {
                return RunOutput::without_point(ModelStatus::Unbounded, budget.iterations);
            }
            PhaseResult::Limit(status) => {
                return RunOutput::without_point(status, budget.iterations);
            }
        }

        self.extract_solution(&tableau, model, budget.iterations)
    }

    fn build_tableau(&self, model: &Model) -> Tableau {
        let n = model.column_count;
        let m = model.row_count;
        let art_start = n + m;
        let n_total = n + 2 * m;
        let dense = model.dense_rows();

        let mut lower = Vec::with_capacity(n_total);
        let mut upper = Vec::with_capacity(n_total);
        lower.extend_from_slice(&model.column_lower_bounds);
        upper.extend_from_slice(&model.column_upper_bounds);
        lower.extend_from_slice(&model.row_lower_bounds);
        upper.extend_from_slice(&model.row_upper_bounds);
        lower.extend(std::iter::repeat_n(0.0, m));
        upper.extend(std::iter::repeat_n(f64::INFINITY, m));

        let mut values = vec![0.0; n_total];
        for j in 0..art_start {
            values[j] = resting_value(lower[j], upper[j]);
        }

        // Row i reads: sum_j a_ij x_j - r_i + s_i * art_i = 0, with s_i chosen so art_i >= 0.
        // The initial basis is diag(s_i) over the artificials.
        let mut rows = vec![vec![0.0; n_total]; m];
        for (i, row) in rows.iter_mut().enumerate() {
            let activity: f64 = dense[i].iter().zip(&values[..n]).map(|(a, x)| a * x).sum();
            let residual = values[n + i] - activity;
            let s = if residual < 0.0 { -1.0 } else { 1.0 };
            for j in 0..n {
                row[j] = s * dense[i][j];
            }
            row[n + i] = -s;
            row[art_start + i] = 1.0;
            values[art_start + i] = residual.abs();
        }

        let basis: Vec<usize> = (art_start..n_total).collect();
        let mut is_basic = vec![false; n_total];
        for &b in &basis {
            is_basic[b] = true;
        }

        Tableau {
            rows,
            reduced: vec![0.0; n_total],
            basis,
            is_basic,
            values,
            lower,
            upper,
            art_start,
        }
    }

    fn iterate(&self, tableau: &mut Tableau, budget: &mut Budget) -> PhaseResult {
        let mut degenerate_run = 0;
        loop {
            let bland = degenerate_run > BLAND_AFTER;
            let Some((col, dir)) = self.find_pivot_column(tableau, bland) else {
                return PhaseResult::Optimal;
            };
            if let Some(status) = budget.exhausted() {
                return PhaseResult::Limit(status);
            }

            let theta = match self.find_pivot_row(tableau, col, dir, bland) {
                Step::Unbounded => return PhaseResult::Unbounded,
                Step::Flip(theta) => {
                    tableau.shift_basics(col, dir, theta);
                    tableau.values[col] = if dir > 0.0 { tableau.upper[col] } else { tableau.lower[col] };
                    theta
                }
                Step::Pivot { row, theta, leaves_at_upper } => {
                    tableau.shift_basics(col, dir, theta);
                    let entering_value = tableau.values[col] + dir * theta;
                    let leaving = tableau.basis[row];
                    tableau.values[leaving] = if leaves_at_upper {
                        tableau.upper[leaving]
                    } else {
                        tableau.lower[leaving]
                    };
                    self.pivot(tableau, row, col);
                    tableau.values[col] = entering_value;
                    theta
                }
            };

            budget.iterations += 1;
            if theta <= self.tolerance {
                degenerate_run += 1;
            } else {
                degenerate_run = 0;
            }
        }
    }

    /// Choose the entering variable and its direction of travel (+1 up, -1 down).
    fn find_pivot_column(&self, tableau: &Tableau, bland: bool) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        let mut best_score = self.tolerance;

        for j in 0..tableau.n_total() {
            if tableau.is_basic[j] || tableau.lower[j] == tableau.upper[j] {
                continue;
            }
            let d = tableau.reduced[j];
            let at_lower = tableau.lower[j].is_finite() && tableau.values[j] == tableau.lower[j];
            let at_upper = tableau.upper[j].is_finite() && tableau.values[j] == tableau.upper[j];
            let dir = if d < -self.tolerance && !at_upper {
                1.0
            } else if d > self.tolerance && !at_lower {
                -1.0
            } else {
                continue;
            };
            if bland {
                return Some((j, dir));
            }
            if d.abs() > best_score {
                best_score = d.abs();
                best = Some((j, dir));
            }
        }

        best
    }

    /// Ratio test for moving `col` in direction `dir`.
    fn find_pivot_row(&self, tableau: &Tableau, col: usize, dir: f64, bland: bool) -> Step {
        let flip_at = tableau.upper[col] - tableau.lower[col];

        let mut min_ratio = f64::INFINITY;
        let mut min_row: Option<(usize, bool)> = None;

        for (i, row) in tableau.rows.iter().enumerate() {
            let alpha = row[col];
            if alpha.abs() <= self.tolerance {
                continue;
            }
            let basic = tableau.basis[i];
            let delta = -dir * alpha;
            let value = tableau.values[basic];
            let (ratio, at_upper) = if delta < 0.0 {
                let lower = tableau.lower[basic];
                if !lower.is_finite() {
                    continue;
                }
                (((value - lower) / -delta).max(0.0), false)
            } else {
                let upper = tableau.upper[basic];
                if !upper.is_finite() {
                    continue;
                }
                (((upper - value) / delta).max(0.0), true)
            };

            let better = match min_row {
                None => true,
                Some((r, _)) if bland => {
                    ratio < min_ratio || (ratio == min_ratio && basic < tableau.basis[r])
                }
                Some(_) => ratio < min_ratio,
            };
            if better {
                min_ratio = ratio;
                min_row = Some((i, at_upper));
            }
        }

        match min_row {
            Some((row, leaves_at_upper)) if min_ratio < flip_at => Step::Pivot {
                row,
                theta: min_ratio,
                leaves_at_upper,
            },
            _ if flip_at.is_finite() => Step::Flip(flip_at),
            Some((row, leaves_at_upper)) => Step::Pivot {
                row,
                theta: min_ratio,
                leaves_at_upper,
            },
            None => Step::Unbounded,
        }
    }

    fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        let n_cols = tableau.n_total();

        // Update basic variable
        let leaving = tableau.basis[row];
        tableau.is_basic[leaving] = false;
        tableau.is_basic[col] = true;
        tableau.basis[row] = col;

        // Scale pivot row
        let pivot_val = tableau.rows[row][col];
        for j in 0..n_cols {
            tableau.rows[row][j] /= pivot_val;
        }

        // Eliminate column in other rows
        let pivot_row = tableau.rows[row].clone();
        for (i, other) in tableau.rows.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = other[col];
            if factor != 0.0 {
                for j in 0..n_cols {
                    other[j] -= factor * pivot_row[j];
                }
            }
        }

        let factor = tableau.reduced[col];
        for j in 0..n_cols {
            tableau.reduced[j] -= factor * pivot_row[j];
        }
        tableau.reduced[col] = 0.0;
    }

    fn extract_solution(&self, tableau: &Tableau, model: &Model, iterations: usize) -> RunOutput {
        let n = model.column_count;
        let column_values: Vec<f64> = tableau.values[..n].to_vec();

        let within = |value: f64, lower: f64, upper: f64| {
            let slack_low = self.feasibility_tolerance * 10.0 * (1.0 + lower.abs().min(1e12));
            let slack_high = self.feasibility_tolerance * 10.0 * (1.0 + upper.abs().min(1e12));
            value >= lower - slack_low && value <= upper + slack_high
        };

        let columns_ok = column_values
            .iter()
            .zip(model.column_lower_bounds.iter().zip(&model.column_upper_bounds))
            .all(|(&x, (&l, &u))| within(x, l, u));
        let rows_ok = model
            .row_activity(&column_values)
            .iter()
            .zip(model.row_lower_bounds.iter().zip(&model.row_upper_bounds))
            .all(|(&a, (&l, &u))| within(a, l, u));

        let status = if columns_ok && rows_ok {
            ModelStatus::Optimal
        } else {
            tracing::warn!("simplex point failed the residual check");
            ModelStatus::SolveError
        };

        RunOutput {
            status,
            objective: model.objective_value(&column_values),
            column_values,
            iterations,
        }
    }
}

impl Engine for SimplexEngine {
    fn name(&self) -> &str {
        "simplex"
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn set_option(&mut self, key: &str, value: &OptionValue) -> Result<(), OptionError> {
        let invalid = |reason: &str| OptionError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        match key {
            "threads" => {
                let threads = value.as_int().filter(|&t| t >= 1).ok_or_else(|| invalid("expected an integer >= 1"))?;
                self.threads = threads as usize;
                if threads > 1 {
                    tracing::debug!(threads, "simplex engine runs single-threaded");
                }
            }
            "time_limit" => {
                let seconds = value.as_float().filter(|&s| s > 0.0).ok_or_else(|| invalid("expected seconds > 0"))?;
                // Limits too large for a Duration mean no limit
                self.time_limit = Duration::try_from_secs_f64(seconds).ok();
            }
            "simplex_iteration_limit" => {
                let limit = value.as_int().filter(|&l| l >= 0).ok_or_else(|| invalid("expected an integer >= 0"))?;
                self.max_iterations = limit as usize;
            }
            "primal_feasibility_tolerance" => {
                let tol = value.as_float().filter(|&t| t > 0.0 && t.is_finite()).ok_or_else(|| invalid("expected a positive number"))?;
                self.feasibility_tolerance = tol;
            }
            _ => return Err(OptionError::Unknown(key.to_string())),
        }
        Ok(())
    }

    fn run(&mut self, model: &Model) -> Result<RunOutput, EngineError> {
        model.validate()?;
        Ok(self.solve(model))
    }
}

struct Tableau {
    /// B^-1 A, one row per model row
    rows: Vec<Vec<f64>>,
    reduced: Vec<f64>,
    basis: Vec<usize>,
    is_basic: Vec<bool>,
    /// Current value of every variable: columns, row activities, artificials
    values: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    art_start: usize,
}

impl Tableau {
    fn n_total(&self) -> usize {
        self.values.len()
    }

    fn set_costs(&mut self, costs: &[f64]) {
        for j in 0..self.n_total() {
            if self.is_basic[j] {
                self.reduced[j] = 0.0;
                continue;
            }
            let basic_part: f64 = self
                .rows
                .iter()
                .zip(&self.basis)
                .map(|(row, &b)| costs[b] * row[j])
                .sum();
            self.reduced[j] = costs[j] - basic_part;
        }
    }

    /// Move basic variables for a step of `theta` along `dir` in column `col`.
    fn shift_basics(&mut self, col: usize, dir: f64, theta: f64) {
        if theta == 0.0 {
            return;
        }
        for (i, row) in self.rows.iter().enumerate() {
            let b = self.basis[i];
            self.values[b] -= dir * row[col] * theta;
        }
    }
}

struct Budget {
    iterations: usize,
    limit: usize,
    deadline: Option<Instant>,
}

impl Budget {
    fn exhausted(&self) -> Option<ModelStatus> {
        if self.iterations >= self.limit {
            return Some(ModelStatus::IterationLimit);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ModelStatus::TimeLimit),
            _ => None,
        }
    }
}

enum PhaseResult {
    Optimal,
    Unbounded,
    Limit(ModelStatus),
}

enum Step {
    Unbounded,
    Flip(f64),
    Pivot {
        row: usize,
        theta: f64,
        leaves_at_upper: bool,
    },
}

fn resting_value(lower: f64, upper: f64) -> f64 {
    if lower.is_finite() {
        lower
    } else if upper.is_finite() {
        upper
    } else {
        0.0
    }
}

fn has_crossed_bounds(lower: &[f64], upper: &[f64]) -> bool {
    lower.iter().zip(upper).any(|(l, u)| l > u)
}

fn row_bound_scale(model: &Model) -> f64 {
    model
        .row_lower_bounds
        .iter()
        .chain(&model.row_upper_bounds)
        .filter(|b| b.is_finite())
        .fold(0.0, |acc: f64, b| acc.max(b.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-6, "{} (expected {})", actual, expected);
    }

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   0 <= x <= 3, 0 <= y <= 3
        // Optimal: x=3, y=1, obj=11
        let mut model = Model::new(2);
        model.set_column_bounds(0, 0.0, 3.0);
        model.set_column_bounds(1, 0.0, 3.0);
        model.add_row(f64::NEG_INFINITY, 4.0, &[(0, 1.0), (1, 1.0)]);
        model.set_objective(vec![3.0, 2.0], true);

        let solution = SimplexEngine::new().solve(&model);

        assert_eq!(solution.status, ModelStatus::Optimal);
        assert_close(solution.column_values[0], 3.0);
        assert_close(solution.column_values[1], 1.0);
        assert_close(solution.objective, 11.0);
    }

    #[test]
    fn test_minimization_with_lower_row_bound() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   0 <= x <= 3, 0 <= y <= 3
        // Optimal: x=3, y=1, obj=9
        let mut model = Model::new(2);
        model.set_column_bounds(0, 0.0, 3.0);
        model.set_column_bounds(1, 0.0, 3.0);
        model.add_row(4.0, f64::INFINITY, &[(0, 1.0), (1, 1.0)]);
        model.set_objective(vec![2.0, 3.0], false);

        let solution = SimplexEngine::new().solve(&model);

        assert_eq!(solution.status, ModelStatus::Optimal);
        assert_close(solution.column_values[0], 3.0);
        assert_close(solution.column_values[1], 1.0);
        assert_close(solution.objective, 9.0);
    }

    #[test]
    fn test_ranged_row_and_shifted_lower_bound() {
        // Minimize x + y with x in [1, 5], y in [0, 5], 3 <= x + 2y <= 4
        let mut model = Model::new(2);
        model.set_column_bounds(0, 1.0, 5.0);
        model.set_column_bounds(1, 0.0, 5.0);
        model.add_row(3.0, 4.0, &[(0, 1.0), (1, 2.0)]);
        model.set_objective(vec![1.0, 1.0], false);

        let solution = SimplexEngine::new().solve(&model);

        assert_eq!(solution.status, ModelStatus::Optimal);
        assert_close(solution.column_values[0], 1.0);
        assert_close(solution.column_values[1], 1.0);
    }

    #[test]
    fn test_infeasible() {
        // x >= 5 with x <= 3
        let mut model = Model::new(1);
        model.set_column_bounds(0, 0.0, 3.0);
        model.add_row(5.0, f64::INFINITY, &[(0, 1.0)]);

        let solution = SimplexEngine::new().solve(&model);

        assert_eq!(solution.status, ModelStatus::Infeasible);
        assert!(solution.column_values.is_empty());
    }

    #[test]
    fn test_crossed_column_bounds_are_infeasible() {
        let mut model = Model::new(1);
        model.set_column_bounds(0, 2.0, 1.0);
        assert_eq!(SimplexEngine::new().solve(&model).status, ModelStatus::Infeasible);
    }

    #[test]
    fn test_unbounded() {
        let mut model = Model::new(1);
        model.add_row(1.0, f64::INFINITY, &[(0, 1.0)]);
        model.set_objective(vec![1.0], true);

        assert_eq!(SimplexEngine::new().solve(&model).status, ModelStatus::Unbounded);
    }

    #[test]
    fn test_free_column() {
        // Minimize x with x free and x >= -2
        let mut model = Model::new(1);
        model.set_column_bounds(0, f64::NEG_INFINITY, f64::INFINITY);
        model.add_row(-2.0, f64::INFINITY, &[(0, 1.0)]);
        model.set_objective(vec![1.0], false);

        let solution = SimplexEngine::new().solve(&model);

        assert_eq!(solution.status, ModelStatus::Optimal);
        assert_close(solution.column_values[0], -2.0);
    }

    #[test]
    fn test_iteration_limit() {
        let mut model = Model::new(2);
        model.set_column_bounds(0, 0.0, 6.0);
        model.set_column_bounds(1, 0.0, 6.0);
        model.add_row(5.0, 8.0, &[(0, 1.0), (1, 1.0)]);

        let solution = SimplexEngine::new().with_max_iterations(0).solve(&model);

        assert_eq!(solution.status, ModelStatus::IterationLimit);
    }

    #[test]
    fn test_nan_coefficient_is_a_model_error() {
        let mut model = Model::new(1);
        model.add_row(0.0, 1.0, &[(0, f64::NAN)]);
        assert_eq!(SimplexEngine::new().solve(&model).status, ModelStatus::ModelError);
    }

    #[test]
    fn test_empty_model() {
        let model = Model::new(0);
        assert_eq!(SimplexEngine::new().solve(&model).status, ModelStatus::ModelEmpty);
    }

    #[test]
    fn test_options() {
        let mut engine = SimplexEngine::new();
        assert!(engine.set_option("threads", &OptionValue::Int(4)).is_ok());
        assert_eq!(engine.threads(), 4);
        assert!(engine.set_option("time_limit", &OptionValue::Float(2.5)).is_ok());
        assert!(engine.set_option("simplex_iteration_limit", &OptionValue::Int(10)).is_ok());
        assert!(matches!(
            engine.set_option("threads", &OptionValue::Int(0)),
            Err(OptionError::InvalidValue { .. })
        ));
        assert!(matches!(
            engine.set_option("threads", &OptionValue::Str("many".into())),
            Err(OptionError::InvalidValue { .. })
        ));
        assert_eq!(
            engine.set_option("mip_rel_gap", &OptionValue::Float(0.1)),
            Err(OptionError::Unknown("mip_rel_gap".into()))
        );
    }

    #[test]
    fn test_oversized_time_limits_mean_no_limit() {
        let mut model = Model::new(1);
        model.set_column_bounds(0, 0.0, 2.0);
        model.add_row(1.0, 1.0, &[(0, 1.0)]);

        for seconds in [1e30, 1e19, f64::INFINITY] {
            let mut engine = SimplexEngine::new();
            assert!(engine.set_option("time_limit", &OptionValue::Float(seconds)).is_ok());
            let solution = engine.run(&model).unwrap();
            assert_eq!(solution.status, ModelStatus::Optimal, "time_limit = {}", seconds);
            assert_close(solution.column_values[0], 1.0);
        }
    }

    #[test]
    fn test_run_rejects_broken_layout() {
        let mut model = Model::new(1);
        model.weights.offsets = vec![0, 1];
        let result = SimplexEngine::new().run(&model);
        assert!(matches!(result, Err(EngineError::InvalidModel(_))));
    }
}
