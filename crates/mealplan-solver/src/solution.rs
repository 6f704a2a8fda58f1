/// Outcome of a model run, numbered the way HiGHS numbers its model status.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelStatus {
    NotSet,
    LoadError,
    /// The model violates a structural invariant or carries non-numeric data
    ModelError,
    PresolveError,
    /// The solve finished but the result failed its residual check
    SolveError,
    PostsolveError,
    ModelEmpty,
    Optimal,
    Infeasible,
    UnboundedOrInfeasible,
    Unbounded,
    ObjectiveBound,
    ObjectiveTarget,
    TimeLimit,
    IterationLimit,
    Unknown,
}

impl ModelStatus {
    pub const OPTIMAL: i32 = 7;

    pub fn code(self) -> i32 {
        match self {
            ModelStatus::NotSet => 0,
            ModelStatus::LoadError => 1,
            ModelStatus::ModelError => 2,
            ModelStatus::PresolveError => 3,
            ModelStatus::SolveError => 4,
            ModelStatus::PostsolveError => 5,
            ModelStatus::ModelEmpty => 6,
            ModelStatus::Optimal => 7,
            ModelStatus::Infeasible => 8,
            ModelStatus::UnboundedOrInfeasible => 9,
            ModelStatus::Unbounded => 10,
            ModelStatus::ObjectiveBound => 11,
            ModelStatus::ObjectiveTarget => 12,
            ModelStatus::TimeLimit => 13,
            ModelStatus::IterationLimit => 14,
            ModelStatus::Unknown => 15,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ModelStatus::NotSet,
            1 => ModelStatus::LoadError,
            2 => ModelStatus::ModelError,
            3 => ModelStatus::PresolveError,
            4 => ModelStatus::SolveError,
            5 => ModelStatus::PostsolveError,
            6 => ModelStatus::ModelEmpty,
            7 => ModelStatus::Optimal,
            8 => ModelStatus::Infeasible,
            9 => ModelStatus::UnboundedOrInfeasible,
            10 => ModelStatus::Unbounded,
            11 => ModelStatus::ObjectiveBound,
            12 => ModelStatus::ObjectiveTarget,
            13 => ModelStatus::TimeLimit,
            14 => ModelStatus::IterationLimit,
            _ => ModelStatus::Unknown,
        }
    }

    pub fn is_optimal(self) -> bool {
        self == ModelStatus::Optimal
    }
}

/// Raw result of an engine run
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub status: ModelStatus,
    /// Objective value at `column_values` (0 for the feasibility model)
    pub objective: f64,
    /// One value per model column; empty when no point is available
    pub column_values: Vec<f64>,
    /// Simplex pivots (or engine-reported iterations)
    pub iterations: usize,
}

impl RunOutput {
    pub fn without_point(status: ModelStatus, iterations: usize) -> Self {
        Self {
            status,
            objective: f64::NAN,
            column_values: Vec::new(),
            iterations,
        }
    }

    /// Status code in HiGHS numbering
    pub fn status_code(&self) -> i32 {
        self.status.code()
    }
}
