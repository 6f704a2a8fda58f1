use mealplan_solver::{Model, RowMatrix};

use crate::dataset::Dataset;

/// Decision variables count half-servings
pub const HALF_SERVING: f64 = 0.5;

/// Default cap: 6 half-servings, i.e. 3 full servings
pub const DEFAULT_MAX_HALF_SERVINGS: f64 = 6.0;

/// Constraint rows, in model row order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Calories,
    Protein,
    Carbohydrates,
    Sodium,
}

impl Nutrient {
    pub const ALL: [Nutrient; 4] = [
        Nutrient::Calories,
        Nutrient::Protein,
        Nutrient::Carbohydrates,
        Nutrient::Sodium,
    ];

    pub fn row(self) -> usize {
        match self {
            Nutrient::Calories => 0,
            Nutrient::Protein => 1,
            Nutrient::Carbohydrates => 2,
            Nutrient::Sodium => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Nutrient::Calories => "Calories (kcal)",
            Nutrient::Protein => "Protein (g)",
            Nutrient::Carbohydrates => "Carbs (g)",
            Nutrient::Sodium => "Sodium (mg)",
        }
    }

    /// Per-serving values of this nutrient for every meal
    pub fn column(self, dataset: &Dataset) -> &[f64] {
        match self {
            Nutrient::Calories => &dataset.calories,
            Nutrient::Protein => &dataset.protein,
            Nutrient::Carbohydrates => &dataset.carbs,
            Nutrient::Sodium => &dataset.sodium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64, eps: f64) -> bool {
        value >= self.min - eps && value <= self.max + eps
    }
}

/// Acceptable daily range for each nutrient row
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NutrientTargets {
    pub calories: Range,
    pub protein: Range,
    pub carbohydrates: Range,
    pub sodium: Range,
}

impl Default for NutrientTargets {
    fn default() -> Self {
        Self {
            calories: Range::new(2200.0, 2600.0),
            protein: Range::new(100.0, 160.0),
            carbohydrates: Range::new(250.0, 350.0),
            sodium: Range::new(1500.0, 2300.0),
        }
    }
}

impl NutrientTargets {
    pub fn get(&self, nutrient: Nutrient) -> Range {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Protein => self.protein,
            Nutrient::Carbohydrates => self.carbohydrates,
            Nutrient::Sodium => self.sodium,
        }
    }
}

/// What the solver optimizes over the feasible plans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanObjective {
    /// All-zero objective: any plan inside the targets will do
    #[default]
    Feasibility,
    /// Minimize total price; meals without a price count as free.
    /// This changes which plan is returned compared to `Feasibility`.
    #[serde(alias = "min-cost")]
    MinimizeCost,
}

/// Turns a dataset into the meal-plan model.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    pub targets: NutrientTargets,
    pub max_half_servings: f64,
    pub objective: PlanObjective,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self {
            targets: NutrientTargets::default(),
            max_half_servings: DEFAULT_MAX_HALF_SERVINGS,
            objective: PlanObjective::default(),
        }
    }
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targets(mut self, targets: NutrientTargets) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_max_half_servings(mut self, max: f64) -> Self {
        self.max_half_servings = max;
        self
    }

    pub fn with_objective(mut self, objective: PlanObjective) -> Self {
        self.objective = objective;
        self
    }

    /// Build the model: one column per meal (half-servings in `[0, max]`), one
    /// row per nutrient with coefficient `nutrient * 0.5`, dense row-major layout.
    pub fn build(&self, dataset: &Dataset) -> Model {
        let n = dataset.meal_count();

        let rows: Vec<Vec<f64>> = Nutrient::ALL
            .iter()
            .map(|nutrient| {
                nutrient
                    .column(dataset)
                    .iter()
                    .map(|value| value * HALF_SERVING)
                    .collect()
            })
            .collect();

        let objective_linear_weights = match self.objective {
            PlanObjective::Feasibility => vec![0.0; n],
            PlanObjective::MinimizeCost => {
                let unpriced = dataset.prices.iter().filter(|p| p.is_none()).count();
                if unpriced > 0 {
                    tracing::warn!(unpriced, "meals without a price are treated as free");
                }
                dataset
                    .prices
                    .iter()
                    .map(|price| price.unwrap_or(0.0) * HALF_SERVING)
                    .collect()
            }
        };

        let model = Model {
            column_count: n,
            column_lower_bounds: vec![0.0; n],
            column_upper_bounds: vec![self.max_half_servings; n],
            row_count: Nutrient::ALL.len(),
            row_lower_bounds: Nutrient::ALL.iter().map(|&r| self.targets.get(r).min).collect(),
            row_upper_bounds: Nutrient::ALL.iter().map(|&r| self.targets.get(r).max).collect(),
            weights: RowMatrix::dense(&rows, n),
            objective_linear_weights,
            is_maximization: false,
        };
        tracing::debug!(columns = model.column_count, rows = model.row_count, "built meal-plan model");
        model
    }
}

/// Build the model with default targets and the feasibility objective.
pub fn build_model(dataset: &Dataset) -> Model {
    ModelBuilder::default().build(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MealRecord;

    fn meal(name: &str, calories: f64, protein: f64, carbohydrates: f64, sodium: f64) -> MealRecord {
        MealRecord {
            name: name.to_string(),
            calories,
            protein,
            carbohydrates,
            sodium,
            price: None,
        }
    }

    #[test]
    fn test_two_meal_model() {
        let dataset = Dataset::from_records([
            meal("Meal A", 400.0, 30.0, 40.0, 600.0),
            meal("Meal B", 200.0, 10.0, 20.0, 300.0),
        ]);
        let model = build_model(&dataset);

        assert_eq!(model.column_count, 2);
        assert_eq!(model.row_count, 4);
        assert_eq!(model.column_lower_bounds, vec![0.0, 0.0]);
        assert_eq!(model.column_upper_bounds, vec![6.0, 6.0]);
        assert_eq!(model.weights.offsets, vec![0, 2, 4, 6, 8]);
        assert_eq!(model.weights.indices, vec![0, 1, 0, 1, 0, 1, 0, 1]);
        assert_eq!(&model.weights.values[0..2], &[200.0, 100.0]);
        assert_eq!(&model.weights.values[6..8], &[300.0, 150.0]);
        assert_eq!(model.row_lower_bounds, vec![2200.0, 100.0, 250.0, 1500.0]);
        assert_eq!(model.row_upper_bounds, vec![2600.0, 160.0, 350.0, 2300.0]);
        assert_eq!(model.objective_linear_weights, vec![0.0, 0.0]);
        assert!(!model.is_maximization);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_custom_targets_and_cost_objective() {
        let mut priced = meal("Priced", 100.0, 1.0, 1.0, 1.0);
        priced.price = Some(8.0);
        let dataset = Dataset::from_records([priced, meal("Free", 100.0, 1.0, 1.0, 1.0)]);

        let targets = NutrientTargets {
            calories: Range::new(1800.0, 2000.0),
            ..NutrientTargets::default()
        };
        let model = ModelBuilder::new()
            .with_targets(targets)
            .with_max_half_servings(4.0)
            .with_objective(PlanObjective::MinimizeCost)
            .build(&dataset);

        assert_eq!(model.row_lower_bounds[0], 1800.0);
        assert_eq!(model.row_upper_bounds[0], 2000.0);
        assert_eq!(model.column_upper_bounds, vec![4.0, 4.0]);
        assert_eq!(model.objective_linear_weights, vec![4.0, 0.0]);
    }

    #[test]
    fn test_empty_dataset() {
        let model = build_model(&Dataset::default());
        assert_eq!(model.column_count, 0);
        assert_eq!(model.weights.offsets, vec![0, 0, 0, 0, 0]);
        assert!(model.validate().is_ok());
    }
}
