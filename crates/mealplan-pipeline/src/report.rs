use std::fmt;

use crate::builder::{Nutrient, NutrientTargets};
use crate::dataset::Dataset;

/// Only raw half-serving values above this are part of the plan; NaN never is
pub const SELECTION_THRESHOLD: f64 = 0.5;

/// Full servings reported for a raw half-serving value: `round(half) / 2`.
pub fn reported_servings(half_servings: f64) -> f64 {
    half_servings.round() / 2.0
}

/// A meal in the plan with the nutrients its servings contribute
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SelectedMeal {
    pub index: usize,
    pub name: String,
    pub servings: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub sodium: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct NutrientTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub sodium: f64,
}

impl NutrientTotals {
    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Protein => self.protein,
            Nutrient::Carbohydrates => self.carbs,
            Nutrient::Sodium => self.sodium,
        }
    }
}

/// The meal plan as presented to a user.
///
/// Totals are recomputed from the rounded servings, so they can drift slightly
/// from the solver's own row activities.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlanReport {
    pub selected_meals: Vec<SelectedMeal>,
    pub totals: NutrientTotals,
    pub targets: NutrientTargets,
}

impl PlanReport {
    /// `column_values` holds one raw half-serving value per dataset meal.
    pub fn from_column_values(dataset: &Dataset, column_values: &[f64], targets: NutrientTargets) -> Self {
        let mut selected_meals = Vec::new();
        let mut totals = NutrientTotals::default();

        for (i, &half_servings) in column_values.iter().enumerate().take(dataset.meal_count()) {
            if half_servings.is_nan() || half_servings <= SELECTION_THRESHOLD {
                continue;
            }
            let servings = reported_servings(half_servings);
            let meal = SelectedMeal {
                index: i,
                name: dataset.meal_names[i].clone(),
                servings,
                calories: servings * dataset.calories[i],
                protein: servings * dataset.protein[i],
                carbs: servings * dataset.carbs[i],
                sodium: servings * dataset.sodium[i],
            };
            totals.calories += meal.calories;
            totals.protein += meal.protein;
            totals.carbs += meal.carbs;
            totals.sodium += meal.sodium;
            selected_meals.push(meal);
        }

        Self {
            selected_meals,
            totals,
            targets,
        }
    }

    /// Nutrients whose reported total falls outside its target by more than `eps`
    pub fn missed_targets(&self, eps: f64) -> Vec<Nutrient> {
        Nutrient::ALL
            .into_iter()
            .filter(|&n| !self.targets.get(n).contains(self.totals.get(n), eps))
            .collect()
    }
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Selected Meals & Servings:")?;
        if self.selected_meals.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for meal in &self.selected_meals {
            writeln!(f, "  • {}: {:.1} servings", meal.name, meal.servings)?;
        }
        writeln!(f)?;
        writeln!(f, "Daily Nutrient Totals:")?;
        for nutrient in Nutrient::ALL {
            let target = self.targets.get(nutrient);
            let value = self.totals.get(nutrient);
            let shown = match nutrient {
                Nutrient::Calories | Nutrient::Sodium => format!("{:.0}", value.round()),
                Nutrient::Protein | Nutrient::Carbohydrates => format!("{:.1}", value),
            };
            writeln!(f, "  {:16} {:>8}   target {}–{}", nutrient.label(), shown, target.min, target.max)?;
        }
        Ok(())
    }
}
