//! Model simplification applied before solving.
//!
//! Both transforms take the model by reference and build a new one; the input
//! is never modified, so one base model can be presolved and compared as often
//! as needed.

mod aggregate;
mod bounds;

pub use aggregate::coefficient_aggregation;
pub use bounds::{bound_tightening, tighten_to_fixed_point};

use crate::model::Model;

/// Column counts around a presolve run
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresolveStats {
    pub before: usize,
    pub after: usize,
}

/// Presolved model plus what is needed to map its solution back.
#[derive(Debug, Clone)]
pub struct Presolved {
    pub model: Model,
    /// `groups[k]` lists the original columns folded into reduced column `k`
    pub groups: Vec<Vec<usize>>,
    /// Column bounds after tightening, indexed by original column
    original_lower: Vec<f64>,
    original_upper: Vec<f64>,
}

impl Presolved {
    pub fn original_column_count(&self) -> usize {
        self.original_lower.len()
    }

    /// Spread reduced-model values back over the original columns.
    ///
    /// Each member of a group first gets its own lower bound; the rest of the
    /// group's value fills members in column order up to their upper bounds.
    /// Whatever cannot be placed lands on the group's first column.
    pub fn expand(&self, reduced_values: &[f64]) -> Vec<f64> {
        let mut values = vec![0.0; self.original_column_count()];

        for (k, group) in self.groups.iter().enumerate() {
            let total = reduced_values.get(k).copied().unwrap_or(0.0);
            let mut remaining = total;
            for &j in group {
                values[j] = self.original_lower[j];
                remaining -= self.original_lower[j];
            }
            for &j in group {
                if remaining <= 0.0 {
                    break;
                }
                let room = (self.original_upper[j] - values[j]).max(0.0);
                let take = remaining.min(room);
                values[j] += take;
                remaining -= take;
            }
            if remaining != 0.0 {
                values[group[0]] += remaining;
            }
        }

        values
    }
}

/// Bound tightening followed by coefficient aggregation.
pub fn run(model: &Model) -> Model {
    coefficient_aggregation(&bound_tightening(model))
}

/// [`run`], keeping the column grouping for [`Presolved::expand`].
pub fn run_with_postsolve(model: &Model) -> Presolved {
    let tightened = bound_tightening(model);
    let (reduced, groups) = aggregate::aggregate(&tightened);
    tracing::debug!(
        before = model.column_count,
        after = reduced.column_count,
        "presolve finished"
    );
    Presolved {
        model: reduced,
        groups,
        original_lower: tightened.column_lower_bounds,
        original_upper: tightened.column_upper_bounds,
    }
}

/// Column counts before and after [`run`].
pub fn stats(model: &Model) -> PresolveStats {
    PresolveStats {
        before: model.column_count,
        after: run(model).column_count,
    }
}
