use std::collections::HashMap;

use crate::model::{Model, RowMatrix};

/// Bit pattern used for exact-match keys: `-0.0` folds onto `0.0` and every NaN
/// onto one NaN, otherwise values must agree bit for bit.
fn key_bits(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

/// Merge columns with identical coefficient vectors.
///
/// Returns the reduced model and, for each kept column, the original columns
/// folded into it (the kept column first).
pub(crate) fn aggregate(model: &Model) -> (Model, Vec<Vec<usize>>) {
    let rows = model.dense_rows();

    let mut seen: HashMap<Vec<u64>, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut lower: Vec<f64> = Vec::new();
    let mut upper: Vec<f64> = Vec::new();

    for j in 0..model.column_count {
        let mut key: Vec<u64> = rows.iter().map(|row| key_bits(row[j])).collect();
        // objective coefficient is part of the key
        key.push(key_bits(model.objective_linear_weights[j]));

        match seen.get(&key) {
            Some(&k) => {
                upper[k] += model.column_upper_bounds[j];
                lower[k] += model.column_lower_bounds[j];
                groups[k].push(j);
            }
            None => {
                seen.insert(key, groups.len());
                groups.push(vec![j]);
                lower.push(model.column_lower_bounds[j]);
                upper.push(model.column_upper_bounds[j]);
            }
        }
    }

    let kept: Vec<usize> = groups.iter().map(|g| g[0]).collect();
    let reduced_rows: Vec<Vec<f64>> = rows
        .iter()
        .map(|row| kept.iter().map(|&j| row[j]).collect())
        .collect();

    let reduced = Model {
        column_count: kept.len(),
        column_lower_bounds: lower,
        column_upper_bounds: upper,
        weights: RowMatrix::dense(&reduced_rows, kept.len()),
        objective_linear_weights: kept.iter().map(|&j| model.objective_linear_weights[j]).collect(),
        ..model.clone()
    };
    (reduced, groups)
}

/// Merge columns with identical coefficient vectors into the first occurrence.
///
/// The kept column's bounds become the sums of its group's bounds, the
/// duplicates are dropped, and the matrix is rebuilt densely over the kept
/// columns. Matching is exact, so values differing only by rounding noise
/// stay separate.
pub fn coefficient_aggregation(model: &Model) -> Model {
    aggregate(model).0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with_columns(columns: &[[f64; 2]]) -> Model {
        let n = columns.len();
        let mut model = Model::new(n);
        for j in 0..n {
            model.set_column_bounds(j, 0.0, 6.0);
        }
        let row0: Vec<(usize, f64)> = columns.iter().enumerate().map(|(j, c)| (j, c[0])).collect();
        let row1: Vec<(usize, f64)> = columns.iter().enumerate().map(|(j, c)| (j, c[1])).collect();
        model.add_row(0.0, 100.0, &row0);
        model.add_row(0.0, 100.0, &row1);
        model
    }

    #[test]
    fn test_duplicates_fold_into_first_occurrence() {
        let model = model_with_columns(&[[1.0, 2.0], [3.0, 4.0], [1.0, 2.0]]);
        let (reduced, groups) = aggregate(&model);

        assert_eq!(reduced.column_count, 2);
        assert_eq!(groups, vec![vec![0, 2], vec![1]]);
        assert_eq!(reduced.column_upper_bounds, vec![12.0, 6.0]);
        assert_eq!(reduced.column_lower_bounds, vec![0.0, 0.0]);
        assert_eq!(reduced.weights.offsets, vec![0, 2, 4]);
        assert_eq!(reduced.weights.indices, vec![0, 1, 0, 1]);
        assert_eq!(reduced.weights.values, vec![1.0, 3.0, 2.0, 4.0]);
        assert_eq!(reduced.objective_linear_weights.len(), 2);
        assert!(reduced.validate().is_ok());
    }

    #[test]
    fn test_near_equal_columns_stay_apart() {
        let model = model_with_columns(&[[0.1 + 0.2, 1.0], [0.3, 1.0]]);
        assert_eq!(coefficient_aggregation(&model).column_count, 2);
    }

    #[test]
    fn test_signed_zero_matches() {
        let model = model_with_columns(&[[0.0, 1.0], [-0.0, 1.0]]);
        assert_eq!(coefficient_aggregation(&model).column_count, 1);
    }

    #[test]
    fn test_different_objective_weights_stay_apart() {
        let mut model = model_with_columns(&[[1.0, 2.0], [1.0, 2.0]]);
        model.set_objective(vec![1.0, 2.0], false);
        assert_eq!(coefficient_aggregation(&model).column_count, 2);
    }

    #[test]
    fn test_input_is_untouched() {
        let model = model_with_columns(&[[1.0, 2.0], [1.0, 2.0]]);
        let before = model.clone();
        let _ = coefficient_aggregation(&model);
        assert_eq!(model, before);
    }
}
