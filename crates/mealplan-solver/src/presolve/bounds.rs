use crate::model::Model;

/// Single-pass bound propagation from rows onto columns.
///
/// For every column and every row where the column's coefficient `c` is
/// strictly positive, the upper bound drops to `row_upper / c` and the lower
/// bound rises to `row_lower / c` when those are tighter. Rows with a
/// non-positive coefficient are skipped. A column whose lower bound ends up
/// above its upper bound is clamped to `lower = upper`.
pub fn bound_tightening(model: &Model) -> Model {
    let rows = model.dense_rows();
    let mut lower = model.column_lower_bounds.clone();
    let mut upper = model.column_upper_bounds.clone();

    for j in 0..model.column_count {
        for (i, row) in rows.iter().enumerate() {
            let coeff = row[j];
            if coeff <= 0.0 {
                continue;
            }
            let max_ub = model.row_upper_bounds[i] / coeff;
            if max_ub < upper[j] {
                upper[j] = max_ub;
            }
            let min_lb = model.row_lower_bounds[i] / coeff;
            if min_lb > lower[j] {
                lower[j] = min_lb;
            }
        }
        if lower[j] > upper[j] {
            lower[j] = upper[j];
        }
    }

    Model {
        column_lower_bounds: lower,
        column_upper_bounds: upper,
        ..model.clone()
    }
}

/// Repeat [`bound_tightening`] until no bound moves or `max_passes` is reached.
///
/// Returns the tightened model and the number of passes that changed something.
pub fn tighten_to_fixed_point(model: &Model, max_passes: usize) -> (Model, usize) {
    let mut current = model.clone();
    for pass in 0..max_passes {
        let next = bound_tightening(&current);
        let unchanged = next.column_lower_bounds == current.column_lower_bounds
            && next.column_upper_bounds == current.column_upper_bounds;
        if unchanged {
            return (current, pass);
        }
        current = next;
    }
    (current, max_passes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_row(coeffs: &[f64], lower: f64, upper: f64) -> Model {
        let mut model = Model::new(coeffs.len());
        for j in 0..coeffs.len() {
            model.set_column_bounds(j, 0.0, 6.0);
        }
        let entries: Vec<(usize, f64)> = coeffs.iter().copied().enumerate().collect();
        model.add_row(lower, upper, &entries);
        model
    }

    #[test]
    fn test_upper_bound_drops_to_row_ratio() {
        let model = one_row(&[100.0], 0.0, 300.0);
        let tightened = bound_tightening(&model);
        assert_eq!(tightened.column_upper_bounds, vec![3.0]);
        assert_eq!(tightened.column_lower_bounds, vec![0.0]);
    }

    #[test]
    fn test_lower_bound_rises_to_row_ratio() {
        let model = one_row(&[100.0], 200.0, 1000.0);
        let tightened = bound_tightening(&model);
        assert_eq!(tightened.column_lower_bounds, vec![2.0]);
        assert_eq!(tightened.column_upper_bounds, vec![6.0]);
    }

    #[test]
    fn test_crossed_bounds_are_clamped() {
        // lower would become 2200 / 200 = 11 while upper stays 6
        let model = one_row(&[200.0], 2200.0, 2600.0);
        let tightened = bound_tightening(&model);
        assert_eq!(tightened.column_lower_bounds, vec![6.0]);
        assert_eq!(tightened.column_upper_bounds, vec![6.0]);
    }

    #[test]
    fn test_non_positive_coefficients_are_skipped() {
        let model = one_row(&[0.0, -5.0], 10.0, 20.0);
        let tightened = bound_tightening(&model);
        assert_eq!(tightened.column_lower_bounds, vec![0.0, 0.0]);
        assert_eq!(tightened.column_upper_bounds, vec![6.0, 6.0]);
    }

    #[test]
    fn test_input_is_untouched() {
        let model = one_row(&[100.0, 50.0], 200.0, 300.0);
        let before = model.clone();
        let _ = bound_tightening(&model);
        assert_eq!(model, before);
    }

    #[test]
    fn test_fixed_point_stops_when_stable() {
        let model = one_row(&[100.0], 0.0, 300.0);
        let (tightened, passes) = tighten_to_fixed_point(&model, 10);
        assert_eq!(passes, 1);
        assert_eq!(tightened, bound_tightening(&model));
    }
}
