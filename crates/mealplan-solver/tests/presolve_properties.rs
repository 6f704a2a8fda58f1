use mealplan_solver::Model;
use mealplan_solver::presolve::{bound_tightening, coefficient_aggregation, run};
use proptest::prelude::*;

const COEFFICIENTS: [f64; 5] = [0.0, 5.0, 10.0, 100.0, 200.0];

fn build_model(columns: &[[usize; 4]], row_bounds: &[(f64, f64); 4]) -> Model {
    let n = columns.len();
    let mut model = Model::new(n);
    for j in 0..n {
        model.set_column_bounds(j, 0.0, 6.0);
    }
    for (r, &(lower, width)) in row_bounds.iter().enumerate() {
        let entries: Vec<(usize, f64)> = columns
            .iter()
            .enumerate()
            .map(|(j, picks)| (j, COEFFICIENTS[picks[r]]))
            .collect();
        model.add_row(lower, lower + width, &entries);
    }
    model
}

fn model_strategy() -> impl Strategy<Value = Model> {
    (
        prop::collection::vec(prop::array::uniform4(0usize..COEFFICIENTS.len()), 1..12),
        prop::array::uniform4((0.0f64..3000.0, 0.0f64..2000.0)),
    )
        .prop_map(|(columns, rows)| build_model(&columns, &rows))
}

proptest! {
    #[test]
    fn tightening_never_crosses_bounds(model in model_strategy()) {
        let tightened = bound_tightening(&model);
        for j in 0..tightened.column_count {
            prop_assert!(tightened.column_lower_bounds[j] <= tightened.column_upper_bounds[j]);
        }
    }

    #[test]
    fn tightening_is_stable_on_its_own_output(model in model_strategy()) {
        let once = bound_tightening(&model);
        let twice = bound_tightening(&once);
        prop_assert_eq!(&once.column_upper_bounds, &twice.column_upper_bounds);
        prop_assert_eq!(&once.column_lower_bounds, &twice.column_lower_bounds);
    }

    #[test]
    fn aggregation_preserves_capacity(model in model_strategy()) {
        let reduced = coefficient_aggregation(&model);
        prop_assert!(reduced.column_count <= model.column_count);
        prop_assert!(reduced.validate().is_ok());

        let before: f64 = model.column_upper_bounds.iter().sum();
        let after: f64 = reduced.column_upper_bounds.iter().sum();
        prop_assert!((before - after).abs() < 1e-9 * (1.0 + before.abs()));
    }

    #[test]
    fn presolve_leaves_input_untouched(model in model_strategy()) {
        let snapshot = model.clone();
        let _ = run(&model);
        prop_assert_eq!(model, snapshot);
    }
}

#[test]
fn merged_group_bound_is_sum_of_members() {
    // Columns 0 and 2 share a profile, column 1 differs
    let model = build_model(
        &[[1, 2, 3, 4], [0, 0, 0, 0], [1, 2, 3, 4]],
        &[(0.0, 10_000.0); 4],
    );
    let mut model = model;
    model.set_column_bounds(0, 1.0, 2.0);
    model.set_column_bounds(2, 0.5, 3.0);

    let reduced = coefficient_aggregation(&model);

    assert_eq!(reduced.column_count, 2);
    assert_eq!(reduced.column_upper_bounds, vec![5.0, 6.0]);
    assert_eq!(reduced.column_lower_bounds, vec![1.5, 0.0]);
}
