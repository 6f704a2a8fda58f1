use mealplan_solver::{ErrorKind, RawStatus, SolverError, interpret_status};
use proptest::prelude::*;

fn raw_status() -> impl Strategy<Value = RawStatus> {
    prop_oneof![
        any::<i64>().prop_map(RawStatus::Code),
        "\\PC{0,12}".prop_map(RawStatus::Text),
        Just(RawStatus::Null),
        Just(RawStatus::Undefined),
    ]
}

proptest! {
    #[test]
    fn every_status_maps_to_one_kind(status in raw_status()) {
        let info = interpret_status(status.clone());
        let expected = match status {
            RawStatus::Code(8) => ErrorKind::Infeasible,
            RawStatus::Code(13) => ErrorKind::Numerical,
            _ => ErrorKind::Unknown,
        };
        prop_assert_eq!(info.code, expected);
        if expected == ErrorKind::Unknown {
            prop_assert_eq!(info.message, format!("Solver terminated with status code {}.", status));
        }
    }

    #[test]
    fn solver_error_agrees_with_interpretation(status in raw_status()) {
        let info = interpret_status(status.clone());
        let err = SolverError::from_status(status);
        prop_assert_eq!(err.code, info.code);
        prop_assert_eq!(err.message, info.message);
    }
}

#[test]
fn listed_codes_are_unknown() {
    for code in [0i64, 1, 5, 7, 9, -1, 99, 1000] {
        let info = interpret_status(code);
        assert_eq!(info.code, ErrorKind::Unknown);
        assert!(info.message.contains(&code.to_string()));
    }
    assert_eq!(
        interpret_status(None::<i64>).message,
        "Solver terminated with status code undefined."
    );
}
