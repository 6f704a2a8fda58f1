//! Mapping of raw solver status codes onto a coarse error taxonomy.
//!
//! Only two codes are special-cased: 8 (infeasible) and 13 (numerical trouble).
//! Everything else, including values that are not numbers at all, is `UNKNOWN`.
//! The optimal status never reaches this module; callers treat it as success.

use std::fmt;

use thiserror::Error;

pub const STATUS_INFEASIBLE: i64 = 8;
pub const STATUS_NUMERICAL: i64 = 13;

/// Serialized as the stable error codes (`E_SOLVER_*`), displayed by name.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    #[cfg_attr(feature = "serde", serde(rename = "E_SOLVER_INFEASIBLE"))]
    Infeasible,
    #[cfg_attr(feature = "serde", serde(rename = "E_SOLVER_NUMERICAL"))]
    Numerical,
    #[cfg_attr(feature = "serde", serde(rename = "E_SOLVER_UNKNOWN"))]
    Unknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Infeasible => "INFEASIBLE",
            ErrorKind::Numerical => "NUMERICAL",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }

    /// Machine-readable code, e.g. `E_SOLVER_INFEASIBLE`
    pub fn error_code(self) -> &'static str {
        match self {
            ErrorKind::Infeasible => "E_SOLVER_INFEASIBLE",
            ErrorKind::Numerical => "E_SOLVER_NUMERICAL",
            ErrorKind::Unknown => "E_SOLVER_UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status as handed over by a solver binding, which is not always a number.
#[derive(Debug, Clone, PartialEq)]
pub enum RawStatus {
    Code(i64),
    Text(String),
    Null,
    Undefined,
}

impl fmt::Display for RawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawStatus::Code(code) => write!(f, "{}", code),
            RawStatus::Text(text) => f.write_str(text),
            RawStatus::Null => f.write_str("null"),
            RawStatus::Undefined => f.write_str("undefined"),
        }
    }
}

macro_rules! raw_status_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for RawStatus {
            fn from(code: $ty) -> Self {
                RawStatus::Code(code as i64)
            }
        })*
    };
}

raw_status_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<&str> for RawStatus {
    fn from(text: &str) -> Self {
        RawStatus::Text(text.to_string())
    }
}

impl From<String> for RawStatus {
    fn from(text: String) -> Self {
        RawStatus::Text(text)
    }
}

impl<T: Into<RawStatus>> From<Option<T>> for RawStatus {
    fn from(value: Option<T>) -> Self {
        value.map_or(RawStatus::Undefined, Into::into)
    }
}

#[cfg(feature = "serde")]
impl From<&serde_json::Value> for RawStatus {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RawStatus::Null,
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(code) => RawStatus::Code(code),
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        RawStatus::Code(f as i64)
                    }
                    _ => RawStatus::Text(n.to_string()),
                },
            },
            serde_json::Value::String(s) => RawStatus::Text(s.clone()),
            other => RawStatus::Text(other.to_string()),
        }
    }
}

/// Interpreted status: error kind plus a human-readable message
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInfo {
    pub code: ErrorKind,
    pub message: String,
}

pub fn interpret_status(status: impl Into<RawStatus>) -> StatusInfo {
    let status = status.into();
    match status {
        RawStatus::Code(STATUS_INFEASIBLE) => StatusInfo {
            code: ErrorKind::Infeasible,
            message: "No feasible solution found. Try relaxing constraints or check input data."
                .to_string(),
        },
        RawStatus::Code(STATUS_NUMERICAL) => StatusInfo {
            code: ErrorKind::Numerical,
            message: "Solver encountered numerical instability. Check data for extreme or inconsistent values."
                .to_string(),
        },
        other => StatusInfo {
            code: ErrorKind::Unknown,
            message: format!("Solver terminated with status code {}.", other),
        },
    }
}

/// Error raised for a non-optimal solver status
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SolverError {
    pub code: ErrorKind,
    pub message: String,
}

impl SolverError {
    pub fn from_status(status: impl Into<RawStatus>) -> Self {
        let StatusInfo { code, message } = interpret_status(status);
        Self { code, message }
    }
}

impl From<StatusInfo> for SolverError {
    fn from(info: StatusInfo) -> Self {
        Self {
            code: info.code,
            message: info.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infeasible_status() {
        let info = interpret_status(8);
        assert_eq!(info.code, ErrorKind::Infeasible);
        assert_eq!(
            info.message,
            "No feasible solution found. Try relaxing constraints or check input data."
        );
    }

    #[test]
    fn test_numerical_status() {
        let info = interpret_status(13);
        assert_eq!(info.code, ErrorKind::Numerical);
        assert_eq!(
            info.message,
            "Solver encountered numerical instability. Check data for extreme or inconsistent values."
        );
    }

    #[test]
    fn test_other_codes_are_unknown() {
        for code in [0, 1, 5, 7, 9, -1, 99, 1000] {
            let info = interpret_status(code);
            assert_eq!(info.code, ErrorKind::Unknown, "code {}", code);
            assert_eq!(
                info.message,
                format!("Solver terminated with status code {}.", code)
            );
        }
    }

    #[test]
    fn test_non_numeric_statuses_are_interpolated_verbatim() {
        assert_eq!(
            interpret_status("invalid").message,
            "Solver terminated with status code invalid."
        );
        assert_eq!(
            interpret_status(RawStatus::Null).message,
            "Solver terminated with status code null."
        );
        assert_eq!(
            interpret_status(None::<i32>).message,
            "Solver terminated with status code undefined."
        );
        assert_eq!(interpret_status(Some(8)).code, ErrorKind::Infeasible);
    }

    #[test]
    fn test_text_eight_is_not_special_cased() {
        assert_eq!(interpret_status("8").code, ErrorKind::Unknown);
    }

    #[test]
    fn test_solver_error_matches_interpretation() {
        for status in [
            RawStatus::Code(8),
            RawStatus::Code(13),
            RawStatus::Code(7),
            RawStatus::Text("invalid".into()),
            RawStatus::Null,
            RawStatus::Undefined,
        ] {
            let info = interpret_status(status.clone());
            let err = SolverError::from_status(status);
            assert_eq!(err.code, info.code);
            assert_eq!(err.message, info.message);
            assert_eq!(err.to_string(), info.message);
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_error_kinds_serialize_as_error_codes() {
        for kind in [ErrorKind::Infeasible, ErrorKind::Numerical, ErrorKind::Unknown] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.error_code().to_string()));
            assert_eq!(serde_json::from_value::<ErrorKind>(json).unwrap(), kind);
        }
        let info = serde_json::to_value(interpret_status(8)).unwrap();
        assert_eq!(info["code"], "E_SOLVER_INFEASIBLE");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_values() {
        use serde_json::json;
        assert_eq!(interpret_status(&json!(8)).code, ErrorKind::Infeasible);
        assert_eq!(interpret_status(&json!(13.0)).code, ErrorKind::Numerical);
        assert_eq!(
            interpret_status(&json!(null)).message,
            "Solver terminated with status code null."
        );
        assert_eq!(
            interpret_status(&json!("invalid")).message,
            "Solver terminated with status code invalid."
        );
    }
}
