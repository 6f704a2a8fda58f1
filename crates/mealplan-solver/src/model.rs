use thiserror::Error;

/// Row-wise sparse constraint matrix.
///
/// Row `i` owns the entries `offsets[i]..offsets[i + 1]` of `indices` and `values`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowMatrix {
    pub offsets: Vec<usize>,
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl RowMatrix {
    /// Build a dense row-major matrix where every row has one entry per column.
    pub fn dense(rows: &[Vec<f64>], column_count: usize) -> Self {
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::with_capacity(rows.len() * column_count);
        let mut values = Vec::with_capacity(rows.len() * column_count);

        offsets.push(0);
        for row in rows {
            for (col, &value) in row.iter().enumerate().take(column_count) {
                indices.push(col);
                values.push(value);
            }
            offsets.push(indices.len());
        }

        Self { offsets, indices, values }
    }

    /// Entries of row `i` as `(column, coefficient)` pairs.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = self.offsets[i];
        let end = self.offsets[i + 1];
        self.indices[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }
}

/// A bounded linear model in column/row-range form.
///
/// Columns carry `[lower, upper]` bounds, rows carry `[lower, upper]` ranges on
/// `weights * x`. Infinite bounds are `f64::INFINITY` / `f64::NEG_INFINITY`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub column_count: usize,
    pub column_lower_bounds: Vec<f64>,
    pub column_upper_bounds: Vec<f64>,
    pub row_count: usize,
    pub row_lower_bounds: Vec<f64>,
    pub row_upper_bounds: Vec<f64>,
    pub weights: RowMatrix,
    pub objective_linear_weights: Vec<f64>,
    pub is_maximization: bool,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("{name} has length {actual}, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Row offsets must start at 0 and be non-decreasing (row {0})")]
    BadOffsets(usize),
    #[error("Row offsets end at {end} but the matrix has {nnz} entries")]
    OffsetOverrun { end: usize, nnz: usize },
    #[error("Column index {index} out of range in row {row}")]
    ColumnOutOfRange { row: usize, index: usize },
}

impl Model {
    /// Create an empty model with `column_count` columns bounded to `[0, +inf)`.
    pub fn new(column_count: usize) -> Self {
        Self {
            column_count,
            column_lower_bounds: vec![0.0; column_count],
            column_upper_bounds: vec![f64::INFINITY; column_count],
            row_count: 0,
            row_lower_bounds: Vec::new(),
            row_upper_bounds: Vec::new(),
            weights: RowMatrix {
                offsets: vec![0],
                indices: Vec::new(),
                values: Vec::new(),
            },
            objective_linear_weights: vec![0.0; column_count],
            is_maximization: false,
        }
    }

    /// Append a row with sparse `(column, coefficient)` entries.
    pub fn add_row(&mut self, lower: f64, upper: f64, entries: &[(usize, f64)]) {
        for &(col, value) in entries {
            self.weights.indices.push(col);
            self.weights.values.push(value);
        }
        self.weights.offsets.push(self.weights.indices.len());
        self.row_lower_bounds.push(lower);
        self.row_upper_bounds.push(upper);
        self.row_count += 1;
    }

    pub fn set_column_bounds(&mut self, col: usize, lower: f64, upper: f64) {
        self.column_lower_bounds[col] = lower;
        self.column_upper_bounds[col] = upper;
    }

    pub fn set_objective(&mut self, weights: Vec<f64>, maximize: bool) {
        self.objective_linear_weights = weights;
        self.is_maximization = maximize;
    }

    /// Coefficient vector of column `col` across all rows (zero where absent).
    pub fn column_profile(&self, col: usize) -> Vec<f64> {
        let mut profile = vec![0.0; self.row_count];
        for (i, slot) in profile.iter_mut().enumerate() {
            for (j, value) in self.weights.row(i) {
                if j == col {
                    *slot = value;
                }
            }
        }
        profile
    }

    /// Dense `row_count x column_count` copy of the constraint matrix.
    pub fn dense_rows(&self) -> Vec<Vec<f64>> {
        let mut rows = vec![vec![0.0; self.column_count]; self.row_count];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, value) in self.weights.row(i) {
                row[j] += value;
            }
        }
        rows
    }

    /// Activity `weights * x` of every row.
    pub fn row_activity(&self, x: &[f64]) -> Vec<f64> {
        (0..self.row_count)
            .map(|i| {
                self.weights
                    .row(i)
                    .map(|(j, value)| value * x.get(j).copied().unwrap_or(0.0))
                    .sum()
            })
            .collect()
    }

    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.objective_linear_weights
            .iter()
            .zip(x)
            .map(|(c, v)| c * v)
            .sum()
    }

    /// Check the structural invariants: vector lengths and monotonic row offsets.
    pub fn validate(&self) -> Result<(), ModelError> {
        let check = |name, expected, actual| {
            if expected == actual {
                Ok(())
            } else {
                Err(ModelError::LengthMismatch { name, expected, actual })
            }
        };
        check("column_lower_bounds", self.column_count, self.column_lower_bounds.len())?;
        check("column_upper_bounds", self.column_count, self.column_upper_bounds.len())?;
        check("objective_linear_weights", self.column_count, self.objective_linear_weights.len())?;
        check("row_lower_bounds", self.row_count, self.row_lower_bounds.len())?;
        check("row_upper_bounds", self.row_count, self.row_upper_bounds.len())?;
        check("weights.offsets", self.row_count + 1, self.weights.offsets.len())?;
        check("weights.values", self.weights.indices.len(), self.weights.values.len())?;

        if self.weights.offsets[0] != 0 {
            return Err(ModelError::BadOffsets(0));
        }
        for (row, pair) in self.weights.offsets.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(ModelError::BadOffsets(row + 1));
            }
        }
        let end = self.weights.offsets[self.row_count];
        if end > self.weights.nnz() {
            return Err(ModelError::OffsetOverrun { end, nnz: self.weights.nnz() });
        }
        for row in 0..self.row_count {
            for (index, _) in self.weights.row(row) {
                if index >= self.column_count {
                    return Err(ModelError::ColumnOutOfRange { row, index });
                }
            }
        }
        Ok(())
    }

    /// True when every bound and coefficient is a number (infinite bounds allowed).
    pub fn is_numeric(&self) -> bool {
        let finite = |v: &f64| v.is_finite();
        let not_nan = |v: &f64| !v.is_nan();
        self.weights.values.iter().all(finite)
            && self.objective_linear_weights.iter().all(finite)
            && self.column_lower_bounds.iter().all(not_nan)
            && self.column_upper_bounds.iter().all(not_nan)
            && self.row_lower_bounds.iter().all(not_nan)
            && self.row_upper_bounds.iter().all(not_nan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> Model {
        let mut model = Model::new(2);
        model.add_row(1.0, 4.0, &[(0, 1.0), (1, 2.0)]);
        model.add_row(f64::NEG_INFINITY, 3.0, &[(1, 1.0)]);
        model
    }

    #[test]
    fn test_add_row_keeps_offsets_monotonic() {
        let model = two_by_two();
        assert_eq!(model.weights.offsets, vec![0, 2, 3]);
        assert_eq!(model.row_count, 2);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_column_profile_fills_missing_entries_with_zero() {
        let model = two_by_two();
        assert_eq!(model.column_profile(0), vec![1.0, 0.0]);
        assert_eq!(model.column_profile(1), vec![2.0, 1.0]);
    }

    #[test]
    fn test_row_activity() {
        let model = two_by_two();
        assert_eq!(model.row_activity(&[1.0, 1.0]), vec![3.0, 1.0]);
    }

    #[test]
    fn test_validate_rejects_out_of_range_column() {
        let mut model = Model::new(1);
        model.add_row(0.0, 1.0, &[(3, 1.0)]);
        assert_eq!(
            model.validate(),
            Err(ModelError::ColumnOutOfRange { row: 0, index: 3 })
        );
    }

    #[test]
    fn test_validate_rejects_decreasing_offsets() {
        let mut model = two_by_two();
        model.weights.offsets = vec![0, 3, 2];
        assert_eq!(model.validate(), Err(ModelError::BadOffsets(2)));
    }

    #[test]
    fn test_dense_layout() {
        let matrix = RowMatrix::dense(&[vec![1.0, 2.0], vec![3.0, 4.0]], 2);
        assert_eq!(matrix.offsets, vec![0, 2, 4]);
        assert_eq!(matrix.indices, vec![0, 1, 0, 1]);
        assert_eq!(matrix.values, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
