use std::fs::File;
use std::io;
use std::path::Path;

use thiserror::Error;

/// One row of the meal dataset
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MealRecord {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub sodium: f64,
    pub price: Option<f64>,
}

/// How the loader treats numeric cells it cannot read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Read the leading number of each cell; a cell without one becomes NaN
    #[default]
    Lenient,
    /// Reject any cell that is not a complete, non-negative number
    Strict,
}

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("Row {row}: invalid number '{value}' in column '{column}'")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("Row {row}: negative value {value} in column '{column}'")]
    Negative {
        row: usize,
        column: &'static str,
        value: f64,
    },
}

pub const REQUIRED_COLUMNS: [&str; 5] = ["meal_name", "calories", "protein", "carbohydrates", "sodium"];

/// Meal data as parallel columns; row order is dataset order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub meal_names: Vec<String>,
    pub calories: Vec<f64>,
    pub protein: Vec<f64>,
    pub carbs: Vec<f64>,
    pub sodium: Vec<f64>,
    pub prices: Vec<Option<f64>>,
}

impl Dataset {
    pub fn meal_count(&self) -> usize {
        self.meal_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meal_names.is_empty()
    }

    pub fn push(&mut self, record: MealRecord) {
        self.meal_names.push(record.name);
        self.calories.push(record.calories);
        self.protein.push(record.protein);
        self.carbs.push(record.carbohydrates);
        self.sodium.push(record.sodium);
        self.prices.push(record.price);
    }

    pub fn from_records(records: impl IntoIterator<Item = MealRecord>) -> Self {
        let mut dataset = Self::default();
        for record in records {
            dataset.push(record);
        }
        dataset
    }

    pub fn record(&self, i: usize) -> MealRecord {
        MealRecord {
            name: self.meal_names[i].clone(),
            calories: self.calories[i],
            protein: self.protein[i],
            carbohydrates: self.carbs[i],
            sodium: self.sodium[i],
            price: self.prices[i],
        }
    }

    pub fn records(&self) -> impl Iterator<Item = MealRecord> + '_ {
        (0..self.meal_count()).map(|i| self.record(i))
    }

    /// Number of meals with at least one NaN nutrient
    pub fn count_unreadable(&self) -> usize {
        (0..self.meal_count())
            .filter(|&i| {
                self.calories[i].is_nan()
                    || self.protein[i].is_nan()
                    || self.carbs[i].is_nan()
                    || self.sodium[i].is_nan()
            })
            .count()
    }

    pub fn from_path(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let dataset = Self::from_reader(file, mode)?;
        tracing::info!(meals = dataset.meal_count(), path = %path.display(), "loaded meal dataset");
        Ok(dataset)
    }

    /// Read a CSV with a header row.
    ///
    /// Headers are matched after trimming, lowercasing and turning whitespace
    /// runs into `_`. `price` is optional; empty and `NA` prices read as missing.
    pub fn from_reader<R: io::Read>(reader: R, mode: LoadMode) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(normalize_header).collect();
        let mut required = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, name) in required.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h == name)
                .ok_or(DatasetError::MissingColumn(name))?;
        }
        let [name_idx, calories_idx, protein_idx, carbs_idx, sodium_idx] = required;
        let numeric_idx = [
            (REQUIRED_COLUMNS[1], calories_idx),
            (REQUIRED_COLUMNS[2], protein_idx),
            (REQUIRED_COLUMNS[3], carbs_idx),
            (REQUIRED_COLUMNS[4], sodium_idx),
        ];
        let price_idx = headers.iter().position(|h| h == "price");

        let mut dataset = Self::default();
        for (i, record) in csv_reader.records().enumerate() {
            let record = record?;
            // 1-based, counting the header line
            let row = i + 2;

            let mut numbers = [0.0; 4];
            for (slot, &(column, idx)) in numbers.iter_mut().zip(&numeric_idx) {
                let raw = record.get(idx).unwrap_or("");
                *slot = read_number(raw, row, column, mode)?;
            }

            let price = match price_idx {
                Some(idx) => read_price(record.get(idx).unwrap_or(""), row, mode)?,
                None => None,
            };

            dataset.push(MealRecord {
                name: record.get(name_idx).unwrap_or("").to_string(),
                calories: numbers[0],
                protein: numbers[1],
                carbohydrates: numbers[2],
                sodium: numbers[3],
                price,
            });
        }

        Ok(dataset)
    }
}

fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

fn read_number(raw: &str, row: usize, column: &'static str, mode: LoadMode) -> Result<f64, DatasetError> {
    match mode {
        LoadMode::Strict => {
            let value: f64 = raw.parse().map_err(|_| DatasetError::InvalidNumber {
                row,
                column,
                value: raw.to_string(),
            })?;
            if !value.is_finite() {
                return Err(DatasetError::InvalidNumber {
                    row,
                    column,
                    value: raw.to_string(),
                });
            }
            if value < 0.0 {
                return Err(DatasetError::Negative { row, column, value });
            }
            Ok(value)
        }
        LoadMode::Lenient => {
            let value = parse_leading_float(raw);
            if value.is_nan() {
                tracing::warn!(row, column, value = raw, "unreadable number, using NaN");
            }
            Ok(value)
        }
    }
}

fn read_price(raw: &str, row: usize, mode: LoadMode) -> Result<Option<f64>, DatasetError> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("na") {
        return Ok(None);
    }
    match mode {
        LoadMode::Strict => read_number(raw, row, "price", mode).map(Some),
        LoadMode::Lenient => {
            let value = parse_leading_float(raw);
            if value.is_nan() {
                tracing::warn!(row, value = raw, "unreadable price, treating as missing");
                Ok(None)
            } else {
                Ok(Some(value))
            }
        }
    }
}

/// Parse the longest numeric prefix of `text`, or NaN when there is none.
///
/// `"12.5g"` reads as 12.5, `"Infinity"` as infinity, `"abc"` as NaN.
pub fn parse_leading_float(text: &str) -> f64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    if text[end..].starts_with("Infinity") {
        return text[..end + "Infinity".len()].replace("Infinity", "inf").parse().unwrap_or(f64::NAN);
    }

    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end].parse().unwrap_or(f64::NAN)
}
