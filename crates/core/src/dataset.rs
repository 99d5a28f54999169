//! Time-indexed columnar dataset.
//!
//! Missing values are represented as `f64::NAN`. Rows are never added,
//! removed, or reordered once a dataset is built; generators only append
//! columns and the selector only removes generated columns.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FeatureError;

/// Price and volume columns every dataset must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Returns true if `value` is the missing-value marker.
#[inline]
#[must_use]
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// A single OHLCV observation as supplied by a data loader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Observation time; `None` when the source row had no usable timestamp
    pub timestamp: Option<DateTime<Utc>>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A named numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Fraction of rows holding a non-missing value.
    #[must_use]
    pub fn coverage(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let present = self.values.iter().filter(|v| !is_missing(**v)).count();
        present as f64 / self.values.len() as f64
    }
}

/// Ordered, time-indexed table of named `f64` columns.
#[derive(Debug, Clone)]
pub struct Dataset {
    timestamps: Vec<Option<DateTime<Utc>>>,
    columns: Vec<Column>,
    index: HashMap<String, usize>,
}

impl Dataset {
    /// Builds a dataset from timestamps and columns.
    ///
    /// # Errors
    /// Returns `FeatureError::Dataset` if a required OHLCV column is absent,
    /// a column length differs from the timestamp count, or a name repeats.
    pub fn new(
        timestamps: Vec<Option<DateTime<Utc>>>,
        columns: Vec<Column>,
    ) -> Result<Self, FeatureError> {
        let mut dataset = Self {
            timestamps,
            columns: Vec::with_capacity(columns.len()),
            index: HashMap::with_capacity(columns.len()),
        };

        for column in columns {
            dataset.add_column(column)?;
        }

        for required in REQUIRED_COLUMNS {
            if !dataset.has_column(required) {
                return Err(FeatureError::Dataset(format!(
                    "missing required column '{required}'"
                )));
            }
        }

        Ok(dataset)
    }

    /// Builds a dataset from a slice of OHLCV bars.
    ///
    /// # Errors
    /// Never fails for well-formed bars; the `Result` mirrors [`Dataset::new`].
    pub fn from_bars(bars: &[Bar]) -> Result<Self, FeatureError> {
        let timestamps = bars.iter().map(|b| b.timestamp).collect();
        let columns = vec![
            Column::new("open", bars.iter().map(|b| b.open).collect()),
            Column::new("high", bars.iter().map(|b| b.high).collect()),
            Column::new("low", bars.iter().map(|b| b.low).collect()),
            Column::new("close", bars.iter().map(|b| b.close).collect()),
            Column::new("volume", bars.iter().map(|b| b.volume).collect()),
        ];
        Self::new(timestamps, columns)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    #[must_use]
    pub fn timestamps(&self) -> &[Option<DateTime<Utc>>] {
        &self.timestamps
    }

    /// Returns the values of a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.index
            .get(name)
            .map(|&i| self.columns[i].values.as_slice())
    }

    /// Returns a column by name, or a dataset error naming it.
    ///
    /// # Errors
    /// Returns `FeatureError::Dataset` when the column does not exist.
    pub fn require(&self, name: &str) -> Result<&[f64], FeatureError> {
        self.column(name)
            .ok_or_else(|| FeatureError::Dataset(format!("column '{name}' not found")))
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Column names in declaration order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Appends a column.
    ///
    /// # Errors
    /// Returns `FeatureError::Dataset` on a duplicate name or length mismatch.
    pub fn add_column(&mut self, column: Column) -> Result<(), FeatureError> {
        if column.values.len() != self.timestamps.len() {
            return Err(FeatureError::Dataset(format!(
                "column '{}' has {} rows, dataset has {}",
                column.name,
                column.values.len(),
                self.timestamps.len()
            )));
        }
        if self.index.contains_key(&column.name) {
            return Err(FeatureError::Dataset(format!(
                "column '{}' already exists",
                column.name
            )));
        }
        self.index.insert(column.name.clone(), self.columns.len());
        self.columns.push(column);
        Ok(())
    }

    /// Returns a copy holding the required OHLCV columns followed by `keep`
    /// in the given order. Unknown names are ignored; rows are untouched.
    #[must_use]
    pub fn with_columns_only(&self, keep: &[String]) -> Self {
        let mut columns: Vec<Column> = self
            .columns
            .iter()
            .filter(|c| REQUIRED_COLUMNS.contains(&c.name.as_str()))
            .cloned()
            .collect();

        for name in keep {
            if REQUIRED_COLUMNS.contains(&name.as_str()) {
                continue;
            }
            if let Some(&i) = self.index.get(name) {
                columns.push(self.columns[i].clone());
            }
        }

        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        Self {
            timestamps: self.timestamps.clone(),
            columns,
            index,
        }
    }

    /// Removes the named columns, leaving required OHLCV columns in place.
    pub fn drop_columns(&mut self, names: &[String]) {
        self.columns.retain(|c| {
            REQUIRED_COLUMNS.contains(&c.name.as_str()) || !names.contains(&c.name)
        });
        self.index = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
    }

    /// Approximate in-memory size in bytes (`f64` values plus timestamps).
    #[must_use]
    pub fn estimated_bytes(&self) -> usize {
        self.len() * (self.columns.len() + 1) * std::mem::size_of::<f64>()
    }

    /// Forward return of `column` over `horizon` rows: `x[t+h] / x[t] - 1`.
    ///
    /// The last `horizon` rows and rows with a zero reference are missing.
    ///
    /// # Errors
    /// Returns `FeatureError::Dataset` if the column does not exist.
    pub fn forward_returns(&self, column: &str, horizon: usize) -> Result<Vec<f64>, FeatureError> {
        let values = self.require(column)?;
        let n = values.len();
        Ok((0..n)
            .map(|t| {
                if t + horizon >= n || horizon == 0 {
                    return f64::NAN;
                }
                let reference = values[t];
                if reference == 0.0 || is_missing(reference) {
                    f64::NAN
                } else {
                    values[t + horizon] / reference - 1.0
                }
            })
            .collect())
    }
}
