//! Feature generator contract.
//!
//! Every generator family implements [`FeatureGenerator`] so the
//! orchestrator can compose them: each reads the shared dataset, never
//! mutates it, and returns its new columns as a [`FeatureFrame`].

use std::collections::HashMap;

use crate::dataset::{Column, Dataset};
use crate::error::{ConfigViolation, FeatureError};
use crate::feature::FeatureCategory;

/// Ordered set of columns produced by one generator run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    columns: Vec<Column>,
}

impl FeatureFrame {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Appends a column.
    pub fn push(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.columns.push(Column::new(name, values));
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Checks that the frame matches `declared` exactly and every column
    /// has `rows` values.
    ///
    /// # Errors
    /// Returns `FeatureError::Dataset` describing the first mismatch.
    pub fn verify(
        &self,
        generator: &str,
        declared: &[String],
        rows: usize,
    ) -> Result<(), FeatureError> {
        let produced = self.names();
        if produced.len() != declared.len()
            || produced.iter().zip(declared).any(|(p, d)| *p != d.as_str())
        {
            return Err(FeatureError::Dataset(format!(
                "generator '{generator}' produced {} columns that do not match its {} declared names",
                produced.len(),
                declared.len()
            )));
        }
        if let Some(bad) = self.columns.iter().find(|c| c.values.len() != rows) {
            return Err(FeatureError::Dataset(format!(
                "generator '{generator}' column '{}' has {} rows, expected {rows}",
                bad.name,
                bad.values.len()
            )));
        }
        Ok(())
    }
}

/// Capability every feature generator provides.
///
/// Generators hold their own configuration section. They must be
/// deterministic and read no external state; only the temporal generator
/// looks at each row's own timestamp.
pub trait FeatureGenerator: Send + Sync {
    /// Unique generator name used in logs, summaries, and conflict errors.
    fn name(&self) -> &str;

    fn category(&self) -> FeatureCategory;

    /// Ordered names of the columns [`generate`](Self::generate) adds.
    fn declared_feature_names(&self) -> Vec<String>;

    /// Violations of this generator's configuration section.
    fn validate_config(&self) -> Vec<ConfigViolation>;

    /// Smallest dataset this generator can produce anything for.
    fn min_rows(&self) -> usize;

    /// Computes the generator's columns for `dataset`.
    ///
    /// # Errors
    /// Returns an error if a required input column is absent.
    fn generate(&self, dataset: &Dataset) -> Result<FeatureFrame, FeatureError>;

    /// Intrinsic importance priors in [0, 1] for individual columns.
    /// Columns without a hint default to 1.0.
    fn importance_hints(&self) -> HashMap<String, f64> {
        HashMap::new()
    }

    /// Returns a copy of `dataset` with this generator's columns appended.
    ///
    /// # Errors
    /// Returns an error if generation fails or a column collides.
    fn apply(&self, dataset: &Dataset) -> Result<Dataset, FeatureError> {
        let frame = self.generate(dataset)?;
        frame.verify(self.name(), &self.declared_feature_names(), dataset.len())?;
        let mut out = dataset.clone();
        for column in frame.into_columns() {
            out.add_column(column)?;
        }
        Ok(out)
    }
}
