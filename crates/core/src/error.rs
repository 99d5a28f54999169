//! Error taxonomy for the feature pipeline.
//!
//! Configuration, merge-conflict, dataset, and worker errors are fatal and
//! surface to the caller. Insufficient-data and unavailable-method errors are
//! recovered locally and only reported in the run summary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single configuration parameter that failed domain validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigViolation {
    /// Dotted path of the offending field, e.g. `cross_timeframe.pairs[0]`
    pub field: String,
    /// Human-readable description of the rule that was broken
    pub message: String,
}

impl ConfigViolation {
    /// Creates a new violation for `field`.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors produced by the feature pipeline.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// One or more configuration parameters failed validation.
    #[error("invalid configuration: {}", join_violations(.violations))]
    Configuration { violations: Vec<ConfigViolation> },

    /// The dataset is shorter than a generator's absolute minimum.
    #[error("generator '{generator}' needs at least {required} rows, dataset has {available}")]
    InsufficientData {
        generator: String,
        required: usize,
        available: usize,
    },

    /// A selection method cannot run with the inputs provided.
    #[error("selection method '{method}' unavailable: {reason}")]
    SelectionMethodUnavailable { method: String, reason: String },

    /// Two generators declare the same output column.
    #[error("column '{column}' is declared by both '{first}' and '{second}'")]
    MergeConflict {
        column: String,
        first: String,
        second: String,
    },

    /// The dataset or target is malformed.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// A parallel generator worker failed to complete.
    #[error("generator worker failed: {0}")]
    Worker(String),
}

impl FeatureError {
    /// Builds a configuration error from a single violation.
    #[must_use]
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            violations: vec![ConfigViolation::new(field, message)],
        }
    }

    /// Returns true for errors that abort the whole run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::InsufficientData { .. } | Self::SelectionMethodUnavailable { .. }
        )
    }
}

fn join_violations(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
