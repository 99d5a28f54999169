//! Selection result types.

use std::collections::BTreeMap;
use std::fmt;

use algo_features_core::{AggregationMethod, FeatureCategory};
use serde::{Deserialize, Serialize};

/// A selection method, including the correlation pruning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    CorrelationPruning,
    Intrinsic,
    MutualInformation,
    Lasso,
    TreeEnsemble,
}

impl SelectionMethod {
    /// Methods that produce a per-feature score, in evaluation order.
    pub const SCORING: [Self; 4] = [
        Self::Intrinsic,
        Self::MutualInformation,
        Self::Lasso,
        Self::TreeEnsemble,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CorrelationPruning => "correlation_pruning",
            Self::Intrinsic => "intrinsic",
            Self::MutualInformation => "mutual_information",
            Self::Lasso => "lasso",
            Self::TreeEnsemble => "tree_ensemble",
        }
    }

    /// True for methods that score features against a target column.
    #[must_use]
    pub const fn requires_target(self) -> bool {
        matches!(
            self,
            Self::MutualInformation | Self::Lasso | Self::TreeEnsemble
        )
    }
}

impl fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a method contributed to a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodOutcome {
    Applied,
    Skipped { reason: String },
}

impl MethodOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodReport {
    pub method: SelectionMethod,
    #[serde(flatten)]
    pub outcome: MethodOutcome,
}

/// Raw per-feature scores of one method, or why it did not run.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    /// One non-negative score per feature, aligned with [`ScoreTable::features`]
    Applied(Vec<f64>),
    Skipped(String),
}

impl ScoreOutcome {
    #[must_use]
    pub fn outcome(&self) -> MethodOutcome {
        match self {
            Self::Applied(_) => MethodOutcome::Applied,
            Self::Skipped(reason) => MethodOutcome::Skipped {
                reason: reason.clone(),
            },
        }
    }
}

/// Scores of every enabled scoring method over a feature list.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    pub features: Vec<String>,
    pub methods: Vec<(SelectionMethod, ScoreOutcome)>,
}

impl ScoreTable {
    /// Scores of `method` when it was applied.
    #[must_use]
    pub fn scores(&self, method: SelectionMethod) -> Option<&[f64]> {
        self.methods.iter().find_map(|(m, outcome)| match outcome {
            ScoreOutcome::Applied(scores) if *m == method => Some(scores.as_slice()),
            _ => None,
        })
    }

    #[must_use]
    pub fn reports(&self) -> Vec<MethodReport> {
        self.methods
            .iter()
            .map(|(method, outcome)| MethodReport {
                method: *method,
                outcome: outcome.outcome(),
            })
            .collect()
    }
}

/// Why a feature was not kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
    /// Fewer than two distinct present values
    NoVariance,
    /// Absolute correlation with an already-kept, higher-scoring feature
    /// exceeded the threshold
    Correlated { with: String, correlation: f64 },
    BelowMinImportance { score: f64, floor: f64 },
    /// Ranked beyond the feature budget
    OverBudget { rank: usize },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoVariance => write!(f, "no variance"),
            Self::Correlated { with, correlation } => {
                write!(f, "correlated with {with} (r={correlation:.3})")
            }
            Self::BelowMinImportance { score, floor } => {
                write!(f, "score {score:.4} below floor {floor:.4}")
            }
            Self::OverBudget { rank } => write!(f, "over budget (rank {rank})"),
        }
    }
}

/// Per-feature selection detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScore {
    pub name: String,
    pub category: FeatureCategory,
    /// Weighted mean of normalized method scores, in [0, 1]
    pub aggregate: f64,
    /// Raw score of every applied method
    pub methods: BTreeMap<SelectionMethod, f64>,
    pub kept: bool,
    pub drop_reason: Option<DropReason>,
}

/// Outcome of a selection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    /// Kept feature names by descending aggregate score, ties in
    /// declaration order
    pub kept: Vec<String>,
    /// Every candidate in declaration order
    pub scores: Vec<FeatureScore>,
    pub methods: Vec<MethodReport>,
    pub aggregation: AggregationMethod,
    pub correlation_threshold: f64,
    pub max_features: usize,
    pub min_importance: f64,
}

impl SelectionResult {
    /// Score entry of one feature.
    #[must_use]
    pub fn score(&self, name: &str) -> Option<&FeatureScore> {
        self.scores.iter().find(|s| s.name == name)
    }

    /// Names of the candidates that were dropped.
    #[must_use]
    pub fn dropped(&self) -> Vec<&str> {
        self.scores
            .iter()
            .filter(|s| !s.kept)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Methods that were skipped, with the reason.
    #[must_use]
    pub fn skipped_methods(&self) -> Vec<(SelectionMethod, &str)> {
        self.methods
            .iter()
            .filter_map(|m| match &m.outcome {
                MethodOutcome::Skipped { reason } => Some((m.method, reason.as_str())),
                MethodOutcome::Applied => None,
            })
            .collect()
    }

    /// Serializes the result as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Converts the result to a human-readable text format.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str("=== Feature Selection ===\n\n");
        output.push_str(&format!(
            "Candidates: {}  Kept: {}  (budget {}, floor {:.4}, |r| <= {:.2})\n",
            self.scores.len(),
            self.kept.len(),
            self.max_features,
            self.min_importance,
            self.correlation_threshold
        ));
        output.push_str(&format!("Aggregation: {:?}\n\n", self.aggregation));

        output.push_str("--- Methods ---\n");
        for report in &self.methods {
            match &report.outcome {
                MethodOutcome::Applied => {
                    output.push_str(&format!("{:<22} applied\n", report.method.as_str()));
                }
                MethodOutcome::Skipped { reason } => {
                    output.push_str(&format!(
                        "{:<22} skipped: {reason}\n",
                        report.method.as_str()
                    ));
                }
            }
        }

        output.push_str("\n--- Kept ---\n");
        for (rank, name) in self.kept.iter().enumerate() {
            let aggregate = self.score(name).map_or(f64::NAN, |s| s.aggregate);
            output.push_str(&format!("{:>4}. {name:<40} {aggregate:.4}\n", rank + 1));
        }

        output
    }
}
