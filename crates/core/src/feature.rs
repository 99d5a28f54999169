//! Feature metadata shared by generators, the selector, and reports.

use serde::{Deserialize, Serialize};

/// Family a generated feature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureCategory {
    /// Derived from the high/low-direction and dual-wave signals
    Proprietary,
    /// Moving averages, oscillators, trend and volatility indicators
    Technical,
    /// Rolling distribution statistics and outlier flags
    Statistical,
    /// Calendar and session features
    Temporal,
    /// Short vs long horizon comparisons
    CrossTimeframe,
}

impl FeatureCategory {
    /// All categories in pipeline order.
    pub const ALL: [Self; 5] = [
        Self::Proprietary,
        Self::Technical,
        Self::Statistical,
        Self::Temporal,
        Self::CrossTimeframe,
    ];

    /// Column-name prefix every feature of this category starts with.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Proprietary => "prop_",
            Self::Technical => "tech_",
            Self::Statistical => "stat_",
            Self::Temporal => "time_",
            Self::CrossTimeframe => "ctf_",
        }
    }

    /// Snake-case identifier used in configuration and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proprietary => "proprietary",
            Self::Technical => "technical",
            Self::Statistical => "statistical",
            Self::Temporal => "temporal",
            Self::CrossTimeframe => "cross_timeframe",
        }
    }

    /// Infers the category from a column name's prefix.
    #[must_use]
    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| name.starts_with(c.prefix()))
    }
}

impl std::fmt::Display for FeatureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata about one generated column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Column name in the dataset
    pub name: String,
    /// Generator family that produced the column
    pub category: FeatureCategory,
    /// Aggregated selection score, populated only after selection
    pub importance: Option<f64>,
}

impl FeatureRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, category: FeatureCategory) -> Self {
        Self {
            name: name.into(),
            category,
            importance: None,
        }
    }
}
