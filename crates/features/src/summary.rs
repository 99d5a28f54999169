//! Run summary and human-readable report.

#![allow(clippy::format_push_string)]

use std::collections::BTreeMap;

use algo_features_core::FeatureCategory;
use serde::{Deserialize, Serialize};

/// Bytes per reported megabyte.
pub const BYTES_PER_MB: f64 = 1_000_000.0;

/// One generator that produced columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorRun {
    pub name: String,
    pub category: FeatureCategory,
    pub columns: usize,
    pub elapsed_ms: u64,
}

/// One generator that was skipped and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedGenerator {
    pub name: String,
    pub reason: String,
}

/// A memory-guard pruning pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialSelection {
    /// Generator whose merge pushed the estimate over the limit
    pub after_generator: String,
    pub columns_before: usize,
    pub columns_after: usize,
    pub memory_mb_before: f64,
    pub memory_mb_after: f64,
}

/// What happened during one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub rows: usize,
    pub parallel: bool,
    pub generators: Vec<GeneratorRun>,
    pub skipped: Vec<SkippedGenerator>,
    /// Columns produced per category, before any pruning
    pub generated_by_category: BTreeMap<FeatureCategory, usize>,
    /// Columns kept per category after selection
    pub selected_by_category: BTreeMap<FeatureCategory, usize>,
    /// Non-fatal problems: skipped generators, skipped selection methods,
    /// memory-guard warnings
    pub issues: Vec<String>,
    pub memory_limit_mb: Option<f64>,
    pub peak_memory_mb: f64,
    pub partial_selections: Vec<PartialSelection>,
    pub generation_ms: u64,
    pub selection_ms: u64,
}

impl RunSummary {
    #[must_use]
    pub fn new(rows: usize, parallel: bool, memory_limit_mb: Option<f64>) -> Self {
        Self {
            rows,
            parallel,
            generators: Vec::new(),
            skipped: Vec::new(),
            generated_by_category: BTreeMap::new(),
            selected_by_category: BTreeMap::new(),
            issues: Vec::new(),
            memory_limit_mb,
            peak_memory_mb: 0.0,
            partial_selections: Vec::new(),
            generation_ms: 0,
            selection_ms: 0,
        }
    }

    /// Total columns produced across all generators.
    #[must_use]
    pub fn total_generated(&self) -> usize {
        self.generated_by_category.values().sum()
    }

    #[must_use]
    pub fn total_selected(&self) -> usize {
        self.selected_by_category.values().sum()
    }

    /// Serializes the summary as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    #[must_use]
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                  FEATURE PIPELINE SUMMARY                     \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output.push_str("Run\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("Rows:                  {}\n", self.rows));
        output.push_str(&format!(
            "Mode:                  {}\n",
            if self.parallel { "parallel" } else { "sequential" }
        ));
        output.push_str(&format!("Generation:            {} ms\n", self.generation_ms));
        output.push_str(&format!("Selection:             {} ms\n", self.selection_ms));
        output.push('\n');

        output.push_str("Generators\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        for run in &self.generators {
            output.push_str(&format!(
                "{:<22} {:>5} columns  {:>6} ms\n",
                run.name, run.columns, run.elapsed_ms
            ));
        }
        for skipped in &self.skipped {
            output.push_str(&format!("{:<22} skipped: {}\n", skipped.name, skipped.reason));
        }
        output.push('\n');

        output.push_str("Features by Category        generated    selected\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        for category in FeatureCategory::ALL {
            let generated = self.generated_by_category.get(&category).copied().unwrap_or(0);
            let selected = self.selected_by_category.get(&category).copied().unwrap_or(0);
            if generated == 0 && selected == 0 {
                continue;
            }
            output.push_str(&format!(
                "{:<27} {:>9}   {:>9}\n",
                category.as_str(),
                generated,
                selected
            ));
        }
        output.push_str(&format!(
            "{:<27} {:>9}   {:>9}\n",
            "total",
            self.total_generated(),
            self.total_selected()
        ));
        output.push('\n');

        output.push_str("Memory\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        match self.memory_limit_mb {
            Some(limit) => output.push_str(&format!("Limit:                 {limit:.1} MB\n")),
            None => output.push_str("Limit:                 none\n"),
        }
        output.push_str(&format!(
            "Peak Estimate:         {:.1} MB\n",
            self.peak_memory_mb
        ));
        for partial in &self.partial_selections {
            output.push_str(&format!(
                "Pruned after {}: {} -> {} columns ({:.1} -> {:.1} MB)\n",
                partial.after_generator,
                partial.columns_before,
                partial.columns_after,
                partial.memory_mb_before,
                partial.memory_mb_after
            ));
        }

        if !self.issues.is_empty() {
            output.push('\n');
            output.push_str("Issues\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for issue in &self.issues {
                output.push_str(&format!("- {issue}\n"));
            }
        }

        output
    }
}
