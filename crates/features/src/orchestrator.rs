//! Pipeline orchestration: generate, merge, guard memory, select.
//!
//! Every generator sees only the input dataset, never another generator's
//! output, so sequential and parallel runs produce identical columns. In
//! parallel mode each generator runs on a blocking worker task and results
//! are merged back in registry order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use algo_features_core::{
    ConfigLoader, Dataset, FeatureCategory, FeatureConfig, FeatureError, FeatureFrame,
    FeatureGenerator, FeatureRecord,
};
use anyhow::Context;
use futures_util::future::join_all;

use crate::registry::GeneratorRegistry;
use crate::selection::{FeatureSelector, SelectionResult};
use crate::summary::{GeneratorRun, PartialSelection, RunSummary, SkippedGenerator, BYTES_PER_MB};

/// Result of the generation stage.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    /// Input columns plus every generated column that survived the memory guard
    pub dataset: Dataset,
    /// Records for the generated columns, in merge order
    pub features: Vec<FeatureRecord>,
    pub hints: HashMap<String, f64>,
    pub summary: RunSummary,
}

/// Result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Dataset with every generated column
    pub enlarged: Dataset,
    /// OHLCV columns plus the selected features only
    pub reduced: Dataset,
    pub selection: SelectionResult,
    /// Every candidate feature with its aggregate score as importance
    pub features: Vec<FeatureRecord>,
    pub summary: RunSummary,
}

impl PipelineOutput {
    /// Up to `n` kept features, highest aggregate first.
    #[must_use]
    pub fn top_features(&self, n: usize) -> Vec<&FeatureRecord> {
        self.selection
            .kept
            .iter()
            .take(n)
            .filter_map(|name| self.features.iter().find(|r| &r.name == name))
            .collect()
    }

    /// Kept feature names grouped by category.
    #[must_use]
    pub fn features_by_category(&self) -> BTreeMap<FeatureCategory, Vec<&str>> {
        let mut grouped: BTreeMap<FeatureCategory, Vec<&str>> = BTreeMap::new();
        for name in &self.selection.kept {
            if let Some(record) = self.features.iter().find(|r| &r.name == name) {
                grouped.entry(record.category).or_default().push(&record.name);
            }
        }
        grouped
    }

    /// Run summary followed by the top ranked features.
    #[must_use]
    pub fn report(&self, top: usize) -> String {
        let mut output = self.summary.to_text();
        output.push('\n');
        output.push_str("Top Features\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        for (i, record) in self.top_features(top).into_iter().enumerate() {
            output.push_str(&format!(
                "{:>3}. {:<40} {:.4}\n",
                i + 1,
                record.name,
                record.importance.unwrap_or(0.0)
            ));
        }
        output
    }
}

/// Runs the configured generators and feature selection over a dataset.
///
/// # Example
///
/// ```ignore
/// let orchestrator = FeatureOrchestrator::new(FeatureConfig::default())?;
/// let output = orchestrator.run(dataset, Some(&target)).await?;
/// println!("{}", output.report(20));
/// ```
pub struct FeatureOrchestrator {
    config: FeatureConfig,
    registry: GeneratorRegistry,
    selector: FeatureSelector,
}

impl FeatureOrchestrator {
    /// Validates the configuration and registers the enabled built-in
    /// generators.
    ///
    /// # Errors
    /// Returns `FeatureError::Configuration` listing every violation, or
    /// `FeatureError::MergeConflict` if two generators declare one column.
    pub fn new(config: FeatureConfig) -> Result<Self, FeatureError> {
        let registry = GeneratorRegistry::from_config(&config);
        Self::with_registry(config, registry)
    }

    /// Uses a caller-assembled registry instead of the built-in one.
    ///
    /// # Errors
    /// Same as [`FeatureOrchestrator::new`], plus any violation reported by
    /// the registered generators themselves.
    pub fn with_registry(
        config: FeatureConfig,
        registry: GeneratorRegistry,
    ) -> Result<Self, FeatureError> {
        let mut violations = config.validate();
        for violation in registry.validate() {
            if !violations.contains(&violation) {
                violations.push(violation);
            }
        }
        if !violations.is_empty() {
            return Err(FeatureError::Configuration { violations });
        }
        registry.check_conflicts()?;

        let selector = FeatureSelector::new(&config);
        tracing::info!(
            generators = ?registry.names(),
            parallel = config.parallel_processing,
            max_features = config.max_features,
            "feature orchestrator ready"
        );
        Ok(Self {
            config,
            registry,
            selector,
        })
    }

    /// Loads configuration from a file (with environment overrides) and
    /// builds the orchestrator.
    ///
    /// # Errors
    /// Returns an error if the file cannot be loaded or the configuration
    /// is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config = ConfigLoader::load_from(path)
            .with_context(|| format!("loading feature config from {}", path.display()))?;
        Self::new(config).context("building feature orchestrator")
    }

    #[must_use]
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    #[must_use]
    pub fn selector(&self) -> &FeatureSelector {
        &self.selector
    }

    /// Every column the registered generators will produce.
    #[must_use]
    pub fn declared_features(&self) -> Vec<FeatureRecord> {
        self.registry.declared_features()
    }

    /// Runs every generator and merges their columns into the dataset.
    ///
    /// Generators needing more rows than available are skipped and recorded
    /// in the summary. The memory guard runs after each merge.
    ///
    /// # Errors
    /// Returns the first fatal generator error, a `FeatureError::Worker` if
    /// a worker task panics, or `FeatureError::Dataset` if a generator's
    /// output does not match its declaration.
    pub async fn generate(&self, dataset: Dataset) -> Result<GenerationOutput, FeatureError> {
        let started = Instant::now();
        let rows = dataset.len();
        let mut summary = RunSummary::new(
            rows,
            self.config.parallel_processing,
            self.config.memory_limit,
        );

        let mut runnable: Vec<Arc<dyn FeatureGenerator>> = Vec::new();
        for generator in self.registry.iter() {
            let required = generator.min_rows();
            if rows < required {
                let err = FeatureError::InsufficientData {
                    generator: generator.name().to_string(),
                    required,
                    available: rows,
                };
                tracing::warn!(
                    generator = %generator.name(),
                    required,
                    available = rows,
                    "skipping generator: insufficient data"
                );
                summary.skipped.push(SkippedGenerator {
                    name: generator.name().to_string(),
                    reason: err.to_string(),
                });
                summary.issues.push(err.to_string());
                continue;
            }
            runnable.push(Arc::clone(generator));
        }

        let input = Arc::new(dataset);
        let mut merger = Merger::new((*input).clone(), summary, &self.config, &self.selector);

        if self.config.parallel_processing {
            let tasks = runnable.iter().map(|generator| {
                let generator = Arc::clone(generator);
                let input = Arc::clone(&input);
                tokio::task::spawn_blocking(move || {
                    let started = Instant::now();
                    let frame = generator.generate(&input);
                    (frame, started.elapsed())
                })
            });
            let results = join_all(tasks).await;

            for (generator, joined) in runnable.iter().zip(results) {
                let (frame, elapsed) = joined.map_err(|e| {
                    FeatureError::Worker(format!("generator '{}': {e}", generator.name()))
                })?;
                merger.merge(generator.as_ref(), frame?, elapsed)?;
            }
        } else {
            for generator in &runnable {
                let started = Instant::now();
                let frame = generator.generate(&input)?;
                merger.merge(generator.as_ref(), frame, started.elapsed())?;
            }
        }

        let mut output = merger.finish();
        output.summary.generation_ms = millis(started.elapsed());
        tracing::info!(
            generated = output.features.len(),
            skipped = output.summary.skipped.len(),
            elapsed_ms = output.summary.generation_ms,
            "generation complete"
        );
        Ok(output)
    }

    /// Generates features, then selects among them.
    ///
    /// Without a target the supervised selection methods are skipped and
    /// reported as issues in the summary.
    ///
    /// # Errors
    /// Returns `FeatureError::Dataset` if the target length differs from
    /// the dataset length, plus any error from [`FeatureOrchestrator::generate`].
    pub async fn run(
        &self,
        dataset: Dataset,
        target: Option<&[f64]>,
    ) -> Result<PipelineOutput, FeatureError> {
        if let Some(target) = target {
            if target.len() != dataset.len() {
                return Err(FeatureError::Dataset(format!(
                    "target has {} rows, dataset has {}",
                    target.len(),
                    dataset.len()
                )));
            }
        }

        let GenerationOutput {
            dataset: enlarged,
            features,
            hints,
            mut summary,
        } = self.generate(dataset).await?;

        let started = Instant::now();
        let selection = self.selector.select(&enlarged, &features, &hints, target)?;
        summary.selection_ms = millis(started.elapsed());

        for (method, reason) in selection.skipped_methods() {
            summary
                .issues
                .push(format!("selection method '{method}' skipped: {reason}"));
        }

        let features: Vec<FeatureRecord> = features
            .into_iter()
            .map(|mut record| {
                record.importance = selection.score(&record.name).map(|s| s.aggregate);
                record
            })
            .collect();

        let kept: HashSet<&str> = selection.kept.iter().map(String::as_str).collect();
        for record in features.iter().filter(|r| kept.contains(r.name.as_str())) {
            *summary.selected_by_category.entry(record.category).or_insert(0) += 1;
        }

        let reduced = enlarged.with_columns_only(&selection.kept);
        tracing::info!(
            candidates = features.len(),
            selected = selection.kept.len(),
            elapsed_ms = summary.selection_ms,
            "selection complete"
        );

        Ok(PipelineOutput {
            enlarged,
            reduced,
            selection,
            features,
            summary,
        })
    }
}

impl std::fmt::Debug for FeatureOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureOrchestrator")
            .field("registry", &self.registry)
            .field("parallel", &self.config.parallel_processing)
            .finish_non_exhaustive()
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Accumulates generator output and enforces the memory limit.
struct Merger<'a> {
    dataset: Dataset,
    features: Vec<FeatureRecord>,
    hints: HashMap<String, f64>,
    summary: RunSummary,
    config: &'a FeatureConfig,
    selector: &'a FeatureSelector,
}

impl<'a> Merger<'a> {
    fn new(
        dataset: Dataset,
        summary: RunSummary,
        config: &'a FeatureConfig,
        selector: &'a FeatureSelector,
    ) -> Self {
        let mut merger = Self {
            dataset,
            features: Vec::new(),
            hints: HashMap::new(),
            summary,
            config,
            selector,
        };
        merger.summary.peak_memory_mb = merger.memory_mb();
        merger
    }

    fn memory_mb(&self) -> f64 {
        self.dataset.estimated_bytes() as f64 / BYTES_PER_MB
    }

    fn merge(
        &mut self,
        generator: &dyn FeatureGenerator,
        frame: FeatureFrame,
        elapsed: Duration,
    ) -> Result<(), FeatureError> {
        let name = generator.name();
        let category = generator.category();
        frame.verify(name, &generator.declared_feature_names(), self.dataset.len())?;

        let columns = frame.len();
        for column in frame.into_columns() {
            self.features.push(FeatureRecord::new(column.name.clone(), category));
            self.dataset.add_column(column)?;
        }
        self.hints.extend(generator.importance_hints());

        let elapsed_ms = millis(elapsed);
        *self.summary.generated_by_category.entry(category).or_insert(0) += columns;
        self.summary.generators.push(GeneratorRun {
            name: name.to_string(),
            category,
            columns,
            elapsed_ms,
        });
        tracing::info!(generator = %name, columns, elapsed_ms, "generator merged");

        self.guard_memory(name)
    }

    fn guard_memory(&mut self, stage: &str) -> Result<(), FeatureError> {
        let before = self.memory_mb();
        self.summary.peak_memory_mb = self.summary.peak_memory_mb.max(before);

        let Some(limit) = self.config.memory_limit else {
            return Ok(());
        };
        if before <= limit {
            return Ok(());
        }

        let budget = self
            .config
            .max_features
            .saturating_mul(self.config.selection.partial_selection_factor.max(1));
        if self.features.len() <= budget {
            tracing::warn!(
                stage,
                memory_mb = before,
                limit_mb = limit,
                "memory estimate over limit, nothing left to prune"
            );
            self.summary.issues.push(format!(
                "estimated memory {before:.1} MB exceeds limit {limit:.1} MB after '{stage}'"
            ));
            return Ok(());
        }

        let result =
            self.selector
                .select_unsupervised(&self.dataset, &self.features, &self.hints, budget)?;
        let dropped: Vec<String> = result.dropped().into_iter().map(str::to_string).collect();
        let kept: HashSet<&str> = result.kept.iter().map(String::as_str).collect();

        let columns_before = self.features.len();
        self.dataset.drop_columns(&dropped);
        self.features.retain(|r| kept.contains(r.name.as_str()));
        self.hints.retain(|name, _| kept.contains(name.as_str()));

        let after = self.memory_mb();
        tracing::warn!(
            stage,
            memory_mb = before,
            limit_mb = limit,
            columns_before,
            columns_after = self.features.len(),
            "memory limit exceeded, ran partial selection"
        );
        self.summary.partial_selections.push(PartialSelection {
            after_generator: stage.to_string(),
            columns_before,
            columns_after: self.features.len(),
            memory_mb_before: before,
            memory_mb_after: after,
        });
        if after > limit {
            self.summary.issues.push(format!(
                "estimated memory {after:.1} MB still exceeds limit {limit:.1} MB after partial selection"
            ));
        }
        Ok(())
    }

    fn finish(self) -> GenerationOutput {
        GenerationOutput {
            dataset: self.dataset,
            features: self.features,
            hints: self.hints,
            summary: self.summary,
        }
    }
}
