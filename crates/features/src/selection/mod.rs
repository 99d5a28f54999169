//! Feature selection.
//!
//! Candidate features are scored by independent methods (intrinsic prior,
//! mutual information, lasso, tree ensemble), the scores are normalized
//! and combined into one aggregate, and the ranking is then pruned:
//!
//! 1. columns without variance are dropped
//! 2. correlation pruning, visiting features by descending aggregate
//! 3. the `min_importance` floor
//! 4. the `max_features` budget
//!
//! Target-dependent methods are skipped, not failed, when no target is
//! supplied. The whole process is deterministic for a given seed.

mod forest;
mod intrinsic;
mod lasso;
mod mutual_info;
mod stats;
mod types;

use std::collections::{BTreeMap, HashMap};

use algo_features_core::{
    is_missing, AggregationMethod, Column, Dataset, FeatureConfig, FeatureError, FeatureRecord,
    SelectionConfig,
};
use tracing::{debug, warn};

pub use forest::{forest_importance, ForestParams};
pub use intrinsic::intrinsic_score;
pub use lasso::{lasso_importance, LassoParams};
pub use mutual_info::mutual_information;
pub use stats::{calculate_ranks, has_variance, pearson_correlation};
pub use types::{
    DropReason, FeatureScore, MethodOutcome, MethodReport, ScoreOutcome, ScoreTable,
    SelectionMethod, SelectionResult,
};

/// Reason recorded for target-dependent methods when no target is given.
pub const TARGET_REQUIRED: &str = "requires a target column";

/// Fewest target rows the supervised methods will fit on.
pub const MIN_TARGET_ROWS: usize = 10;

/// Scores and prunes candidate features.
#[derive(Debug, Clone)]
pub struct FeatureSelector {
    config: SelectionConfig,
    max_features: usize,
    min_importance: f64,
    correlation_threshold: f64,
}

impl FeatureSelector {
    /// Builds a selector from the top-level budget/threshold options and
    /// the `selection` section.
    #[must_use]
    pub fn new(config: &FeatureConfig) -> Self {
        Self {
            config: config.selection.clone(),
            max_features: config.max_features,
            min_importance: config.min_importance,
            correlation_threshold: config.correlation_threshold,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    fn enabled(&self, method: SelectionMethod) -> bool {
        match method {
            SelectionMethod::CorrelationPruning => self.config.correlation_pruning,
            SelectionMethod::Intrinsic => self.config.intrinsic,
            SelectionMethod::MutualInformation => self.config.mutual_information,
            SelectionMethod::Lasso => self.config.lasso,
            SelectionMethod::TreeEnsemble => self.config.tree_ensemble,
        }
    }

    fn weight(&self, method: SelectionMethod) -> f64 {
        let w = &self.config.method_weights;
        match method {
            SelectionMethod::Intrinsic => w.intrinsic,
            SelectionMethod::MutualInformation => w.mutual_information,
            SelectionMethod::Lasso => w.lasso,
            SelectionMethod::TreeEnsemble => w.tree_ensemble,
            SelectionMethod::CorrelationPruning => 0.0,
        }
    }

    /// Scores `features` with every enabled scoring method.
    ///
    /// # Errors
    /// Returns `FeatureError::Dataset` if a feature column is absent from
    /// `dataset` or the target length differs from the dataset length.
    pub fn score(
        &self,
        dataset: &Dataset,
        features: &[FeatureRecord],
        hints: &HashMap<String, f64>,
        target: Option<&[f64]>,
    ) -> Result<ScoreTable, FeatureError> {
        self.score_with(dataset, features, hints, target, &SelectionMethod::SCORING)
    }

    fn score_with(
        &self,
        dataset: &Dataset,
        features: &[FeatureRecord],
        hints: &HashMap<String, f64>,
        target: Option<&[f64]>,
        methods: &[SelectionMethod],
    ) -> Result<ScoreTable, FeatureError> {
        if let Some(t) = target {
            if t.len() != dataset.len() {
                return Err(FeatureError::Dataset(format!(
                    "target has {} rows, dataset has {}",
                    t.len(),
                    dataset.len()
                )));
            }
        }

        let columns = candidate_columns(dataset, features)?;
        let supervised = target.map(|t| SupervisedRows::new(&columns, t));

        let mut table = ScoreTable {
            features: features.iter().map(|f| f.name.clone()).collect(),
            methods: Vec::new(),
        };

        for &method in methods {
            if !self.enabled(method) {
                continue;
            }
            let outcome = if method.requires_target() {
                match &supervised {
                    None => ScoreOutcome::Skipped(TARGET_REQUIRED.to_string()),
                    Some(rows) if rows.target.len() < MIN_TARGET_ROWS => {
                        ScoreOutcome::Skipped(format!(
                            "only {} rows with a target value, need {MIN_TARGET_ROWS}",
                            rows.target.len()
                        ))
                    }
                    Some(rows) => ScoreOutcome::Applied(self.supervised_scores(method, rows)),
                }
            } else {
                ScoreOutcome::Applied(
                    features
                        .iter()
                        .zip(&columns)
                        .map(|(record, column)| {
                            let hint = hints.get(&record.name).copied().unwrap_or(1.0);
                            intrinsic_score(
                                column,
                                record.category,
                                hint,
                                &self.config.category_weights,
                            )
                        })
                        .collect(),
                )
            };

            match &outcome {
                ScoreOutcome::Applied(_) => debug!(method = %method, "selection method applied"),
                ScoreOutcome::Skipped(reason) => {
                    warn!(method = %method, reason = %reason, "selection method skipped");
                }
            }
            table.methods.push((method, outcome));
        }

        Ok(table)
    }

    fn supervised_scores(&self, method: SelectionMethod, rows: &SupervisedRows) -> Vec<f64> {
        let cfg = &self.config;
        match method {
            SelectionMethod::MutualInformation => rows
                .features
                .iter()
                .map(|x| mutual_information(x, &rows.target, cfg.mi_bins))
                .collect(),
            SelectionMethod::Lasso => lasso_importance(
                &rows.features,
                &rows.target,
                LassoParams {
                    alpha: cfg.lasso_alpha,
                    max_iter: cfg.lasso_max_iter,
                    tolerance: cfg.lasso_tolerance,
                },
            ),
            SelectionMethod::TreeEnsemble => forest_importance(
                &rows.imputed(),
                &rows.target,
                ForestParams {
                    trees: cfg.forest_trees,
                    max_depth: cfg.forest_max_depth,
                    min_samples_leaf: cfg.forest_min_samples_leaf,
                    sample_fraction: cfg.forest_sample_fraction,
                    seed: cfg.seed,
                },
            ),
            SelectionMethod::Intrinsic | SelectionMethod::CorrelationPruning => {
                vec![0.0; rows.features.len()]
            }
        }
    }

    /// Combines applied method scores into one aggregate per feature.
    ///
    /// With no applied method (or all weights zero) every feature gets 1.0,
    /// leaving declaration order to break the tie.
    #[must_use]
    pub fn aggregate(&self, table: &ScoreTable) -> Vec<f64> {
        let n = table.features.len();
        let mut total = vec![0.0; n];
        let mut weight_sum = 0.0;

        for (method, outcome) in &table.methods {
            let ScoreOutcome::Applied(scores) = outcome else {
                continue;
            };
            let weight = self.weight(*method);
            if weight <= 0.0 {
                continue;
            }
            let normalized = match self.config.aggregation {
                AggregationMethod::NormalizedMean => normalize_by_max(scores),
                AggregationMethod::RankMean => normalize_by_rank(scores),
            };
            for (t, v) in total.iter_mut().zip(normalized) {
                *t += weight * v;
            }
            weight_sum += weight;
        }

        if weight_sum <= 0.0 {
            return vec![1.0; n];
        }
        total.into_iter().map(|t| t / weight_sum).collect()
    }

    /// Runs the full selection with the configured `max_features` budget.
    ///
    /// # Errors
    /// Returns `FeatureError::Dataset` if a feature column is absent or the
    /// target length differs from the dataset length.
    pub fn select(
        &self,
        dataset: &Dataset,
        features: &[FeatureRecord],
        hints: &HashMap<String, f64>,
        target: Option<&[f64]>,
    ) -> Result<SelectionResult, FeatureError> {
        let table = self.score(dataset, features, hints, target)?;
        self.finish(dataset, features, &table, self.max_features)
    }

    /// Target-free selection (intrinsic score plus correlation pruning)
    /// keeping at most `budget` features. Used by the memory guard.
    ///
    /// # Errors
    /// Returns `FeatureError::Dataset` if a feature column is absent.
    pub fn select_unsupervised(
        &self,
        dataset: &Dataset,
        features: &[FeatureRecord],
        hints: &HashMap<String, f64>,
        budget: usize,
    ) -> Result<SelectionResult, FeatureError> {
        let table = self.score_with(
            dataset,
            features,
            hints,
            None,
            &[SelectionMethod::Intrinsic],
        )?;
        self.finish(dataset, features, &table, budget)
    }

    fn finish(
        &self,
        dataset: &Dataset,
        features: &[FeatureRecord],
        table: &ScoreTable,
        budget: usize,
    ) -> Result<SelectionResult, FeatureError> {
        let columns = candidate_columns(dataset, features)?;
        let aggregate = self.aggregate(table);
        let prune = self.enabled(SelectionMethod::CorrelationPruning);

        let mut order: Vec<usize> = (0..features.len()).collect();
        order.sort_by(|&a, &b| {
            aggregate[b]
                .partial_cmp(&aggregate[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut drop_reasons: Vec<Option<DropReason>> = vec![None; features.len()];
        let mut kept: Vec<usize> = Vec::new();

        for (position, &i) in order.iter().enumerate() {
            if !has_variance(&columns[i].values) {
                drop_reasons[i] = Some(DropReason::NoVariance);
                continue;
            }
            if prune {
                let correlated = kept.iter().find_map(|&k| {
                    let r = pearson_correlation(&columns[i].values, &columns[k].values);
                    (r.abs() > self.correlation_threshold).then_some((k, r))
                });
                if let Some((k, r)) = correlated {
                    drop_reasons[i] = Some(DropReason::Correlated {
                        with: features[k].name.clone(),
                        correlation: r,
                    });
                    continue;
                }
            }
            if aggregate[i] < self.min_importance {
                drop_reasons[i] = Some(DropReason::BelowMinImportance {
                    score: aggregate[i],
                    floor: self.min_importance,
                });
                continue;
            }
            if kept.len() >= budget {
                drop_reasons[i] = Some(DropReason::OverBudget {
                    rank: position + 1,
                });
                continue;
            }
            kept.push(i);
        }

        let mut methods = table.reports();
        if prune {
            methods.push(MethodReport {
                method: SelectionMethod::CorrelationPruning,
                outcome: MethodOutcome::Applied,
            });
        }

        let scores = features
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let per_method: BTreeMap<SelectionMethod, f64> = table
                    .methods
                    .iter()
                    .filter_map(|(m, outcome)| match outcome {
                        ScoreOutcome::Applied(s) => Some((*m, s[i])),
                        ScoreOutcome::Skipped(_) => None,
                    })
                    .collect();
                FeatureScore {
                    name: record.name.clone(),
                    category: record.category,
                    aggregate: aggregate[i],
                    methods: per_method,
                    kept: drop_reasons[i].is_none(),
                    drop_reason: drop_reasons[i].clone(),
                }
            })
            .collect();

        debug!(
            candidates = features.len(),
            kept = kept.len(),
            budget,
            "selection finished"
        );

        Ok(SelectionResult {
            kept: kept.iter().map(|&i| features[i].name.clone()).collect(),
            scores,
            methods,
            aggregation: self.config.aggregation,
            correlation_threshold: self.correlation_threshold,
            max_features: budget,
            min_importance: self.min_importance,
        })
    }
}

/// Looks up every candidate column in `dataset`.
fn candidate_columns<'a>(
    dataset: &'a Dataset,
    features: &[FeatureRecord],
) -> Result<Vec<&'a Column>, FeatureError> {
    features
        .iter()
        .map(|f| {
            dataset
                .columns()
                .iter()
                .find(|c| c.name == f.name)
                .ok_or_else(|| FeatureError::Dataset(format!("column '{}' not found", f.name)))
        })
        .collect()
}

/// Feature values restricted to the rows where the target is present.
struct SupervisedRows {
    features: Vec<Vec<f64>>,
    target: Vec<f64>,
}

impl SupervisedRows {
    fn new(columns: &[&Column], target: &[f64]) -> Self {
        let rows: Vec<usize> = (0..target.len()).filter(|&r| !is_missing(target[r])).collect();
        Self {
            features: columns
                .iter()
                .map(|c| rows.iter().map(|&r| c.values[r]).collect())
                .collect(),
            target: rows.iter().map(|&r| target[r]).collect(),
        }
    }

    /// Features with missing values replaced by the column mean (0.0 when
    /// the whole column is missing).
    fn imputed(&self) -> Vec<Vec<f64>> {
        self.features
            .iter()
            .map(|values| {
                let present: Vec<f64> = values.iter().copied().filter(|v| !is_missing(*v)).collect();
                let mean = if present.is_empty() {
                    0.0
                } else {
                    present.iter().sum::<f64>() / present.len() as f64
                };
                values
                    .iter()
                    .map(|v| if is_missing(*v) { mean } else { *v })
                    .collect()
            })
            .collect()
    }
}

/// Divides by the maximum score; all-zero input stays zero.
fn normalize_by_max(scores: &[f64]) -> Vec<f64> {
    let clean: Vec<f64> = scores
        .iter()
        .map(|s| if s.is_finite() { s.max(0.0) } else { 0.0 })
        .collect();
    let max = clean.iter().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        return vec![0.0; clean.len()];
    }
    clean.into_iter().map(|s| s / max).collect()
}

/// Maps scores to `(rank - 1) / (n - 1)`, ties sharing their average rank.
fn normalize_by_rank(scores: &[f64]) -> Vec<f64> {
    let clean: Vec<f64> = scores
        .iter()
        .map(|s| if s.is_finite() { *s } else { 0.0 })
        .collect();
    let n = clean.len();
    if n <= 1 {
        return vec![1.0; n];
    }
    calculate_ranks(&clean)
        .into_iter()
        .map(|r| (r - 1.0) / (n - 1) as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use algo_features_core::{Bar, FeatureCategory, MethodWeights};

    fn base_dataset(n: usize) -> Dataset {
        let bars: Vec<Bar> = (0..n)
            .map(|i| {
                let t = i as f64;
                Bar {
                    timestamp: None,
                    open: 100.0 + t,
                    high: 101.0 + t,
                    low: 99.0 + t,
                    close: 100.5 + t,
                    volume: 1_000.0,
                }
            })
            .collect();
        Dataset::from_bars(&bars).unwrap()
    }

    /// Dataset with a signal column, a near-copy of it, an independent
    /// column, and a constant column.
    fn fixture() -> (Dataset, Vec<FeatureRecord>, Vec<f64>) {
        let n = 200;
        let mut ds = base_dataset(n);
        let signal: Vec<f64> = (0..n).map(|i| (i as f64 * 0.2).sin()).collect();
        let echo: Vec<f64> = signal.iter().map(|s| 2.0 * s + 1.0).collect();
        let other: Vec<f64> = (0..n).map(|i| (i as f64 * 1.3).cos()).collect();
        let target: Vec<f64> = signal.iter().map(|s| 0.5 * s).collect();

        ds.add_column(Column::new("tech_signal", signal)).unwrap();
        ds.add_column(Column::new("stat_echo", echo)).unwrap();
        ds.add_column(Column::new("ctf_other", other)).unwrap();
        ds.add_column(Column::new("stat_flat", vec![2.0; n])).unwrap();

        let records = vec![
            FeatureRecord::new("tech_signal", FeatureCategory::Technical),
            FeatureRecord::new("stat_echo", FeatureCategory::Statistical),
            FeatureRecord::new("ctf_other", FeatureCategory::CrossTimeframe),
            FeatureRecord::new("stat_flat", FeatureCategory::Statistical),
        ];
        (ds, records, target)
    }

    fn selector(config: FeatureConfig) -> FeatureSelector {
        FeatureSelector::new(&config)
    }

    // ============================================
    // Scoring Tests
    // ============================================

    #[test]
    fn score_without_target_skips_supervised_methods() {
        let (ds, records, _) = fixture();
        let table = selector(FeatureConfig::default())
            .score(&ds, &records, &HashMap::new(), None)
            .unwrap();

        assert!(table.scores(SelectionMethod::Intrinsic).is_some());
        for method in [
            SelectionMethod::MutualInformation,
            SelectionMethod::Lasso,
            SelectionMethod::TreeEnsemble,
        ] {
            let (_, outcome) = table.methods.iter().find(|(m, _)| *m == method).unwrap();
            assert_eq!(outcome, &ScoreOutcome::Skipped(TARGET_REQUIRED.to_string()));
        }
    }

    #[test]
    fn score_with_target_applies_all_methods() {
        let (ds, records, target) = fixture();
        let table = selector(FeatureConfig::default())
            .score(&ds, &records, &HashMap::new(), Some(target.as_slice()))
            .unwrap();

        assert_eq!(table.methods.len(), 4);
        let mi = table.scores(SelectionMethod::MutualInformation).unwrap();
        assert!(mi[0] > mi[2]);
    }

    #[test]
    fn disabled_methods_are_omitted() {
        let mut config = FeatureConfig::default();
        config.selection.lasso = false;
        config.selection.tree_ensemble = false;

        let (ds, records, target) = fixture();
        let table = selector(config)
            .score(&ds, &records, &HashMap::new(), Some(target.as_slice()))
            .unwrap();

        let methods: Vec<SelectionMethod> = table.methods.iter().map(|(m, _)| *m).collect();
        assert_eq!(
            methods,
            vec![SelectionMethod::Intrinsic, SelectionMethod::MutualInformation]
        );
    }

    #[test]
    fn target_length_mismatch_is_dataset_error() {
        let (ds, records, _) = fixture();
        let result =
            selector(FeatureConfig::default()).score(&ds, &records, &HashMap::new(), Some(&[1.0][..]));
        assert!(matches!(result, Err(FeatureError::Dataset(_))));
    }

    #[test]
    fn sparse_target_skips_supervised_methods() {
        let (ds, records, _) = fixture();
        let mut target = vec![f64::NAN; ds.len()];
        target[0] = 1.0;
        let table = selector(FeatureConfig::default())
            .score(&ds, &records, &HashMap::new(), Some(target.as_slice()))
            .unwrap();
        assert!(table.scores(SelectionMethod::Lasso).is_none());
    }

    // ============================================
    // Aggregation Tests
    // ============================================

    #[test]
    fn normalize_by_max_scales_to_unit() {
        assert_eq!(normalize_by_max(&[1.0, 2.0, 4.0]), vec![0.25, 0.5, 1.0]);
        assert_eq!(normalize_by_max(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn normalize_by_rank_spreads_evenly() {
        assert_eq!(normalize_by_rank(&[3.0, 1.0, 2.0]), vec![1.0, 0.0, 0.5]);
    }

    #[test]
    fn aggregate_is_weighted_mean() {
        let mut config = FeatureConfig::default();
        config.selection.method_weights = MethodWeights {
            intrinsic: 1.0,
            mutual_information: 3.0,
            lasso: 0.0,
            tree_ensemble: 0.0,
        };
        let table = ScoreTable {
            features: vec!["a".to_string(), "b".to_string()],
            methods: vec![
                (SelectionMethod::Intrinsic, ScoreOutcome::Applied(vec![1.0, 0.5])),
                (
                    SelectionMethod::MutualInformation,
                    ScoreOutcome::Applied(vec![0.0, 2.0]),
                ),
                (SelectionMethod::Lasso, ScoreOutcome::Applied(vec![9.0, 0.0])),
            ],
        };

        let aggregate = selector(config).aggregate(&table);
        assert!((aggregate[0] - 0.25).abs() < 1e-12);
        assert!((aggregate[1] - (0.5 + 3.0) / 4.0).abs() < 1e-12);
    }

    // ============================================
    // Selection Tests
    // ============================================

    #[test]
    fn select_prunes_correlated_and_constant_columns() {
        let (ds, records, target) = fixture();
        let result = selector(FeatureConfig::default())
            .select(&ds, &records, &HashMap::new(), Some(target.as_slice()))
            .unwrap();

        assert!(result.kept.contains(&"tech_signal".to_string()));
        assert!(!result.kept.contains(&"stat_echo".to_string()));
        assert!(matches!(
            result.score("stat_echo").unwrap().drop_reason,
            Some(DropReason::Correlated { ref with, .. }) if with == "tech_signal"
        ));
        assert_eq!(
            result.score("stat_flat").unwrap().drop_reason,
            Some(DropReason::NoVariance)
        );
    }

    #[test]
    fn kept_pairs_respect_correlation_threshold() {
        let (ds, records, target) = fixture();
        let config = FeatureConfig {
            correlation_threshold: 0.5,
            ..FeatureConfig::default()
        };
        let result = selector(config)
            .select(&ds, &records, &HashMap::new(), Some(target.as_slice()))
            .unwrap();

        for a in &result.kept {
            for b in &result.kept {
                if a != b {
                    let r = pearson_correlation(ds.column(a).unwrap(), ds.column(b).unwrap());
                    assert!(r.abs() <= 0.5);
                }
            }
        }
    }

    #[test]
    fn budget_and_floor_are_enforced() {
        let (ds, records, target) = fixture();
        let config = FeatureConfig {
            max_features: 1,
            ..FeatureConfig::default()
        };
        let result = selector(config)
            .select(&ds, &records, &HashMap::new(), Some(target.as_slice()))
            .unwrap();
        assert_eq!(result.kept.len(), 1);
        assert!(matches!(
            result.score("ctf_other").unwrap().drop_reason,
            Some(DropReason::OverBudget { .. })
        ));

        let config = FeatureConfig {
            min_importance: 1.0,
            ..FeatureConfig::default()
        };
        let result = selector(config)
            .select(&ds, &records, &HashMap::new(), None)
            .unwrap();
        assert!(result.kept.len() <= 1);
    }

    #[test]
    fn kept_order_is_by_descending_aggregate() {
        let (ds, records, target) = fixture();
        let result = selector(FeatureConfig::default())
            .select(&ds, &records, &HashMap::new(), Some(target.as_slice()))
            .unwrap();

        let aggregates: Vec<f64> = result
            .kept
            .iter()
            .map(|n| result.score(n).unwrap().aggregate)
            .collect();
        assert!(aggregates.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn ties_resolve_by_declaration_order() {
        let n = 50;
        let mut ds = base_dataset(n);
        let a: Vec<f64> = (0..n).map(|i| (i as f64 * 0.7).sin()).collect();
        let b: Vec<f64> = (0..n).map(|i| (i as f64 * 0.7).sin() * 3.0).collect();
        ds.add_column(Column::new("stat_b", b)).unwrap();
        ds.add_column(Column::new("stat_a", a)).unwrap();
        let records = vec![
            FeatureRecord::new("stat_b", FeatureCategory::Statistical),
            FeatureRecord::new("stat_a", FeatureCategory::Statistical),
        ];

        let result = selector(FeatureConfig::default())
            .select(&ds, &records, &HashMap::new(), None)
            .unwrap();
        assert_eq!(result.kept, vec!["stat_b".to_string()]);
    }

    #[test]
    fn selection_is_deterministic() {
        let (ds, records, target) = fixture();
        let sel = selector(FeatureConfig::default());
        let a = sel.select(&ds, &records, &HashMap::new(), Some(target.as_slice())).unwrap();
        let b = sel.select(&ds, &records, &HashMap::new(), Some(target.as_slice())).unwrap();
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn unsupervised_selection_respects_budget() {
        let (ds, records, _) = fixture();
        let result = selector(FeatureConfig::default())
            .select_unsupervised(&ds, &records, &HashMap::new(), 1)
            .unwrap();

        assert_eq!(result.kept.len(), 1);
        assert_eq!(result.max_features, 1);
        assert!(result
            .methods
            .iter()
            .all(|m| !m.method.requires_target()));
    }

    #[test]
    fn without_target_only_target_free_methods_apply() {
        let (ds, records, _) = fixture();
        let table = selector(FeatureConfig::default())
            .score(&ds, &records, &HashMap::new(), None)
            .unwrap();

        assert_eq!(table.methods.len(), SelectionMethod::SCORING.len());
        for (method, outcome) in &table.methods {
            match outcome {
                ScoreOutcome::Skipped(reason) => {
                    assert!(method.requires_target(), "{method} was skipped");
                    assert_eq!(reason, TARGET_REQUIRED);
                }
                ScoreOutcome::Applied(_) => {
                    assert!(!method.requires_target(), "{method} ran without a target");
                }
            }
        }
    }

    #[test]
    fn unknown_feature_is_dataset_error() {
        let (ds, _, _) = fixture();
        let records = vec![FeatureRecord::new("tech_missing", FeatureCategory::Technical)];
        let result = selector(FeatureConfig::default()).select(&ds, &records, &HashMap::new(), None);
        assert!(matches!(result, Err(FeatureError::Dataset(_))));
    }
}
