//! End-to-end tests for the feature pipeline.
//!
//! These tests drive `FeatureOrchestrator` over synthetic OHLCV data and
//! check the pipeline-level guarantees:
//! - generation only adds columns and never alters the input
//! - repeated and parallel runs are bitwise identical
//! - selection honors the correlation threshold, budget, and floor
//! - missing targets and short datasets degrade instead of failing
//! - the memory guard prunes between generator stages

use std::collections::HashSet;
use std::io::Write;

use algo_features::{
    pearson_correlation, Bar, Dataset, FeatureCategory, FeatureConfig, FeatureError,
    FeatureOrchestrator, PipelineOutput, SelectionMethod,
};
use algo_features_core::{CrossTimeframeConfig, TimeframePair};
use chrono::{Duration, TimeZone, Utc};

// =============================================================================
// Helper Functions
// =============================================================================

/// Hourly bars with a drift, two cycles, and a volume rhythm.
fn bars(n: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let t = i as f64;
            let close = 250.0 + 0.03 * t + 4.0 * (t / 9.0).sin() + 1.2 * (t / 2.5).cos();
            let open = close - 0.6 * (t / 4.0).sin();
            Bar {
                timestamp: Some(start + Duration::hours(i as i64)),
                open,
                high: close.max(open) + 1.0 + 0.4 * (t / 3.0).sin().abs(),
                low: close.min(open) - 1.0 - 0.4 * (t / 5.0).cos().abs(),
                close,
                volume: 5_000.0 + 900.0 * (t / 13.0).sin() + 25.0 * (i % 5) as f64,
            }
        })
        .collect()
}

fn dataset(n: usize) -> Dataset {
    Dataset::from_bars(&bars(n)).unwrap()
}

/// One-step forward return of close, missing on the last row.
fn target(dataset: &Dataset) -> Vec<f64> {
    dataset.forward_returns("close", 1).unwrap()
}

/// Technical and statistical generators with a small forest.
fn compact_config() -> FeatureConfig {
    let mut config = FeatureConfig {
        enable_proprietary: false,
        enable_temporal: false,
        enable_cross_timeframe: false,
        max_features: 25,
        ..FeatureConfig::default()
    };
    config.selection.forest_trees = 15;
    config
}

fn bits(values: &[f64]) -> Vec<u64> {
    values.iter().map(|v| v.to_bits()).collect()
}

fn assert_same_columns(a: &Dataset, b: &Dataset) {
    assert_eq!(a.column_names(), b.column_names());
    for (x, y) in a.columns().iter().zip(b.columns()) {
        assert_eq!(bits(&x.values), bits(&y.values), "column {} differs", x.name);
    }
}

fn assert_same_selection(a: &PipelineOutput, b: &PipelineOutput) {
    assert_eq!(a.selection.kept, b.selection.kept);
    for (x, y) in a.selection.scores.iter().zip(&b.selection.scores) {
        assert_eq!(x.name, y.name);
        assert_eq!(x.aggregate.to_bits(), y.aggregate.to_bits(), "score of {}", x.name);
    }
}

// =============================================================================
// Generation
// =============================================================================

#[tokio::test]
async fn generation_only_adds_columns() {
    let orchestrator = FeatureOrchestrator::new(FeatureConfig::default()).unwrap();
    let input = dataset(200);

    let output = orchestrator.generate(input.clone()).await.unwrap();

    assert_eq!(output.dataset.len(), input.len());
    assert_eq!(output.dataset.width(), input.width() + output.features.len());
    for column in input.columns() {
        let after = output.dataset.column(&column.name).unwrap();
        assert_eq!(bits(after), bits(&column.values));
    }

    let declared: Vec<String> = orchestrator
        .declared_features()
        .into_iter()
        .map(|r| r.name)
        .collect();
    let generated: Vec<String> = output.features.iter().map(|r| r.name.clone()).collect();
    assert_eq!(generated, declared);
    for record in &output.features {
        assert!(record.name.starts_with(record.category.prefix()));
    }
}

#[tokio::test]
async fn every_category_is_generated_with_default_config() {
    let orchestrator = FeatureOrchestrator::new(FeatureConfig::default()).unwrap();

    let output = orchestrator.generate(dataset(200)).await.unwrap();

    for category in FeatureCategory::ALL {
        assert!(
            output.summary.generated_by_category.get(&category).copied().unwrap_or(0) > 0,
            "no columns for {category}"
        );
    }
    assert!(output.summary.skipped.is_empty());
}

#[tokio::test]
async fn parallel_matches_sequential() {
    let sequential = FeatureOrchestrator::new(FeatureConfig::default()).unwrap();
    let parallel = FeatureOrchestrator::new(FeatureConfig {
        parallel_processing: true,
        ..FeatureConfig::default()
    })
    .unwrap();

    let a = sequential.generate(dataset(180)).await.unwrap();
    let b = parallel.generate(dataset(180)).await.unwrap();

    assert_same_columns(&a.dataset, &b.dataset);
    assert_eq!(a.features, b.features);
    assert!(b.summary.parallel);
}

#[tokio::test]
async fn insufficient_data_only_skips_affected_generator() {
    let base = FeatureConfig {
        enable_proprietary: false,
        enable_statistical: false,
        enable_temporal: false,
        ..FeatureConfig::default()
    };
    let with_long_pairs = FeatureConfig {
        cross_timeframe: CrossTimeframeConfig {
            pairs: vec![TimeframePair { short: 40, long: 80 }],
            ..CrossTimeframeConfig::default()
        },
        ..base.clone()
    };
    let technical_only = FeatureConfig {
        enable_cross_timeframe: false,
        ..base
    };

    let skipped = FeatureOrchestrator::new(with_long_pairs)
        .unwrap()
        .generate(dataset(35))
        .await
        .unwrap();
    let reference = FeatureOrchestrator::new(technical_only)
        .unwrap()
        .generate(dataset(35))
        .await
        .unwrap();

    assert_eq!(skipped.summary.skipped.len(), 1);
    assert_eq!(skipped.summary.skipped[0].name, "cross_timeframe");
    assert!(skipped.features.iter().all(|r| !r.name.starts_with("ctf_")));
    assert_same_columns(&skipped.dataset, &reference.dataset);
}

// =============================================================================
// Selection
// =============================================================================

#[tokio::test]
async fn repeated_runs_are_bitwise_identical() {
    let orchestrator = FeatureOrchestrator::new(compact_config()).unwrap();
    let input = dataset(300);
    let y = target(&input);

    let a = orchestrator.run(input.clone(), Some(&y)).await.unwrap();
    let b = orchestrator.run(input, Some(&y)).await.unwrap();

    assert_same_selection(&a, &b);
    assert_same_columns(&a.reduced, &b.reduced);
}

#[tokio::test]
async fn parallel_run_selects_like_sequential() {
    let input = dataset(300);
    let y = target(&input);
    let sequential = FeatureOrchestrator::new(compact_config()).unwrap();
    let parallel = FeatureOrchestrator::new(FeatureConfig {
        parallel_processing: true,
        ..compact_config()
    })
    .unwrap();

    let a = sequential.run(input.clone(), Some(&y)).await.unwrap();
    let b = parallel.run(input, Some(&y)).await.unwrap();

    assert_same_selection(&a, &b);
}

#[tokio::test]
async fn kept_features_respect_correlation_threshold() {
    let config = FeatureConfig {
        correlation_threshold: 0.8,
        ..compact_config()
    };
    let orchestrator = FeatureOrchestrator::new(config).unwrap();
    let input = dataset(300);
    let y = target(&input);

    let output = orchestrator.run(input, Some(&y)).await.unwrap();
    let kept = &output.selection.kept;

    assert!(!kept.is_empty());
    for (i, a) in kept.iter().enumerate() {
        for b in &kept[i + 1..] {
            let r = pearson_correlation(
                output.reduced.column(a).unwrap(),
                output.reduced.column(b).unwrap(),
            );
            assert!(r.abs() <= 0.8, "{a} and {b} correlate at {r}");
        }
    }
}

#[tokio::test]
async fn budget_and_floor_are_respected() {
    let config = FeatureConfig {
        max_features: 12,
        min_importance: 0.2,
        ..compact_config()
    };
    let orchestrator = FeatureOrchestrator::new(config).unwrap();
    let input = dataset(300);
    let y = target(&input);

    let output = orchestrator.run(input, Some(&y)).await.unwrap();

    assert!(output.selection.kept.len() <= 12);
    for name in &output.selection.kept {
        let score = output.selection.score(name).unwrap();
        assert!(score.kept);
        assert!(score.aggregate >= 0.2, "{name} kept at {}", score.aggregate);
    }
    let dropped: HashSet<&str> = output.selection.dropped().into_iter().collect();
    assert_eq!(
        dropped.len() + output.selection.kept.len(),
        output.features.len()
    );
}

#[tokio::test]
async fn missing_target_degrades_to_unsupervised_methods() {
    let orchestrator = FeatureOrchestrator::new(compact_config()).unwrap();

    let output = orchestrator.run(dataset(300), None).await.unwrap();

    let skipped: Vec<SelectionMethod> = output
        .selection
        .skipped_methods()
        .into_iter()
        .map(|(method, _)| method)
        .collect();
    assert!(skipped.contains(&SelectionMethod::MutualInformation));
    assert!(skipped.contains(&SelectionMethod::Lasso));
    assert!(skipped.contains(&SelectionMethod::TreeEnsemble));
    assert!(!skipped.contains(&SelectionMethod::Intrinsic));
    assert!(!output.selection.kept.is_empty());
    assert_eq!(
        output
            .summary
            .issues
            .iter()
            .filter(|i| i.contains("requires a target column"))
            .count(),
        3
    );
}

#[tokio::test]
async fn technical_and_statistical_without_target_stay_in_budget() {
    let config = FeatureConfig {
        enable_proprietary: false,
        enable_temporal: false,
        enable_cross_timeframe: false,
        max_features: 50,
        ..FeatureConfig::default()
    };
    let orchestrator = FeatureOrchestrator::new(config).unwrap();

    let output = orchestrator.run(dataset(600), None).await.unwrap();

    assert!(output.selection.kept.len() <= 50);
    assert!(output
        .selection
        .kept
        .iter()
        .all(|name| name.starts_with("tech_") || name.starts_with("stat_")));
    assert_eq!(output.reduced.width(), 5 + output.selection.kept.len());
    assert!(output.summary.to_text().contains("technical"));
}

// =============================================================================
// Configuration and Memory
// =============================================================================

#[test]
fn reversed_timeframe_pair_fails_fast() {
    let mut config = FeatureConfig::default();
    config.cross_timeframe.pairs = vec![TimeframePair { short: 50, long: 20 }];

    let err = FeatureOrchestrator::new(config).unwrap_err();

    match err {
        FeatureError::Configuration { violations } => {
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].field, "cross_timeframe.pairs[0]");
        }
        other => panic!("expected configuration error, got {other}"),
    }
}

#[test]
fn repeated_entries_are_configuration_errors() {
    let mut config = FeatureConfig::default();
    config.technical.windows = vec![5, 5];
    config.cross_timeframe.pairs = vec![
        TimeframePair { short: 5, long: 20 },
        TimeframePair { short: 5, long: 20 },
    ];

    let err = FeatureOrchestrator::new(config).unwrap_err();

    match err {
        FeatureError::Configuration { violations } => {
            let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
            assert_eq!(
                fields,
                vec!["technical.windows[1]", "cross_timeframe.pairs[1]"]
            );
        }
        other => panic!("expected configuration error, got {other}"),
    }
}

#[tokio::test]
async fn memory_guard_prunes_between_stages() {
    let config = FeatureConfig {
        max_features: 10,
        memory_limit: Some(0.25),
        ..compact_config()
    };
    let orchestrator = FeatureOrchestrator::new(config).unwrap();
    let input = dataset(600);
    let y = target(&input);

    let output = orchestrator.run(input, Some(&y)).await.unwrap();
    let partials = &output.summary.partial_selections;

    assert_eq!(partials.len(), 2);
    assert_eq!(partials[0].after_generator, "technical");
    assert_eq!(partials[1].after_generator, "statistical");
    for partial in partials {
        assert!(partial.columns_after <= 20);
        assert!(partial.memory_mb_after < partial.memory_mb_before);
    }
    assert!(output.features.len() <= 20);
    assert!(output.selection.kept.len() <= 10);
    assert!(output.summary.peak_memory_mb > 0.25);
    assert_eq!(output.summary.memory_limit_mb, Some(0.25));
}

#[tokio::test]
async fn orchestrator_loads_from_toml() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
enable_proprietary = false
enable_temporal = false
enable_cross_timeframe = false
max_features = 8

[technical]
windows = [5, 10]
"#
    )
    .unwrap();

    let orchestrator = FeatureOrchestrator::from_file(file.path()).unwrap();
    assert_eq!(orchestrator.config().max_features, 8);
    assert_eq!(orchestrator.registry().names(), vec!["technical", "statistical"]);

    let output = orchestrator.run(dataset(120), None).await.unwrap();
    assert!(output.selection.kept.len() <= 8);
}
