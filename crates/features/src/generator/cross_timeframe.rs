//! Short- versus long-horizon comparisons of the same column.

use algo_features_core::series::{pct_change, ratio, sma, zip_with};
use algo_features_core::{
    ConfigViolation, CrossTimeframeConfig, Dataset, FeatureCategory, FeatureError, FeatureFrame,
    FeatureGenerator, TimeframePair,
};

const SUFFIXES: [&str; 10] = [
    "short_mean",
    "long_mean",
    "ratio_short",
    "ratio_long",
    "short_long_ratio",
    "diff",
    "norm_diff",
    "short_mom",
    "long_mom",
    "mom_accel",
];

pub struct CrossTimeframeGenerator {
    config: CrossTimeframeConfig,
}

impl CrossTimeframeGenerator {
    #[must_use]
    pub fn new(config: CrossTimeframeConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &CrossTimeframeConfig {
        &self.config
    }

    fn prefix(column: &str, pair: TimeframePair) -> String {
        format!("ctf_{column}_s{}_l{}", pair.short, pair.long)
    }

    fn pair_columns(values: &[f64], pair: TimeframePair) -> [Vec<f64>; 10] {
        let short_mean = sma(values, pair.short);
        let long_mean = sma(values, pair.long);
        let ratio_short = ratio(values, &short_mean);
        let ratio_long = ratio(values, &long_mean);
        let short_long_ratio = ratio(&short_mean, &long_mean);
        let diff = zip_with(&short_mean, &long_mean, |s, l| s - l);
        let norm_diff = ratio(&diff, &long_mean);
        let short_mom = pct_change(values, pair.short);
        let long_mom = pct_change(values, pair.long);
        let mom_accel = zip_with(&short_mom, &long_mom, |s, l| s - l);

        [
            short_mean,
            long_mean,
            ratio_short,
            ratio_long,
            short_long_ratio,
            diff,
            norm_diff,
            short_mom,
            long_mom,
            mom_accel,
        ]
    }
}

impl Default for CrossTimeframeGenerator {
    fn default() -> Self {
        Self::new(CrossTimeframeConfig::default())
    }
}

impl FeatureGenerator for CrossTimeframeGenerator {
    fn name(&self) -> &str {
        "cross_timeframe"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::CrossTimeframe
    }

    fn declared_feature_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for column in &self.config.columns {
            for &pair in &self.config.pairs {
                let prefix = Self::prefix(column, pair);
                names.extend(SUFFIXES.iter().map(|s| format!("{prefix}_{s}")));
            }
        }
        names
    }

    fn validate_config(&self) -> Vec<ConfigViolation> {
        self.config.validate()
    }

    fn min_rows(&self) -> usize {
        self.config
            .pairs
            .iter()
            .map(|p| p.short + 1)
            .min()
            .unwrap_or(2)
    }

    fn generate(&self, dataset: &Dataset) -> Result<FeatureFrame, FeatureError> {
        let mut frame = FeatureFrame::with_capacity(
            self.config.columns.len() * self.config.pairs.len() * SUFFIXES.len(),
        );

        for column in &self.config.columns {
            let values = dataset.require(column)?;
            for &pair in &self.config.pairs {
                let prefix = Self::prefix(column, pair);
                for (suffix, values) in SUFFIXES.iter().zip(Self::pair_columns(values, pair)) {
                    frame.push(format!("{prefix}_{suffix}"), values);
                }
            }
        }

        Ok(frame)
    }
}
