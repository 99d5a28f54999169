//! Rolling distribution statistics.

use algo_features_core::series::{
    mean, quantile_sorted, rolling, sample_std, sample_variance, sorted_copy,
};
use algo_features_core::{
    ConfigViolation, Dataset, FeatureCategory, FeatureError, FeatureFrame, FeatureGenerator,
    StatisticalConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statistic {
    Mean,
    Median,
    GeoMean,
    Std,
    Var,
    Range,
    Iqr,
    Skew,
    Kurt,
    ZscoreOutlier,
    IqrOutlier,
}

impl Statistic {
    /// Declared order within each column/window block.
    const ALL: [Self; 11] = [
        Self::Mean,
        Self::Median,
        Self::GeoMean,
        Self::Std,
        Self::Var,
        Self::Range,
        Self::Iqr,
        Self::Skew,
        Self::Kurt,
        Self::ZscoreOutlier,
        Self::IqrOutlier,
    ];

    const fn suffix(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::GeoMean => "geomean",
            Self::Std => "std",
            Self::Var => "var",
            Self::Range => "range",
            Self::Iqr => "iqr",
            Self::Skew => "skew",
            Self::Kurt => "kurt",
            Self::ZscoreOutlier => "zscore_outlier",
            Self::IqrOutlier => "iqr_outlier",
        }
    }
}

pub struct StatisticalGenerator {
    config: StatisticalConfig,
}

impl StatisticalGenerator {
    #[must_use]
    pub fn new(config: StatisticalConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &StatisticalConfig {
        &self.config
    }

    fn statistic(&self, stat: Statistic, window: &[f64]) -> f64 {
        match stat {
            Statistic::Mean => mean(window),
            Statistic::Median => quantile_sorted(&sorted_copy(window), 0.5),
            Statistic::GeoMean => geometric_mean(window),
            Statistic::Std => sample_std(window),
            Statistic::Var => sample_variance(window),
            Statistic::Range => {
                let sorted = sorted_copy(window);
                sorted[sorted.len() - 1] - sorted[0]
            }
            Statistic::Iqr => {
                let sorted = sorted_copy(window);
                quantile_sorted(&sorted, 0.75) - quantile_sorted(&sorted, 0.25)
            }
            Statistic::Skew => skewness(window),
            Statistic::Kurt => excess_kurtosis(window),
            Statistic::ZscoreOutlier => {
                let last = window[window.len() - 1];
                let sd = sample_std(window);
                if sd.is_nan() {
                    f64::NAN
                } else if sd == 0.0 {
                    // flat window: nothing deviates
                    0.0
                } else {
                    indicator(((last - mean(window)) / sd).abs() > self.config.zscore_threshold)
                }
            }
            Statistic::IqrOutlier => {
                let last = window[window.len() - 1];
                let sorted = sorted_copy(window);
                let q1 = quantile_sorted(&sorted, 0.25);
                let q3 = quantile_sorted(&sorted, 0.75);
                let fence = self.config.iqr_multiplier * (q3 - q1);
                indicator(last < q1 - fence || last > q3 + fence)
            }
        }
    }
}

impl Default for StatisticalGenerator {
    fn default() -> Self {
        Self::new(StatisticalConfig::default())
    }
}

fn indicator(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// Missing unless every value is strictly positive.
fn geometric_mean(values: &[f64]) -> f64 {
    if values.iter().any(|v| *v <= 0.0) {
        return f64::NAN;
    }
    (values.iter().map(|v| v.ln()).sum::<f64>() / values.len() as f64).exp()
}

/// Central moments `(m2, m3, m4)` with an `n` denominator.
fn central_moments(values: &[f64]) -> (f64, f64, f64) {
    let n = values.len() as f64;
    let m = mean(values);
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

/// Adjusted Fisher-Pearson skewness.
fn skewness(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 3 {
        return f64::NAN;
    }
    let (m2, m3, _) = central_moments(values);
    if m2 <= f64::EPSILON * mean(values).abs().max(1.0) {
        return f64::NAN;
    }
    let g1 = m3 / m2.powf(1.5);
    g1 * (n * (n - 1.0)).sqrt() / (n - 2.0)
}

/// Unbiased excess kurtosis.
fn excess_kurtosis(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 4 {
        return f64::NAN;
    }
    let (m2, _, m4) = central_moments(values);
    if m2 <= f64::EPSILON * mean(values).abs().max(1.0) {
        return f64::NAN;
    }
    let g2 = m4 / (m2 * m2) - 3.0;
    ((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0))
}

impl FeatureGenerator for StatisticalGenerator {
    fn name(&self) -> &str {
        "statistical"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Statistical
    }

    fn declared_feature_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for column in &self.config.columns {
            for w in &self.config.windows {
                for stat in Statistic::ALL {
                    names.push(format!("stat_{column}_w{w}_{}", stat.suffix()));
                }
            }
        }
        names
    }

    fn validate_config(&self) -> Vec<ConfigViolation> {
        self.config.validate()
    }

    fn min_rows(&self) -> usize {
        self.config.windows.iter().copied().min().unwrap_or(2)
    }

    fn generate(&self, dataset: &Dataset) -> Result<FeatureFrame, FeatureError> {
        let mut frame = FeatureFrame::with_capacity(
            self.config.columns.len() * self.config.windows.len() * Statistic::ALL.len(),
        );

        for column in &self.config.columns {
            let values = dataset.require(column)?;
            for &w in &self.config.windows {
                for stat in Statistic::ALL {
                    frame.push(
                        format!("stat_{column}_w{w}_{}", stat.suffix()),
                        rolling(values, w, |window| self.statistic(stat, window)),
                    );
                }
            }
        }

        Ok(frame)
    }
}
