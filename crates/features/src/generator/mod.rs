//! Feature generators.
//!
//! Each generator implements [`FeatureGenerator`] over one configuration
//! section and produces a single category of columns. Generators are
//! independent: none reads another's output.
//!
//! [`FeatureGenerator`]: algo_features_core::FeatureGenerator

mod cross_timeframe;
mod proprietary;
mod statistical;
mod technical;
mod temporal;

pub use cross_timeframe::CrossTimeframeGenerator;
pub use proprietary::ProprietaryGenerator;
pub use statistical::StatisticalGenerator;
pub use technical::TechnicalGenerator;
pub use temporal::TemporalGenerator;

use algo_features_core::is_missing;

/// Maps a series to a 1.0 / 0.0 flag, preserving missing values.
pub(crate) fn flag(values: &[f64], predicate: impl Fn(f64) -> bool) -> Vec<f64> {
    values
        .iter()
        .map(|&v| {
            if is_missing(v) {
                f64::NAN
            } else if predicate(v) {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// +1 when a series turns positive, -1 when it turns negative, 0 otherwise.
pub(crate) fn sign_cross(values: &[f64]) -> Vec<f64> {
    (0..values.len())
        .map(|t| {
            if t == 0 {
                return f64::NAN;
            }
            let (prev, cur) = (values[t - 1], values[t]);
            if is_missing(prev) || is_missing(cur) {
                f64::NAN
            } else if prev <= 0.0 && cur > 0.0 {
                1.0
            } else if prev >= 0.0 && cur < 0.0 {
                -1.0
            } else {
                0.0
            }
        })
        .collect()
}
