//! Target-free importance: category prior times generator hint times
//! coverage.

use algo_features_core::{CategoryWeights, Column, FeatureCategory};

use super::stats::has_variance;

/// Intrinsic score of one column.
///
/// Zero for a column without variance; otherwise
/// `category_weight * hint * coverage`, where coverage is the fraction of
/// present rows.
#[must_use]
pub fn intrinsic_score(
    column: &Column,
    category: FeatureCategory,
    hint: f64,
    weights: &CategoryWeights,
) -> f64 {
    if !has_variance(&column.values) {
        return 0.0;
    }
    weights.get(category) * hint.clamp(0.0, 1.0) * column.coverage()
}
