//! L1-regularized linear regression by cyclic coordinate descent.
//!
//! Features and target are standardized over the supplied rows; missing
//! feature values become 0 after standardization (mean imputation).
//! Minimizes `(1 / 2n) * ||y - Xb||^2 + alpha * ||b||_1`.

use algo_features_core::is_missing;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LassoParams {
    pub alpha: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

/// Standardizes a series, imputing missing values with the mean.
///
/// Returns `None` when the series has no variance.
pub(crate) fn standardize(values: &[f64]) -> Option<Vec<f64>> {
    let present: Vec<f64> = values.iter().copied().filter(|v| !is_missing(*v)).collect();
    if present.len() < 2 {
        return None;
    }
    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let std = (present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std < f64::EPSILON {
        return None;
    }
    Some(
        values
            .iter()
            .map(|v| if is_missing(*v) { 0.0 } else { (v - mean) / std })
            .collect(),
    )
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

/// Absolute standardized coefficients, one per feature.
///
/// `features` are column-major and share the target's row set. Features
/// without variance get coefficient 0.
#[must_use]
pub fn lasso_importance(features: &[Vec<f64>], target: &[f64], params: LassoParams) -> Vec<f64> {
    let p = features.len();
    let Some(y) = standardize(target) else {
        return vec![0.0; p];
    };
    let n = y.len() as f64;

    let columns: Vec<Option<Vec<f64>>> = features.iter().map(|f| standardize(f)).collect();
    let norms: Vec<f64> = columns
        .iter()
        .map(|c| c.as_ref().map_or(0.0, |c| c.iter().map(|v| v * v).sum::<f64>() / n))
        .collect();

    let mut coef = vec![0.0; p];
    let mut residual = y;

    for _ in 0..params.max_iter {
        let mut max_delta: f64 = 0.0;

        for j in 0..p {
            let Some(x) = &columns[j] else { continue };
            if norms[j] <= 0.0 {
                continue;
            }

            let rho = x.iter().zip(&residual).map(|(a, r)| a * r).sum::<f64>() / n
                + coef[j] * norms[j];
            let updated = soft_threshold(rho, params.alpha) / norms[j];
            let delta = updated - coef[j];

            if delta != 0.0 {
                for (r, a) in residual.iter_mut().zip(x) {
                    *r -= a * delta;
                }
                coef[j] = updated;
                max_delta = max_delta.max(delta.abs());
            }
        }

        if max_delta < params.tolerance {
            break;
        }
    }

    coef.into_iter().map(f64::abs).collect()
}
