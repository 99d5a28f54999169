//! Mutual information between a feature and the target.
//!
//! Both series are discretized into equal-frequency bins from their ranks,
//! so the estimate is invariant to monotonic transforms of either side.

use algo_features_core::is_missing;

use super::stats::calculate_ranks;

/// Assigns each value an equal-frequency bin in `0..bins`. Tied values
/// share a rank and therefore a bin.
fn quantile_bins(values: &[f64], bins: usize) -> Vec<usize> {
    let n = values.len() as f64;
    calculate_ranks(values)
        .into_iter()
        .map(|rank| ((((rank - 1.0) / n) * bins as f64) as usize).min(bins - 1))
        .collect()
}

/// Mutual information in nats over the rows where both series are present.
///
/// Returns 0.0 for fewer than two complete rows.
#[must_use]
pub fn mutual_information(x: &[f64], y: &[f64], bins: usize) -> f64 {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|(a, b)| !is_missing(**a) && !is_missing(**b))
        .map(|(a, b)| (*a, *b))
        .unzip();
    if xs.len() < 2 || bins < 2 {
        return 0.0;
    }

    let bx = quantile_bins(&xs, bins);
    let by = quantile_bins(&ys, bins);

    let mut joint = vec![0usize; bins * bins];
    let mut px = vec![0usize; bins];
    let mut py = vec![0usize; bins];
    for (&i, &j) in bx.iter().zip(&by) {
        joint[i * bins + j] += 1;
        px[i] += 1;
        py[j] += 1;
    }

    let n = xs.len() as f64;
    let mut mi = 0.0;
    for i in 0..bins {
        for j in 0..bins {
            let count = joint[i * bins + j];
            if count == 0 {
                continue;
            }
            let pxy = count as f64 / n;
            let expected = (px[i] as f64 / n) * (py[j] as f64 / n);
            mi += pxy * (pxy / expected).ln();
        }
    }

    mi.max(0.0)
}
