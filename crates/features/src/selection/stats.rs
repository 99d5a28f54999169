//! Correlation and ranking helpers shared by the selection methods.

use algo_features_core::is_missing;

/// Pearson correlation over the rows where both series are present.
///
/// Returns 0.0 when fewer than three complete rows exist or either side
/// has no variance over them.
#[must_use]
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| !is_missing(**a) && !is_missing(**b))
        .map(|(a, b)| (*a, *b))
        .collect();
    if pairs.len() < 3 {
        return 0.0;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in &pairs {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator < f64::EPSILON {
        return 0.0;
    }

    (covariance / denominator).clamp(-1.0, 1.0)
}

/// Calculates 1-based ranks with ties receiving their average rank.
#[must_use]
pub fn calculate_ranks(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return vec![];
    }

    let n = values.len();
    let mut indexed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0; n];

    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && (indexed[j].1 - indexed[i].1).abs() < f64::EPSILON {
            j += 1;
        }

        // positions i..j hold ranks (i+1)..=j
        let avg_rank = (i + 1..=j).map(|r| r as f64).sum::<f64>() / (j - i) as f64;
        for entry in &indexed[i..j] {
            ranks[entry.0] = avg_rank;
        }

        i = j;
    }

    ranks
}

/// True when the series holds at least two distinct present values.
#[must_use]
pub fn has_variance(values: &[f64]) -> bool {
    let mut present = values.iter().copied().filter(|v| !is_missing(*v));
    match present.next() {
        Some(first) => present.any(|v| v != first),
        None => false,
    }
}
