//! Rolling-window primitives over `f64` series.
//!
//! Every function returns a series of the same length as its input. A row
//! whose window is incomplete or contains a missing value is missing
//! (`NaN`) in the output; nothing is ever filled with a default.

use crate::dataset::is_missing;

/// Divides `numerator` by `reference`, missing when the reference is zero
/// or either side is missing.
#[inline]
#[must_use]
pub fn safe_div(numerator: f64, reference: f64) -> f64 {
    if is_missing(numerator) || is_missing(reference) || reference == 0.0 {
        f64::NAN
    } else {
        numerator / reference
    }
}

/// Element-wise [`safe_div`].
#[must_use]
pub fn ratio(numerator: &[f64], reference: &[f64]) -> Vec<f64> {
    numerator
        .iter()
        .zip(reference)
        .map(|(&n, &r)| safe_div(n, r))
        .collect()
}

/// Element-wise binary operation, missing if either side is missing.
#[must_use]
pub fn zip_with(a: &[f64], b: &[f64], f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            if is_missing(x) || is_missing(y) {
                f64::NAN
            } else {
                f(x, y)
            }
        })
        .collect()
}

/// Applies `f` to every full, gap-free window ending at each row.
#[must_use]
pub fn rolling(values: &[f64], window: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 {
        return out;
    }
    for end in window..=values.len() {
        let slice = &values[end - window..end];
        if slice.iter().any(|v| is_missing(*v)) {
            continue;
        }
        out[end - 1] = f(slice);
    }
    out
}

/// Simple moving average.
#[must_use]
pub fn sma(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, mean)
}

/// Rolling sample standard deviation (n - 1 denominator).
#[must_use]
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, sample_std)
}

#[must_use]
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().copied().fold(f64::MIN, f64::max))
}

#[must_use]
pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().copied().fold(f64::MAX, f64::min))
}

/// Exponential moving average with `alpha = 2 / (period + 1)`.
///
/// Seeded with the SMA of the first complete window.
#[must_use]
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    smoothed(values, period, 2.0 / (period as f64 + 1.0))
}

/// Wilder's smoothing (`alpha = 1 / period`), used by RSI and ATR.
#[must_use]
pub fn wilder(values: &[f64], period: usize) -> Vec<f64> {
    smoothed(values, period, 1.0 / period as f64)
}

fn smoothed(values: &[f64], period: usize, alpha: f64) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }

    let mut state: Option<f64> = None;
    let mut run = 0usize;

    for (i, &v) in values.iter().enumerate() {
        match state {
            Some(prev) => {
                if is_missing(v) {
                    continue;
                }
                let next = alpha * v + (1.0 - alpha) * prev;
                state = Some(next);
                out[i] = next;
            }
            None => {
                if is_missing(v) {
                    run = 0;
                    continue;
                }
                run += 1;
                if run >= period {
                    let seed = mean(&values[i + 1 - period..=i]);
                    state = Some(seed);
                    out[i] = seed;
                }
            }
        }
    }

    out
}

/// `x[t] - x[t - lag]`.
#[must_use]
pub fn diff(values: &[f64], lag: usize) -> Vec<f64> {
    (0..values.len())
        .map(|t| {
            if t < lag || lag == 0 {
                return f64::NAN;
            }
            let (cur, prev) = (values[t], values[t - lag]);
            if is_missing(cur) || is_missing(prev) {
                f64::NAN
            } else {
                cur - prev
            }
        })
        .collect()
}

/// `x[t] / x[t - lag] - 1`, missing when the reference is zero.
#[must_use]
pub fn pct_change(values: &[f64], lag: usize) -> Vec<f64> {
    (0..values.len())
        .map(|t| {
            if t < lag || lag == 0 {
                return f64::NAN;
            }
            safe_div(values[t], values[t - lag]) - 1.0
        })
        .collect()
}

/// Arithmetic mean of a slice (missing for an empty slice).
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (missing below two points).
#[must_use]
pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Sample variance (missing below two points).
#[must_use]
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Quantile of an ascending-sorted slice with linear interpolation.
#[must_use]
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Returns an ascending-sorted copy of a gap-free slice.
#[must_use]
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}
