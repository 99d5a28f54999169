//! Proprietary high/low pressure and dual-wave signal families.
//!
//! Each high/low parameter set measures where the close sits inside the
//! recent high/low range and projects a high/low target from it. Each
//! dual-wave set combines a fast and a slow EMA oscillator into one wave.
//! Every numeric base signal is expanded with derivative features, and
//! optional interaction features cross the two families.
//!
//! # Column layout
//!
//! For high/low set `i` and dual-wave set `j` (rule `r`):
//!
//! ```text
//! prop_hl{i}_{range|pressure|pressure_vec|pred_high|pred_low}[+derivatives]
//! prop_dw{j}_{r}_{wave|momentum|volatility}[+derivatives]
//! prop_dw{j}_{r}_position
//! prop_x{i}_{j}_{pressure_wave|range_vol}
//! ```
//!
//! Derivatives of a signal `x` are `x_d1`, `x_d2`, `x_roc`, and
//! `x_ma{w}_ratio` for every configured moving-average window.

use std::collections::HashMap;

use algo_features_core::series::{
    diff, ema, pct_change, ratio, rolling_max, rolling_min, rolling_std, sma, zip_with,
};
use algo_features_core::{
    is_missing, CombinationRule, ConfigViolation, Dataset, DualWaveParams, FeatureCategory,
    FeatureError, FeatureFrame, FeatureGenerator, HighLowParams, ProprietaryConfig,
};

const BASE_HINT: f64 = 1.0;
const DERIVATIVE_HINT: f64 = 0.8;
const INTERACTION_HINT: f64 = 0.9;

const HIGH_LOW_SIGNALS: [&str; 5] = [
    "range",
    "pressure",
    "pressure_vec",
    "pred_high",
    "pred_low",
];
const WAVE_SIGNALS: [&str; 3] = ["wave", "momentum", "volatility"];

/// Intermediate high/low series reused by interactions.
struct HighLowSeries {
    range: Vec<f64>,
    pressure: Vec<f64>,
    pressure_vec: Vec<f64>,
    pred_high: Vec<f64>,
    pred_low: Vec<f64>,
}

/// Intermediate dual-wave series reused by interactions.
struct WaveSeries {
    wave: Vec<f64>,
    momentum: Vec<f64>,
    volatility: Vec<f64>,
    position: Vec<f64>,
}

pub struct ProprietaryGenerator {
    config: ProprietaryConfig,
}

impl ProprietaryGenerator {
    #[must_use]
    pub fn new(config: ProprietaryConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ProprietaryConfig {
        &self.config
    }

    fn high_low_prefix(i: usize) -> String {
        format!("prop_hl{i}")
    }

    fn wave_prefix(j: usize, params: &DualWaveParams) -> String {
        format!("prop_dw{j}_{}", params.rule.trim().to_ascii_lowercase())
    }

    fn interaction_prefix(i: usize, j: usize) -> String {
        format!("prop_x{i}_{j}")
    }

    fn derivative_suffixes(&self) -> Vec<String> {
        let mut suffixes = vec!["d1".to_string(), "d2".to_string(), "roc".to_string()];
        suffixes.extend(self.config.ma_windows.iter().map(|w| format!("ma{w}_ratio")));
        suffixes
    }

    /// Derivative columns of `x`, aligned with [`Self::derivative_suffixes`].
    fn derivatives(&self, x: &[f64]) -> Vec<Vec<f64>> {
        let d1 = diff(x, 1);
        let d2 = diff(&d1, 1);
        let roc = pct_change(x, 1);
        let mut out = vec![d1, d2, roc];
        out.extend(self.config.ma_windows.iter().map(|&w| ratio(x, &sma(x, w))));
        out
    }

    /// Pushes `values` under `name` followed by its derivative columns.
    fn push_with_derivatives(&self, frame: &mut FeatureFrame, name: String, values: Vec<f64>) {
        let derived = self.derivatives(&values);
        let suffixes = self.derivative_suffixes();
        frame.push(name.clone(), values);
        for (suffix, column) in suffixes.iter().zip(derived) {
            frame.push(format!("{name}_{suffix}"), column);
        }
    }

    fn high_low(params: &HighLowParams, dataset: &Dataset) -> Result<HighLowSeries, FeatureError> {
        let high = dataset.require("high")?;
        let low = dataset.require("low")?;
        let close = dataset.require("close")?;
        let volume = dataset.require("volume")?;

        let hh = rolling_max(high, params.lookback);
        let ll = rolling_min(low, params.lookback);
        let range = zip_with(&hh, &ll, |h, l| h - l);

        let position_in_range = ratio(&zip_with(close, &ll, |c, l| c - l), &range);
        let pressure = sma(&position_in_range, params.smoothing);

        let relative_volume = ratio(volume, &sma(volume, params.lookback));
        let pressure_vec = zip_with(&pressure, &relative_volume, |p, v| (2.0 * p - 1.0) * v);

        let projected = zip_with(&range, &pressure, |r, p| params.projection * r * p);
        let pred_high = zip_with(close, &projected, |c, up| c + up);
        let projected_down = zip_with(&range, &pressure, |r, p| params.projection * r * (1.0 - p));
        let pred_low = zip_with(close, &projected_down, |c, down| c - down);

        Ok(HighLowSeries {
            range,
            pressure,
            pressure_vec,
            pred_high,
            pred_low,
        })
    }

    fn dual_wave(params: &DualWaveParams, dataset: &Dataset) -> Result<WaveSeries, FeatureError> {
        let rule: CombinationRule = params
            .rule
            .parse()
            .map_err(|e: String| FeatureError::config("proprietary.dual_wave_sets.rule", e))?;
        let close = dataset.require("close")?;

        let fast_osc = oscillator(close, params.fast);
        let slow_osc = oscillator(close, params.slow);
        let wave = zip_with(&fast_osc, &slow_osc, |f, s| rule.apply(f, s));
        let momentum = diff(&wave, params.fast);
        let volatility = rolling_std(&wave, params.slow);
        let position = zip_with(&wave, &momentum, |w, m| {
            if w > 0.0 && m > 0.0 {
                1.0
            } else if w < 0.0 && m < 0.0 {
                -1.0
            } else {
                0.0
            }
        });

        Ok(WaveSeries {
            wave,
            momentum,
            volatility,
            position,
        })
    }
}

impl Default for ProprietaryGenerator {
    fn default() -> Self {
        Self::new(ProprietaryConfig::default())
    }
}

/// Percentage distance of `close` from its EMA.
fn oscillator(close: &[f64], period: usize) -> Vec<f64> {
    let average = ema(close, period);
    ratio(&zip_with(close, &average, |c, e| c - e), &average)
        .into_iter()
        .map(|v| if is_missing(v) { v } else { v * 100.0 })
        .collect()
}

impl FeatureGenerator for ProprietaryGenerator {
    fn name(&self) -> &str {
        "proprietary"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Proprietary
    }

    fn declared_feature_names(&self) -> Vec<String> {
        let derivatives = self.derivative_suffixes();
        let with_derivatives = |base: String| {
            std::iter::once(base.clone())
                .chain(derivatives.iter().map(move |d| format!("{base}_{d}")))
                .collect::<Vec<_>>()
        };

        let mut names = Vec::new();
        for i in 0..self.config.high_low_sets.len() {
            let prefix = Self::high_low_prefix(i);
            for signal in HIGH_LOW_SIGNALS {
                names.extend(with_derivatives(format!("{prefix}_{signal}")));
            }
        }
        for (j, params) in self.config.dual_wave_sets.iter().enumerate() {
            let prefix = Self::wave_prefix(j, params);
            for signal in WAVE_SIGNALS {
                names.extend(with_derivatives(format!("{prefix}_{signal}")));
            }
            names.push(format!("{prefix}_position"));
        }
        if self.config.interactions {
            for i in 0..self.config.high_low_sets.len() {
                for j in 0..self.config.dual_wave_sets.len() {
                    let prefix = Self::interaction_prefix(i, j);
                    names.push(format!("{prefix}_pressure_wave"));
                    names.push(format!("{prefix}_range_vol"));
                }
            }
        }
        names
    }

    fn validate_config(&self) -> Vec<ConfigViolation> {
        self.config.validate()
    }

    fn min_rows(&self) -> usize {
        let smallest = self
            .config
            .high_low_sets
            .iter()
            .map(|p| p.lookback)
            .min()
            .or_else(|| self.config.dual_wave_sets.iter().map(|p| p.fast).min())
            .unwrap_or(2);
        smallest.max(2)
    }

    fn generate(&self, dataset: &Dataset) -> Result<FeatureFrame, FeatureError> {
        let mut frame = FeatureFrame::with_capacity(self.declared_feature_names().len());

        let high_low = self
            .config
            .high_low_sets
            .iter()
            .map(|p| Self::high_low(p, dataset))
            .collect::<Result<Vec<_>, _>>()?;
        let waves = self
            .config
            .dual_wave_sets
            .iter()
            .map(|p| Self::dual_wave(p, dataset))
            .collect::<Result<Vec<_>, _>>()?;

        for (i, series) in high_low.iter().enumerate() {
            let prefix = Self::high_low_prefix(i);
            let signals = [
                &series.range,
                &series.pressure,
                &series.pressure_vec,
                &series.pred_high,
                &series.pred_low,
            ];
            for (signal, values) in HIGH_LOW_SIGNALS.iter().zip(signals) {
                self.push_with_derivatives(&mut frame, format!("{prefix}_{signal}"), values.clone());
            }
        }

        for (j, (params, series)) in self.config.dual_wave_sets.iter().zip(&waves).enumerate() {
            let prefix = Self::wave_prefix(j, params);
            let signals = [&series.wave, &series.momentum, &series.volatility];
            for (signal, values) in WAVE_SIGNALS.iter().zip(signals) {
                self.push_with_derivatives(&mut frame, format!("{prefix}_{signal}"), values.clone());
            }
            frame.push(format!("{prefix}_position"), series.position.clone());
        }

        if self.config.interactions {
            let close = dataset.require("close")?;
            for (i, hl) in high_low.iter().enumerate() {
                let relative_range = ratio(&hl.range, close);
                for (j, wave) in waves.iter().enumerate() {
                    let prefix = Self::interaction_prefix(i, j);
                    frame.push(
                        format!("{prefix}_pressure_wave"),
                        zip_with(&hl.pressure_vec, &wave.wave, |p, w| p * w),
                    );
                    frame.push(
                        format!("{prefix}_range_vol"),
                        zip_with(&relative_range, &wave.volatility, |r, v| r * v),
                    );
                }
            }
        }

        Ok(frame)
    }

    fn importance_hints(&self) -> HashMap<String, f64> {
        let derivatives = self.derivative_suffixes();
        self.declared_feature_names()
            .into_iter()
            .map(|name| {
                let hint = if name.starts_with("prop_x") {
                    INTERACTION_HINT
                } else if derivatives.iter().any(|d| name.ends_with(&format!("_{d}"))) {
                    DERIVATIVE_HINT
                } else {
                    BASE_HINT
                };
                (name, hint)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::test_support::synthetic_dataset;

    fn single_set() -> ProprietaryGenerator {
        ProprietaryGenerator::new(ProprietaryConfig {
            high_low_sets: vec![HighLowParams {
                lookback: 10,
                smoothing: 3,
                projection: 1.0,
            }],
            dual_wave_sets: vec![DualWaveParams {
                fast: 5,
                slow: 15,
                rule: "average".to_string(),
            }],
            ma_windows: vec![5],
            interactions: true,
        })
    }

    // ============================================
    // Layout Tests
    // ============================================

    #[test]
    fn generate_matches_declared_names() {
        let gen = ProprietaryGenerator::default();
        let ds = synthetic_dataset(150);
        let frame = gen.generate(&ds).unwrap();

        frame
            .verify(gen.name(), &gen.declared_feature_names(), ds.len())
            .unwrap();
        // 2 * 5 * 6 + 2 * (3 * 6 + 1) + 2 * 2 * 2
        assert_eq!(frame.len(), 106);
        assert!(frame.names().iter().all(|n| n.starts_with("prop_")));
    }

    #[test]
    fn base_column_precedes_its_derivatives() {
        let names = single_set().declared_feature_names();
        assert_eq!(
            &names[..6],
            &[
                "prop_hl0_range",
                "prop_hl0_range_d1",
                "prop_hl0_range_d2",
                "prop_hl0_range_roc",
                "prop_hl0_range_ma5_ratio",
                "prop_hl0_pressure",
            ]
        );
        assert!(names.contains(&"prop_dw0_average_position".to_string()));
        assert!(!names.contains(&"prop_dw0_average_position_d1".to_string()));
    }

    #[test]
    fn interactions_can_be_disabled() {
        let mut gen = single_set();
        gen.config.interactions = false;
        assert!(gen
            .declared_feature_names()
            .iter()
            .all(|n| !n.starts_with("prop_x")));
    }

    #[test]
    fn hints_by_signal_kind() {
        let hints = single_set().importance_hints();
        assert_eq!(hints["prop_hl0_pressure"], BASE_HINT);
        assert_eq!(hints["prop_hl0_pressure_d1"], DERIVATIVE_HINT);
        assert_eq!(hints["prop_x0_0_range_vol"], INTERACTION_HINT);
    }

    #[test]
    fn min_rows_uses_smallest_lookback() {
        assert_eq!(single_set().min_rows(), 10);
        let waves_only = ProprietaryGenerator::new(ProprietaryConfig {
            high_low_sets: Vec::new(),
            ..single_set().config
        });
        assert_eq!(waves_only.min_rows(), 5);
    }

    // ============================================
    // Signal Tests
    // ============================================

    #[test]
    fn pressure_stays_in_unit_interval() {
        let out = single_set().apply(&synthetic_dataset(120)).unwrap();
        let pressure = out.column("prop_hl0_pressure").unwrap();

        assert!(is_missing(pressure[8]));
        let present: Vec<f64> = pressure.iter().copied().filter(|v| !is_missing(*v)).collect();
        assert!(!present.is_empty());
        assert!(present.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn projections_bracket_close() {
        let ds = synthetic_dataset(120);
        let out = single_set().apply(&ds).unwrap();
        let close = ds.column("close").unwrap();
        let high = out.column("prop_hl0_pred_high").unwrap();
        let low = out.column("prop_hl0_pred_low").unwrap();

        for t in 20..120 {
            assert!(high[t] >= close[t]);
            assert!(low[t] <= close[t]);
        }
    }

    #[test]
    fn position_is_a_label() {
        let out = single_set().apply(&synthetic_dataset(120)).unwrap();
        let position = out.column("prop_dw0_average_position").unwrap();
        assert!(position
            .iter()
            .filter(|v| !is_missing(**v))
            .all(|v| [-1.0, 0.0, 1.0].contains(v)));
    }

    #[test]
    fn short_history_leaves_rows_missing_without_dropping() {
        let ds = synthetic_dataset(12);
        let out = single_set().apply(&ds).unwrap();

        assert_eq!(out.len(), 12);
        let volatility = out.column("prop_dw0_average_volatility").unwrap();
        assert!(volatility.iter().all(|v| is_missing(*v)));
    }
}
