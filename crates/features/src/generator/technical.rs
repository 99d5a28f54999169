//! Classic technical indicator battery.
//!
//! Moving averages, RSI, Bollinger bands, and MACD run per configured
//! price field; stochastic oscillator and ATR run once per window over
//! high/low/close.

use std::collections::HashMap;

use algo_features_core::series::{
    diff, ema, ratio, rolling_max, rolling_min, rolling_std, safe_div, sma, wilder, zip_with,
};
use algo_features_core::{
    is_missing, ConfigViolation, Dataset, FeatureCategory, FeatureError, FeatureFrame,
    FeatureGenerator, TechnicalConfig,
};

use super::{flag, sign_cross};

/// Weight for binary threshold flags, which carry less information than
/// the indicator they are derived from.
const FLAG_HINT: f64 = 0.5;

pub struct TechnicalGenerator {
    config: TechnicalConfig,
}

impl TechnicalGenerator {
    #[must_use]
    pub fn new(config: TechnicalConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &TechnicalConfig {
        &self.config
    }

    fn field_window_names(field: &str, w: usize) -> [String; 12] {
        let p = format!("tech_{field}");
        [
            format!("{p}_sma{w}"),
            format!("{p}_ema{w}"),
            format!("{p}_sma{w}_ratio"),
            format!("{p}_sma{w}_dist"),
            format!("{p}_ema{w}_ratio"),
            format!("{p}_rsi{w}"),
            format!("{p}_rsi{w}_overbought"),
            format!("{p}_rsi{w}_oversold"),
            format!("{p}_bb{w}_upper"),
            format!("{p}_bb{w}_lower"),
            format!("{p}_bb{w}_width"),
            format!("{p}_bb{w}_pos"),
        ]
    }

    fn macd_names(field: &str) -> [String; 4] {
        let p = format!("tech_{field}_macd");
        [
            p.clone(),
            format!("{p}_signal"),
            format!("{p}_hist"),
            format!("{p}_cross"),
        ]
    }

    fn range_window_names(w: usize) -> [String; 6] {
        [
            format!("tech_stoch{w}_k"),
            format!("tech_stoch{w}_d"),
            format!("tech_stoch{w}_overbought"),
            format!("tech_stoch{w}_oversold"),
            format!("tech_atr{w}"),
            format!("tech_atr{w}_ratio"),
        ]
    }

    /// Columns for one price field over one window, in declared order.
    fn field_window_columns(&self, values: &[f64], w: usize) -> [Vec<f64>; 12] {
        let cfg = &self.config;
        let ma = sma(values, w);
        let ex = ema(values, w);
        let rsi = rsi(values, w);

        let sd = rolling_std(values, w);
        let k = cfg.band_std_multiplier;
        let upper = zip_with(&ma, &sd, |m, s| m + k * s);
        let lower = zip_with(&ma, &sd, |m, s| m - k * s);
        let band = zip_with(&upper, &lower, |u, l| u - l);

        let sma_ratio = ratio(values, &ma);
        let sma_dist = zip_with(values, &ma, |v, m| v - m);
        let ema_ratio = ratio(values, &ex);
        let overbought = flag(&rsi, |r| r > cfg.rsi_overbought);
        let oversold = flag(&rsi, |r| r < cfg.rsi_oversold);
        let width = ratio(&band, &ma);
        let pos = ratio(&zip_with(values, &lower, |v, l| v - l), &band);

        [
            ma, ex, sma_ratio, sma_dist, ema_ratio, rsi, overbought, oversold, upper, lower,
            width, pos,
        ]
    }

    fn macd_columns(&self, values: &[f64]) -> [Vec<f64>; 4] {
        let cfg = &self.config;
        let fast = ema(values, cfg.macd_fast);
        let slow = ema(values, cfg.macd_slow);
        let macd = zip_with(&fast, &slow, |f, s| f - s);
        let signal = ema(&macd, cfg.macd_signal);
        let hist = zip_with(&macd, &signal, |m, s| m - s);
        let cross = sign_cross(&hist);
        [macd, signal, hist, cross]
    }

    fn range_window_columns(
        &self,
        high: &[f64],
        low: &[f64],
        close: &[f64],
        w: usize,
    ) -> [Vec<f64>; 6] {
        let cfg = &self.config;
        let hh = rolling_max(high, w);
        let ll = rolling_min(low, w);
        let k: Vec<f64> = (0..close.len())
            .map(|t| safe_div(close[t] - ll[t], hh[t] - ll[t]) * 100.0)
            .collect();
        let d = sma(&k, cfg.stoch_d_period);
        let overbought = flag(&k, |v| v > cfg.stoch_overbought);
        let oversold = flag(&k, |v| v < cfg.stoch_oversold);

        let atr = wilder(&true_range(high, low, close), w);
        let atr_ratio = ratio(&atr, close);

        [k, d, overbought, oversold, atr, atr_ratio]
    }
}

impl Default for TechnicalGenerator {
    fn default() -> Self {
        Self::new(TechnicalConfig::default())
    }
}

/// Relative strength index with Wilder smoothing.
///
/// 100 when the average loss is zero and the average gain positive, 50 when
/// both are zero.
fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    let delta = diff(values, 1);
    let gains: Vec<f64> = delta
        .iter()
        .map(|&d| if is_missing(d) { f64::NAN } else { d.max(0.0) })
        .collect();
    let losses: Vec<f64> = delta
        .iter()
        .map(|&d| if is_missing(d) { f64::NAN } else { (-d).max(0.0) })
        .collect();

    let avg_gain = wilder(&gains, period);
    let avg_loss = wilder(&losses, period);

    zip_with(&avg_gain, &avg_loss, |g, l| {
        if l == 0.0 {
            if g == 0.0 {
                50.0
            } else {
                100.0
            }
        } else {
            100.0 - 100.0 / (1.0 + g / l)
        }
    })
}

/// True range; the first row falls back to high - low.
fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    (0..close.len())
        .map(|t| {
            let hl = high[t] - low[t];
            if t == 0 {
                return hl;
            }
            let prev = close[t - 1];
            if is_missing(prev) {
                return f64::NAN;
            }
            hl.max((high[t] - prev).abs()).max((low[t] - prev).abs())
        })
        .collect()
}

impl FeatureGenerator for TechnicalGenerator {
    fn name(&self) -> &str {
        "technical"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Technical
    }

    fn declared_feature_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for field in &self.config.price_fields {
            for &w in &self.config.windows {
                names.extend(Self::field_window_names(field, w));
            }
            names.extend(Self::macd_names(field));
        }
        for &w in &self.config.windows {
            names.extend(Self::range_window_names(w));
        }
        names
    }

    fn validate_config(&self) -> Vec<ConfigViolation> {
        self.config.validate()
    }

    fn min_rows(&self) -> usize {
        self.config.windows.iter().min().map_or(2, |w| w + 1)
    }

    fn generate(&self, dataset: &Dataset) -> Result<FeatureFrame, FeatureError> {
        let mut frame = FeatureFrame::with_capacity(self.declared_feature_names().len());

        for field in &self.config.price_fields {
            let values = dataset.require(field)?;
            for &w in &self.config.windows {
                let names = Self::field_window_names(field, w);
                let columns = self.field_window_columns(values, w);
                for (name, column) in names.into_iter().zip(columns) {
                    frame.push(name, column);
                }
            }
            for (name, column) in Self::macd_names(field)
                .into_iter()
                .zip(self.macd_columns(values))
            {
                frame.push(name, column);
            }
        }

        let high = dataset.require("high")?;
        let low = dataset.require("low")?;
        let close = dataset.require("close")?;
        for &w in &self.config.windows {
            let names = Self::range_window_names(w);
            let columns = self.range_window_columns(high, low, close, w);
            for (name, column) in names.into_iter().zip(columns) {
                frame.push(name, column);
            }
        }

        Ok(frame)
    }

    fn importance_hints(&self) -> HashMap<String, f64> {
        self.declared_feature_names()
            .into_iter()
            .filter(|n| n.ends_with("_overbought") || n.ends_with("_oversold"))
            .map(|n| (n, FLAG_HINT))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::test_support::synthetic_dataset;
    use algo_features_core::{Bar, Column};

    fn generator(windows: Vec<usize>) -> TechnicalGenerator {
        TechnicalGenerator::new(TechnicalConfig {
            windows,
            ..TechnicalConfig::default()
        })
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // ============================================
    // Layout Tests
    // ============================================

    #[test]
    fn generate_matches_declared_names() {
        let gen = TechnicalGenerator::default();
        let ds = synthetic_dataset(120);
        let frame = gen.generate(&ds).unwrap();

        frame
            .verify(gen.name(), &gen.declared_feature_names(), ds.len())
            .unwrap();
        // 4 windows * 12 + 4 macd + 4 windows * 6
        assert_eq!(frame.len(), 76);
        assert!(frame.names().iter().all(|n| n.starts_with("tech_")));
    }

    #[test]
    fn min_rows_is_smallest_window_plus_one() {
        assert_eq!(generator(vec![20, 5, 10]).min_rows(), 6);
    }

    #[test]
    fn flags_have_lower_hint() {
        let hints = TechnicalGenerator::default().importance_hints();
        assert_eq!(hints.get("tech_close_rsi5_overbought"), Some(&FLAG_HINT));
        assert!(!hints.contains_key("tech_close_rsi5"));
    }

    // ============================================
    // Indicator Tests
    // ============================================

    #[test]
    fn rsi_is_100_for_strictly_rising_series() {
        let values: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let out = rsi(&values, 5);

        assert!(is_missing(out[4]));
        assert!(approx(out[5], 100.0));
        assert!(approx(out[19], 100.0));
    }

    #[test]
    fn rsi_is_50_for_flat_series() {
        let out = rsi(&[10.0; 12], 5);
        assert!(approx(out[11], 50.0));
    }

    #[test]
    fn rsi_stays_in_bounds() {
        let ds = synthetic_dataset(200);
        let out = rsi(ds.column("close").unwrap(), 14);
        assert!(out.iter().filter(|v| !is_missing(**v)).all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn true_range_uses_previous_close() {
        let tr = true_range(&[10.0, 12.0], &[9.0, 11.0], &[9.5, 11.5]);
        assert!(approx(tr[0], 1.0));
        // max(1.0, |12 - 9.5|, |11 - 9.5|)
        assert!(approx(tr[1], 2.5));
    }

    #[test]
    fn bollinger_position_between_bands() {
        let gen = generator(vec![20]);
        let ds = synthetic_dataset(100);
        let out = gen.apply(&ds).unwrap();

        let upper = out.column("tech_close_bb20_upper").unwrap();
        let lower = out.column("tech_close_bb20_lower").unwrap();
        assert!(is_missing(upper[18]));
        for t in 19..100 {
            assert!(upper[t] >= lower[t]);
        }
    }

    #[test]
    fn zero_reference_ratio_stays_missing() {
        let bars: Vec<Bar> = (0..10)
            .map(|_| Bar {
                timestamp: None,
                open: 0.0,
                high: 0.0,
                low: 0.0,
                close: 0.0,
                volume: 0.0,
            })
            .collect();
        let mut ds = Dataset::from_bars(&bars).unwrap();
        ds.add_column(Column::new("extra", vec![1.0; 10])).unwrap();

        let out = generator(vec![3]).apply(&ds).unwrap();
        let sma_ratio = out.column("tech_close_sma3_ratio").unwrap();
        let stoch = out.column("tech_stoch3_k").unwrap();

        assert!(sma_ratio.iter().all(|v| is_missing(*v)));
        assert!(stoch.iter().all(|v| is_missing(*v)));
    }

    #[test]
    fn missing_field_is_an_error() {
        let gen = TechnicalGenerator::new(TechnicalConfig {
            price_fields: vec!["vwap".to_string()],
            ..TechnicalConfig::default()
        });
        assert!(gen.generate(&synthetic_dataset(30)).is_err());
    }
}
