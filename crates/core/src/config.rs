//! Pipeline configuration.
//!
//! [`FeatureConfig`] aggregates one section per generator family plus the
//! selection parameters. Every section validates its numeric domains and
//! reports violations instead of clamping; a non-empty violation list
//! fails the run before any generation starts.

use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::dataset::REQUIRED_COLUMNS;
use crate::error::{ConfigViolation, FeatureError};
use crate::feature::FeatureCategory;

// =============================================================================
// Master Configuration
// =============================================================================

/// Top-level configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub enable_proprietary: bool,
    pub enable_technical: bool,
    pub enable_statistical: bool,
    pub enable_temporal: bool,
    pub enable_cross_timeframe: bool,
    /// Maximum number of features kept by selection
    pub max_features: usize,
    /// Minimum aggregated score in [0, 1] a kept feature must reach
    pub min_importance: f64,
    /// Absolute correlation in [0, 1] above which one of a pair is dropped
    pub correlation_threshold: f64,
    /// Run generators on blocking worker tasks
    pub parallel_processing: bool,
    /// Soft memory ceiling in megabytes
    pub memory_limit: Option<f64>,
    pub proprietary: ProprietaryConfig,
    pub technical: TechnicalConfig,
    pub statistical: StatisticalConfig,
    pub temporal: TemporalConfig,
    pub cross_timeframe: CrossTimeframeConfig,
    pub selection: SelectionConfig,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            enable_proprietary: true,
            enable_technical: true,
            enable_statistical: true,
            enable_temporal: true,
            enable_cross_timeframe: true,
            max_features: 100,
            min_importance: 0.0,
            correlation_threshold: 0.95,
            parallel_processing: false,
            memory_limit: None,
            proprietary: ProprietaryConfig::default(),
            technical: TechnicalConfig::default(),
            statistical: StatisticalConfig::default(),
            temporal: TemporalConfig::default(),
            cross_timeframe: CrossTimeframeConfig::default(),
            selection: SelectionConfig::default(),
        }
    }
}

impl FeatureConfig {
    /// Returns whether the generator family for `category` is enabled.
    #[must_use]
    pub const fn is_enabled(&self, category: FeatureCategory) -> bool {
        match category {
            FeatureCategory::Proprietary => self.enable_proprietary,
            FeatureCategory::Technical => self.enable_technical,
            FeatureCategory::Statistical => self.enable_statistical,
            FeatureCategory::Temporal => self.enable_temporal,
            FeatureCategory::CrossTimeframe => self.enable_cross_timeframe,
        }
    }

    /// Collects every violation of the top-level options, the selection
    /// section, and each enabled generator section.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigViolation> {
        let mut v = Vec::new();

        if self.max_features == 0 {
            v.push(ConfigViolation::new("max_features", "must be a positive integer"));
        }
        check_unit(&mut v, "min_importance", self.min_importance);
        check_unit(&mut v, "correlation_threshold", self.correlation_threshold);
        if let Some(limit) = self.memory_limit {
            if !limit.is_finite() || limit <= 0.0 {
                v.push(ConfigViolation::new(
                    "memory_limit",
                    format!("must be a positive number of megabytes, got {limit}"),
                ));
            }
        }

        v.extend(self.selection.validate());

        if self.enable_proprietary {
            v.extend(self.proprietary.validate());
        }
        if self.enable_technical {
            v.extend(self.technical.validate());
        }
        if self.enable_statistical {
            v.extend(self.statistical.validate());
        }
        if self.enable_temporal {
            v.extend(self.temporal.validate());
        }
        if self.enable_cross_timeframe {
            v.extend(self.cross_timeframe.validate());
        }

        v
    }

    /// Fails with `FeatureError::Configuration` if any violation exists.
    ///
    /// # Errors
    /// Returns every violation found by [`FeatureConfig::validate`].
    pub fn ensure_valid(&self) -> Result<(), FeatureError> {
        let violations = self.validate();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(FeatureError::Configuration { violations })
        }
    }
}

// =============================================================================
// Proprietary Signals
// =============================================================================

/// Parameters of one high/low-direction signal instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighLowParams {
    /// Bars used for the rolling high/low channel
    pub lookback: usize,
    /// Bars used to smooth the pressure reading
    pub smoothing: usize,
    /// Multiplier applied to the range when projecting extrema
    pub projection: f64,
}

/// Parameters of one dual-wave trend signal instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualWaveParams {
    pub fast: usize,
    pub slow: usize,
    /// Name of the [`CombinationRule`] merging the two waves
    pub rule: String,
}

/// How the fast and slow waves are merged into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombinationRule {
    Average,
    Sum,
    Difference,
    Product,
    Max,
    Min,
}

impl CombinationRule {
    /// Lower-case name used in configuration and column names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Sum => "sum",
            Self::Difference => "difference",
            Self::Product => "product",
            Self::Max => "max",
            Self::Min => "min",
        }
    }

    /// Combines a fast and slow reading.
    #[must_use]
    pub fn apply(self, fast: f64, slow: f64) -> f64 {
        match self {
            Self::Average => (fast + slow) / 2.0,
            Self::Sum => fast + slow,
            Self::Difference => fast - slow,
            Self::Product => fast * slow,
            Self::Max => fast.max(slow),
            Self::Min => fast.min(slow),
        }
    }
}

impl FromStr for CombinationRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "average" => Ok(Self::Average),
            "sum" => Ok(Self::Sum),
            "difference" => Ok(Self::Difference),
            "product" => Ok(Self::Product),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            other => Err(format!(
                "unknown combination rule '{other}' (expected average, sum, difference, product, max, or min)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProprietaryConfig {
    pub high_low_sets: Vec<HighLowParams>,
    pub dual_wave_sets: Vec<DualWaveParams>,
    /// Windows of the moving averages each base signal is compared against
    pub ma_windows: Vec<usize>,
    /// Emit cross products between high/low and dual-wave signals
    pub interactions: bool,
}

impl Default for ProprietaryConfig {
    fn default() -> Self {
        Self {
            high_low_sets: vec![
                HighLowParams {
                    lookback: 14,
                    smoothing: 3,
                    projection: 1.0,
                },
                HighLowParams {
                    lookback: 28,
                    smoothing: 5,
                    projection: 1.0,
                },
            ],
            dual_wave_sets: vec![
                DualWaveParams {
                    fast: 8,
                    slow: 21,
                    rule: "average".to_string(),
                },
                DualWaveParams {
                    fast: 13,
                    slow: 34,
                    rule: "difference".to_string(),
                },
            ],
            ma_windows: vec![5, 20],
            interactions: true,
        }
    }
}

impl ProprietaryConfig {
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigViolation> {
        let mut v = Vec::new();

        if self.high_low_sets.is_empty() && self.dual_wave_sets.is_empty() {
            v.push(ConfigViolation::new(
                "proprietary",
                "at least one high/low or dual-wave parameter set is required",
            ));
        }

        for (i, p) in self.high_low_sets.iter().enumerate() {
            let field = format!("proprietary.high_low_sets[{i}]");
            check_min(&mut v, &format!("{field}.lookback"), p.lookback, 2);
            check_min(&mut v, &format!("{field}.smoothing"), p.smoothing, 1);
            if !p.projection.is_finite() || p.projection <= 0.0 {
                v.push(ConfigViolation::new(
                    format!("{field}.projection"),
                    format!("must be a positive finite number, got {}", p.projection),
                ));
            }
        }

        for (i, p) in self.dual_wave_sets.iter().enumerate() {
            let field = format!("proprietary.dual_wave_sets[{i}]");
            check_min(&mut v, &format!("{field}.fast"), p.fast, 1);
            if p.slow <= p.fast {
                v.push(ConfigViolation::new(
                    format!("{field}.slow"),
                    format!("slow ({}) must be greater than fast ({})", p.slow, p.fast),
                ));
            }
            if let Err(e) = p.rule.parse::<CombinationRule>() {
                v.push(ConfigViolation::new(format!("{field}.rule"), e));
            }
        }

        for (i, w) in self.ma_windows.iter().enumerate() {
            check_min(&mut v, &format!("proprietary.ma_windows[{i}]"), *w, 2);
        }
        check_unique(&mut v, "proprietary.ma_windows", &self.ma_windows);

        v
    }
}

// =============================================================================
// Technical Indicators
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalConfig {
    /// OHLCV columns the indicator battery runs over
    pub price_fields: Vec<String>,
    pub windows: Vec<usize>,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub stoch_d_period: usize,
    pub stoch_overbought: f64,
    pub stoch_oversold: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    /// Standard deviations between the band and its moving average
    pub band_std_multiplier: f64,
}

impl Default for TechnicalConfig {
    fn default() -> Self {
        Self {
            price_fields: vec!["close".to_string()],
            windows: vec![5, 10, 20, 50],
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            stoch_d_period: 3,
            stoch_overbought: 80.0,
            stoch_oversold: 20.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            band_std_multiplier: 2.0,
        }
    }
}

impl TechnicalConfig {
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigViolation> {
        let mut v = Vec::new();

        check_columns(&mut v, "technical.price_fields", &self.price_fields);
        check_windows(&mut v, "technical.windows", &self.windows);

        check_percent(&mut v, "technical.rsi_overbought", self.rsi_overbought);
        check_percent(&mut v, "technical.rsi_oversold", self.rsi_oversold);
        if self.rsi_oversold >= self.rsi_overbought {
            v.push(ConfigViolation::new(
                "technical.rsi_oversold",
                "must be below rsi_overbought",
            ));
        }

        check_min(&mut v, "technical.stoch_d_period", self.stoch_d_period, 1);
        check_percent(&mut v, "technical.stoch_overbought", self.stoch_overbought);
        check_percent(&mut v, "technical.stoch_oversold", self.stoch_oversold);
        if self.stoch_oversold >= self.stoch_overbought {
            v.push(ConfigViolation::new(
                "technical.stoch_oversold",
                "must be below stoch_overbought",
            ));
        }

        check_min(&mut v, "technical.macd_fast", self.macd_fast, 1);
        check_min(&mut v, "technical.macd_signal", self.macd_signal, 1);
        if self.macd_slow <= self.macd_fast {
            v.push(ConfigViolation::new(
                "technical.macd_slow",
                format!(
                    "macd_slow ({}) must be greater than macd_fast ({})",
                    self.macd_slow, self.macd_fast
                ),
            ));
        }

        if !self.band_std_multiplier.is_finite() || self.band_std_multiplier <= 0.0 {
            v.push(ConfigViolation::new(
                "technical.band_std_multiplier",
                "must be a positive finite number",
            ));
        }

        v
    }
}

// =============================================================================
// Rolling Statistics
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticalConfig {
    pub windows: Vec<usize>,
    /// OHLCV columns the statistics are computed over
    pub columns: Vec<String>,
    pub zscore_threshold: f64,
    pub iqr_multiplier: f64,
}

impl Default for StatisticalConfig {
    fn default() -> Self {
        Self {
            windows: vec![5, 10, 20, 50],
            columns: vec!["close".to_string(), "volume".to_string()],
            zscore_threshold: 2.0,
            iqr_multiplier: 1.5,
        }
    }
}

impl StatisticalConfig {
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigViolation> {
        let mut v = Vec::new();
        check_windows(&mut v, "statistical.windows", &self.windows);
        check_columns(&mut v, "statistical.columns", &self.columns);
        check_positive(&mut v, "statistical.zscore_threshold", self.zscore_threshold);
        check_positive(&mut v, "statistical.iqr_multiplier", self.iqr_multiplier);
        v
    }
}

// =============================================================================
// Calendar / Sessions
// =============================================================================

/// A named trading session, half-open `[start, end)` in the reference
/// timezone. `end` before `start` wraps past midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub name: String,
    /// `HH:MM`
    pub start: String,
    /// `HH:MM`
    pub end: String,
}

impl SessionConfig {
    #[must_use]
    pub fn new(name: &str, start: &str, end: &str) -> Self {
        Self {
            name: name.to_string(),
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    /// Parses the session bounds.
    ///
    /// # Errors
    /// Returns a message if either bound is not `HH:MM`.
    pub fn bounds(&self) -> Result<(NaiveTime, NaiveTime), String> {
        let parse = |s: &str| {
            NaiveTime::parse_from_str(s.trim(), "%H:%M")
                .map_err(|e| format!("'{s}' is not a valid HH:MM time: {e}"))
        };
        Ok((parse(&self.start)?, parse(&self.end)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// IANA timezone all calendar features are computed in
    pub timezone: String,
    pub sessions: Vec<SessionConfig>,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            sessions: vec![
                SessionConfig::new("sydney", "22:00", "07:00"),
                SessionConfig::new("tokyo", "00:00", "09:00"),
                SessionConfig::new("london", "08:00", "17:00"),
                SessionConfig::new("new_york", "13:00", "22:00"),
            ],
        }
    }
}

impl TemporalConfig {
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigViolation> {
        let mut v = Vec::new();

        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            v.push(ConfigViolation::new(
                "temporal.timezone",
                format!("unknown timezone '{}'", self.timezone),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for (i, s) in self.sessions.iter().enumerate() {
            let field = format!("temporal.sessions[{i}]");
            let valid_name = !s.name.is_empty()
                && s
                    .name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
            if !valid_name {
                v.push(ConfigViolation::new(
                    format!("{field}.name"),
                    format!("'{}' must be non-empty lower-case [a-z0-9_]", s.name),
                ));
            }
            if !seen.insert(s.name.as_str()) {
                v.push(ConfigViolation::new(
                    format!("{field}.name"),
                    format!("duplicate session name '{}'", s.name),
                ));
            }
            match s.bounds() {
                Ok((start, end)) if start == end => {
                    v.push(ConfigViolation::new(field, "start and end must differ"));
                }
                Ok(_) => {}
                Err(e) => v.push(ConfigViolation::new(field, e)),
            }
        }

        v
    }
}

// =============================================================================
// Cross-Timeframe
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeframePair {
    pub short: usize,
    pub long: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossTimeframeConfig {
    pub pairs: Vec<TimeframePair>,
    pub columns: Vec<String>,
}

impl Default for CrossTimeframeConfig {
    fn default() -> Self {
        Self {
            pairs: vec![
                TimeframePair { short: 5, long: 20 },
                TimeframePair { short: 10, long: 50 },
            ],
            columns: vec!["close".to_string(), "volume".to_string()],
        }
    }
}

impl CrossTimeframeConfig {
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigViolation> {
        let mut v = Vec::new();

        if self.pairs.is_empty() {
            v.push(ConfigViolation::new(
                "cross_timeframe.pairs",
                "at least one short/long pair is required",
            ));
        }
        for (i, p) in self.pairs.iter().enumerate() {
            let field = format!("cross_timeframe.pairs[{i}]");
            check_min(&mut v, &format!("{field}.short"), p.short, 1);
            if p.long <= p.short {
                v.push(ConfigViolation::new(
                    field,
                    format!(
                        "long window ({}) must be strictly greater than short window ({})",
                        p.long, p.short
                    ),
                ));
            }
        }
        check_unique(&mut v, "cross_timeframe.pairs", &self.pairs);
        check_columns(&mut v, "cross_timeframe.columns", &self.columns);

        v
    }
}

// =============================================================================
// Selection
// =============================================================================

/// How per-method scores are combined into one ranking score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    /// Each method divided by its maximum, then weighted mean
    NormalizedMean,
    /// Each method converted to a [0, 1] rank score, then weighted mean
    RankMean,
}

/// Weight of each scoring method in the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodWeights {
    pub intrinsic: f64,
    pub mutual_information: f64,
    pub lasso: f64,
    pub tree_ensemble: f64,
}

impl Default for MethodWeights {
    fn default() -> Self {
        Self {
            intrinsic: 1.0,
            mutual_information: 1.0,
            lasso: 1.0,
            tree_ensemble: 1.0,
        }
    }
}

/// Prior weight of each feature category in the intrinsic score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub proprietary: f64,
    pub technical: f64,
    pub statistical: f64,
    pub temporal: f64,
    pub cross_timeframe: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            proprietary: 1.0,
            technical: 0.9,
            statistical: 0.8,
            temporal: 0.6,
            cross_timeframe: 0.8,
        }
    }
}

impl CategoryWeights {
    #[must_use]
    pub const fn get(&self, category: FeatureCategory) -> f64 {
        match category {
            FeatureCategory::Proprietary => self.proprietary,
            FeatureCategory::Technical => self.technical,
            FeatureCategory::Statistical => self.statistical,
            FeatureCategory::Temporal => self.temporal,
            FeatureCategory::CrossTimeframe => self.cross_timeframe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub correlation_pruning: bool,
    pub intrinsic: bool,
    pub mutual_information: bool,
    pub lasso: bool,
    pub tree_ensemble: bool,
    pub aggregation: AggregationMethod,
    pub method_weights: MethodWeights,
    pub category_weights: CategoryWeights,
    /// Seed for the tree ensemble's bootstrap and feature sampling
    pub seed: u64,
    pub mi_bins: usize,
    pub lasso_alpha: f64,
    pub lasso_max_iter: usize,
    pub lasso_tolerance: f64,
    pub forest_trees: usize,
    pub forest_max_depth: usize,
    pub forest_min_samples_leaf: usize,
    pub forest_sample_fraction: f64,
    /// Memory-guard partial selections keep `max_features * factor` columns
    pub partial_selection_factor: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            correlation_pruning: true,
            intrinsic: true,
            mutual_information: true,
            lasso: true,
            tree_ensemble: true,
            aggregation: AggregationMethod::NormalizedMean,
            method_weights: MethodWeights::default(),
            category_weights: CategoryWeights::default(),
            seed: 42,
            mi_bins: 10,
            lasso_alpha: 0.01,
            lasso_max_iter: 1000,
            lasso_tolerance: 1e-6,
            forest_trees: 50,
            forest_max_depth: 4,
            forest_min_samples_leaf: 5,
            forest_sample_fraction: 0.8,
            partial_selection_factor: 2,
        }
    }
}

impl SelectionConfig {
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigViolation> {
        let mut v = Vec::new();

        let weights = [
            ("intrinsic", self.method_weights.intrinsic),
            ("mutual_information", self.method_weights.mutual_information),
            ("lasso", self.method_weights.lasso),
            ("tree_ensemble", self.method_weights.tree_ensemble),
        ];
        for (name, w) in weights {
            if !w.is_finite() || w < 0.0 {
                v.push(ConfigViolation::new(
                    format!("selection.method_weights.{name}"),
                    format!("must be a non-negative finite number, got {w}"),
                ));
            }
        }

        for category in FeatureCategory::ALL {
            check_unit(
                &mut v,
                &format!("selection.category_weights.{}", category.as_str()),
                self.category_weights.get(category),
            );
        }

        check_min(&mut v, "selection.mi_bins", self.mi_bins, 2);
        check_positive(&mut v, "selection.lasso_alpha", self.lasso_alpha);
        check_min(&mut v, "selection.lasso_max_iter", self.lasso_max_iter, 1);
        check_positive(&mut v, "selection.lasso_tolerance", self.lasso_tolerance);
        check_min(&mut v, "selection.forest_trees", self.forest_trees, 1);
        check_min(&mut v, "selection.forest_max_depth", self.forest_max_depth, 1);
        check_min(
            &mut v,
            "selection.forest_min_samples_leaf",
            self.forest_min_samples_leaf,
            1,
        );
        if !(self.forest_sample_fraction > 0.0 && self.forest_sample_fraction <= 1.0) {
            v.push(ConfigViolation::new(
                "selection.forest_sample_fraction",
                format!("must be in (0, 1], got {}", self.forest_sample_fraction),
            ));
        }
        check_min(
            &mut v,
            "selection.partial_selection_factor",
            self.partial_selection_factor,
            1,
        );

        v
    }
}

// =============================================================================
// Validation Helpers
// =============================================================================

fn check_min(v: &mut Vec<ConfigViolation>, field: &str, value: usize, min: usize) {
    if value < min {
        v.push(ConfigViolation::new(
            field,
            format!("must be >= {min}, got {value}"),
        ));
    }
}

fn check_windows(v: &mut Vec<ConfigViolation>, field: &str, windows: &[usize]) {
    if windows.is_empty() {
        v.push(ConfigViolation::new(field, "at least one window is required"));
    }
    for (i, w) in windows.iter().enumerate() {
        check_min(v, &format!("{field}[{i}]"), *w, 2);
    }
    check_unique(v, field, windows);
}

/// Flags every entry equal to an earlier one.
fn check_unique<T: PartialEq + std::fmt::Debug>(
    v: &mut Vec<ConfigViolation>,
    field: &str,
    values: &[T],
) {
    for (i, value) in values.iter().enumerate() {
        if let Some(first) = values[..i].iter().position(|earlier| earlier == value) {
            v.push(ConfigViolation::new(
                format!("{field}[{i}]"),
                format!("duplicate of {field}[{first}] ({value:?})"),
            ));
        }
    }
}

fn check_columns(v: &mut Vec<ConfigViolation>, field: &str, columns: &[String]) {
    if columns.is_empty() {
        v.push(ConfigViolation::new(field, "at least one column is required"));
    }
    for (i, c) in columns.iter().enumerate() {
        if !REQUIRED_COLUMNS.contains(&c.as_str()) {
            v.push(ConfigViolation::new(
                format!("{field}[{i}]"),
                format!("'{c}' is not one of open, high, low, close, volume"),
            ));
        }
    }
    check_unique(v, field, columns);
}

fn check_unit(v: &mut Vec<ConfigViolation>, field: &str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        v.push(ConfigViolation::new(
            field,
            format!("must be in [0, 1], got {value}"),
        ));
    }
}

fn check_percent(v: &mut Vec<ConfigViolation>, field: &str, value: f64) {
    if !(0.0..=100.0).contains(&value) {
        v.push(ConfigViolation::new(
            field,
            format!("must be in [0, 100], got {value}"),
        ));
    }
}

fn check_positive(v: &mut Vec<ConfigViolation>, field: &str, value: f64) {
    if !value.is_finite() || value <= 0.0 {
        v.push(ConfigViolation::new(
            field,
            format!("must be a positive finite number, got {value}"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(violations: &[ConfigViolation]) -> Vec<&str> {
        violations.iter().map(|v| v.field.as_str()).collect()
    }

    // ============================================
    // Master Configuration Tests
    // ============================================

    #[test]
    fn default_config_is_valid() {
        let config = FeatureConfig::default();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        assert!(config.ensure_valid().is_ok());
    }

    #[test]
    fn top_level_domains_are_enforced() {
        let config = FeatureConfig {
            max_features: 0,
            min_importance: 1.5,
            correlation_threshold: -0.1,
            memory_limit: Some(0.0),
            ..FeatureConfig::default()
        };

        let violations = config.validate();
        let f = fields(&violations);
        assert!(f.contains(&"max_features"));
        assert!(f.contains(&"min_importance"));
        assert!(f.contains(&"correlation_threshold"));
        assert!(f.contains(&"memory_limit"));
    }

    #[test]
    fn disabled_sections_are_not_validated() {
        let mut config = FeatureConfig {
            enable_cross_timeframe: false,
            ..FeatureConfig::default()
        };
        config.cross_timeframe.pairs = vec![TimeframePair { short: 50, long: 20 }];

        assert!(config.validate().is_empty());
    }

    #[test]
    fn ensure_valid_returns_configuration_error() {
        let config = FeatureConfig {
            max_features: 0,
            ..FeatureConfig::default()
        };

        assert!(matches!(
            config.ensure_valid(),
            Err(FeatureError::Configuration { .. })
        ));
    }

    #[test]
    fn config_deserializes_with_partial_keys() {
        let json = r#"{"enable_temporal": false, "max_features": 25,
                       "cross_timeframe": {"pairs": [{"short": 3, "long": 9}]}}"#;

        let config: FeatureConfig = serde_json::from_str(json).unwrap();

        assert!(!config.enable_temporal);
        assert_eq!(config.max_features, 25);
        assert_eq!(config.cross_timeframe.pairs[0], TimeframePair { short: 3, long: 9 });
        assert_eq!(config.cross_timeframe.columns, vec!["close", "volume"]);
        assert_eq!(config.selection.aggregation, AggregationMethod::NormalizedMean);
    }

    // ============================================
    // Section Tests
    // ============================================

    #[test]
    fn cross_timeframe_rejects_long_not_greater_than_short() {
        let config = CrossTimeframeConfig {
            pairs: vec![
                TimeframePair { short: 50, long: 20 },
                TimeframePair { short: 10, long: 10 },
            ],
            ..CrossTimeframeConfig::default()
        };

        let violations = config.validate();
        assert_eq!(violations.len(), 2);
        assert!(violations[0].message.contains("strictly greater than short"));
    }

    #[test]
    fn cross_timeframe_rejects_repeated_pairs_and_columns() {
        let config = CrossTimeframeConfig {
            pairs: vec![
                TimeframePair { short: 5, long: 20 },
                TimeframePair { short: 10, long: 50 },
                TimeframePair { short: 5, long: 20 },
            ],
            columns: vec!["close".to_string(), "close".to_string()],
        };

        let violations = config.validate();
        assert_eq!(
            fields(&violations),
            vec!["cross_timeframe.pairs[2]", "cross_timeframe.columns[1]"]
        );
        assert!(violations[0].message.contains("duplicate of cross_timeframe.pairs[0]"));
    }

    #[test]
    fn technical_rejects_repeated_windows_and_fields() {
        let config = TechnicalConfig {
            windows: vec![5, 10, 5],
            price_fields: vec!["close".to_string(), "open".to_string(), "close".to_string()],
            ..TechnicalConfig::default()
        };

        let violations = config.validate();
        let fields = fields(&violations);
        assert!(fields.contains(&"technical.windows[2]"));
        assert!(fields.contains(&"technical.price_fields[2]"));
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn statistical_rejects_repeated_windows_and_columns() {
        let config = StatisticalConfig {
            windows: vec![20, 20],
            columns: vec!["volume".to_string(), "volume".to_string()],
            ..StatisticalConfig::default()
        };

        let violations = config.validate();
        assert_eq!(
            fields(&violations),
            vec!["statistical.windows[1]", "statistical.columns[1]"]
        );
    }

    #[test]
    fn proprietary_rejects_repeated_ma_windows() {
        let config = ProprietaryConfig {
            ma_windows: vec![5, 20, 5],
            ..ProprietaryConfig::default()
        };

        let violations = config.validate();
        assert_eq!(fields(&violations), vec!["proprietary.ma_windows[2]"]);
        assert!(violations[0].message.contains("duplicate"));
    }

    #[test]
    fn repeated_window_is_a_configuration_error() {
        let mut config = FeatureConfig::default();
        config.technical.windows = vec![5, 5];

        match config.ensure_valid() {
            Err(FeatureError::Configuration { violations }) => {
                assert_eq!(fields(&violations), vec!["technical.windows[1]"]);
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_combination_rule_is_violation() {
        let mut config = ProprietaryConfig::default();
        config.dual_wave_sets[0].rule = "median-ish".to_string();

        let violations = config.validate();
        assert_eq!(fields(&violations), vec!["proprietary.dual_wave_sets[0].rule"]);
    }

    #[test]
    fn combination_rule_parses_case_insensitively() {
        assert_eq!("AVERAGE".parse::<CombinationRule>(), Ok(CombinationRule::Average));
        assert_eq!(" max ".parse::<CombinationRule>(), Ok(CombinationRule::Max));
        assert!((CombinationRule::Difference.apply(3.0, 1.0) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn technical_thresholds_must_be_percentages() {
        let config = TechnicalConfig {
            rsi_overbought: 120.0,
            windows: vec![0, 5],
            price_fields: vec!["vwap".to_string()],
            ..TechnicalConfig::default()
        };

        let violations = config.validate();
        let f = fields(&violations);
        assert!(f.contains(&"technical.rsi_overbought"));
        assert!(f.contains(&"technical.windows[0]"));
        assert!(f.contains(&"technical.price_fields[0]"));
    }

    #[test]
    fn statistical_requires_positive_thresholds() {
        let config = StatisticalConfig {
            zscore_threshold: 0.0,
            ..StatisticalConfig::default()
        };
        assert_eq!(
            fields(&config.validate()),
            vec!["statistical.zscore_threshold"]
        );
    }

    #[test]
    fn temporal_rejects_bad_timezone_and_sessions() {
        let config = TemporalConfig {
            timezone: "Mars/Olympus".to_string(),
            sessions: vec![
                SessionConfig::new("london", "08:00", "17:00"),
                SessionConfig::new("london", "25:00", "17:00"),
                SessionConfig::new("Bad Name", "09:00", "09:00"),
            ],
        };

        let violations = config.validate();
        assert!(violations.iter().any(|v| v.field == "temporal.timezone"));
        assert!(violations.iter().any(|v| v.message.contains("duplicate")));
        assert!(violations.iter().any(|v| v.message.contains("HH:MM")));
        assert!(violations.iter().any(|v| v.message.contains("must differ")));
        assert!(violations.iter().any(|v| v.field == "temporal.sessions[2].name"));
    }

    #[test]
    fn selection_rejects_bad_forest_fraction() {
        let config = SelectionConfig {
            forest_sample_fraction: 0.0,
            mi_bins: 1,
            ..SelectionConfig::default()
        };
        let violations = config.validate();
        let f = fields(&violations);
        assert!(f.contains(&"selection.forest_sample_fraction"));
        assert!(f.contains(&"selection.mi_bins"));
    }
}
