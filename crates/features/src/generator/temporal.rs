//! Calendar, session, and cyclical time encodings.
//!
//! Timestamps are converted to the configured reference timezone before
//! any field is extracted, so session windows and day boundaries follow
//! local wall-clock time (including daylight-saving shifts).

use std::f64::consts::TAU;

use algo_features_core::{
    ConfigViolation, Dataset, FeatureCategory, FeatureError, FeatureFrame, FeatureGenerator,
    TemporalConfig,
};
use chrono::{DateTime, Datelike, NaiveTime, Timelike};
use chrono_tz::Tz;

const CALENDAR: [&str; 9] = [
    "time_hour",
    "time_minute",
    "time_of_day",
    "time_day_of_week",
    "time_day_of_month",
    "time_month",
    "time_quarter",
    "time_is_weekend",
    "time_is_month_end",
];

const CYCLICAL: [&str; 6] = [
    "time_hour_sin",
    "time_hour_cos",
    "time_dow_sin",
    "time_dow_cos",
    "time_month_sin",
    "time_month_cos",
];

pub struct TemporalGenerator {
    config: TemporalConfig,
}

/// A session resolved to local wall-clock bounds.
struct Session {
    start: NaiveTime,
    end: NaiveTime,
}

impl Session {
    /// Half-open `[start, end)`; an end before the start wraps midnight.
    fn contains(&self, t: NaiveTime) -> bool {
        if self.start < self.end {
            t >= self.start && t < self.end
        } else {
            t >= self.start || t < self.end
        }
    }
}

impl TemporalGenerator {
    #[must_use]
    pub fn new(config: TemporalConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &TemporalConfig {
        &self.config
    }

    fn timezone(&self) -> Result<Tz, FeatureError> {
        self.config.timezone.parse::<Tz>().map_err(|_| {
            FeatureError::config(
                "temporal.timezone",
                format!("unknown timezone '{}'", self.config.timezone),
            )
        })
    }

    fn sessions(&self) -> Result<Vec<Session>, FeatureError> {
        self.config
            .sessions
            .iter()
            .enumerate()
            .map(|(i, s)| {
                s.bounds()
                    .map(|(start, end)| Session { start, end })
                    .map_err(|e| FeatureError::config(format!("temporal.sessions[{i}]"), e))
            })
            .collect()
    }

    /// Every value for one present timestamp, in declared order.
    fn row(local: &DateTime<Tz>, sessions: &[Session]) -> Vec<f64> {
        let hour = f64::from(local.hour());
        let dow = f64::from(local.weekday().num_days_from_monday());
        let month = local.month();
        let seconds = f64::from(local.num_seconds_from_midnight());
        let is_month_end = local
            .date_naive()
            .succ_opt()
            .map_or(true, |next| next.month() != month);

        let mut row = Vec::with_capacity(CALENDAR.len() + sessions.len() + CYCLICAL.len());
        row.extend([
            hour,
            f64::from(local.minute()),
            seconds / 86_400.0,
            dow,
            f64::from(local.day()),
            f64::from(month),
            f64::from((month - 1) / 3 + 1),
            flag(dow >= 5.0),
            flag(is_month_end),
        ]);

        let time = local.time();
        row.extend(sessions.iter().map(|s| flag(s.contains(time))));

        let hour_angle = TAU * hour / 24.0;
        let dow_angle = TAU * dow / 7.0;
        let month_angle = TAU * f64::from(month - 1) / 12.0;
        row.extend([
            hour_angle.sin(),
            hour_angle.cos(),
            dow_angle.sin(),
            dow_angle.cos(),
            month_angle.sin(),
            month_angle.cos(),
        ]);

        row
    }
}

impl Default for TemporalGenerator {
    fn default() -> Self {
        Self::new(TemporalConfig::default())
    }
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

impl FeatureGenerator for TemporalGenerator {
    fn name(&self) -> &str {
        "temporal"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Temporal
    }

    fn declared_feature_names(&self) -> Vec<String> {
        CALENDAR
            .iter()
            .map(|n| (*n).to_string())
            .chain(
                self.config
                    .sessions
                    .iter()
                    .map(|s| format!("time_session_{}", s.name)),
            )
            .chain(CYCLICAL.iter().map(|n| (*n).to_string()))
            .collect()
    }

    fn validate_config(&self) -> Vec<ConfigViolation> {
        self.config.validate()
    }

    fn min_rows(&self) -> usize {
        1
    }

    fn generate(&self, dataset: &Dataset) -> Result<FeatureFrame, FeatureError> {
        let tz = self.timezone()?;
        let sessions = self.sessions()?;
        let names = self.declared_feature_names();

        let mut columns = vec![Vec::with_capacity(dataset.len()); names.len()];
        for timestamp in dataset.timestamps() {
            match timestamp {
                Some(ts) => {
                    let row = Self::row(&ts.with_timezone(&tz), &sessions);
                    for (column, value) in columns.iter_mut().zip(row) {
                        column.push(value);
                    }
                }
                None => {
                    for column in &mut columns {
                        column.push(f64::NAN);
                    }
                }
            }
        }

        let mut frame = FeatureFrame::with_capacity(names.len());
        for (name, values) in names.into_iter().zip(columns) {
            frame.push(name, values);
        }
        Ok(frame)
    }
}
