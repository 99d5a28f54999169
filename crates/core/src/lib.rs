//! Core types for the feature engineering pipeline: the dataset model,
//! feature metadata, configuration, error taxonomy, generator contract, and
//! the rolling-window primitives shared by every generator.

pub mod config;
pub mod config_loader;
pub mod dataset;
pub mod error;
pub mod feature;
pub mod generator;
pub mod series;

pub use config::{
    AggregationMethod, CategoryWeights, CombinationRule, CrossTimeframeConfig, DualWaveParams,
    FeatureConfig, HighLowParams, MethodWeights, ProprietaryConfig, SelectionConfig,
    SessionConfig, StatisticalConfig, TechnicalConfig, TemporalConfig, TimeframePair,
};
pub use config_loader::ConfigLoader;
pub use dataset::{is_missing, Bar, Column, Dataset, REQUIRED_COLUMNS};
pub use error::{ConfigViolation, FeatureError};
pub use feature::{FeatureCategory, FeatureRecord};
pub use generator::{FeatureFrame, FeatureGenerator};
