pub mod generator;
pub mod orchestrator;
pub mod registry;
pub mod selection;
pub mod summary;

// Re-export generators for convenience
pub use generator::{
    CrossTimeframeGenerator, ProprietaryGenerator, StatisticalGenerator, TechnicalGenerator,
    TemporalGenerator,
};

// Re-export registry
pub use registry::GeneratorRegistry;

// Re-export selection
pub use selection::{
    forest_importance, lasso_importance, mutual_information, pearson_correlation, DropReason,
    FeatureScore, FeatureSelector, ForestParams, LassoParams, MethodOutcome, MethodReport,
    ScoreOutcome, ScoreTable, SelectionMethod, SelectionResult, MIN_TARGET_ROWS, TARGET_REQUIRED,
};

// Re-export orchestration and reporting
pub use orchestrator::{FeatureOrchestrator, GenerationOutput, PipelineOutput};
pub use summary::{GeneratorRun, PartialSelection, RunSummary, SkippedGenerator};

// Re-export the core model so callers need one dependency
pub use algo_features_core::{
    Bar, Column, Dataset, FeatureCategory, FeatureConfig, FeatureError, FeatureFrame,
    FeatureGenerator, FeatureRecord,
};
