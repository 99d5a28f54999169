//! Generator registry.
//!
//! An explicit, ordered list of feature generators. Registration order is
//! the order generators run in and the order their columns are merged, so
//! it is part of the pipeline's deterministic output.

use std::collections::HashMap;
use std::sync::Arc;

use algo_features_core::{
    ConfigViolation, FeatureConfig, FeatureError, FeatureGenerator, FeatureRecord,
};

use crate::generator::{
    CrossTimeframeGenerator, ProprietaryGenerator, StatisticalGenerator, TechnicalGenerator,
    TemporalGenerator,
};

/// Ordered collection of feature generators.
///
/// Generators are held behind `Arc` so the orchestrator can hand them to
/// blocking worker tasks without cloning their configuration.
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: Vec<Arc<dyn FeatureGenerator>>,
}

impl GeneratorRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the generators enabled in `config` in fixed order:
    /// proprietary, technical, statistical, temporal, cross-timeframe.
    #[must_use]
    pub fn from_config(config: &FeatureConfig) -> Self {
        let mut generators: Vec<Arc<dyn FeatureGenerator>> = Vec::with_capacity(5);
        if config.enable_proprietary {
            generators.push(Arc::new(ProprietaryGenerator::new(config.proprietary.clone())));
        }
        if config.enable_technical {
            generators.push(Arc::new(TechnicalGenerator::new(config.technical.clone())));
        }
        if config.enable_statistical {
            generators.push(Arc::new(StatisticalGenerator::new(config.statistical.clone())));
        }
        if config.enable_temporal {
            generators.push(Arc::new(TemporalGenerator::new(config.temporal.clone())));
        }
        if config.enable_cross_timeframe {
            generators.push(Arc::new(CrossTimeframeGenerator::new(
                config.cross_timeframe.clone(),
            )));
        }
        Self { generators }
    }

    /// Appends a generator.
    ///
    /// # Errors
    /// Returns `FeatureError::Configuration` if a generator with the same
    /// name is already registered.
    pub fn register(&mut self, generator: Box<dyn FeatureGenerator>) -> Result<(), FeatureError> {
        if self.contains(generator.name()) {
            return Err(FeatureError::config(
                "registry",
                format!("generator '{}' is already registered", generator.name()),
            ));
        }
        self.generators.push(Arc::from(generator));
        Ok(())
    }

    /// Returns a generator by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn FeatureGenerator> {
        self.generators
            .iter()
            .find(|g| g.name() == name)
            .map(|g| g.as_ref())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.generators.iter().any(|g| g.name() == name)
    }

    /// Generator names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.generators.iter().map(|g| g.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Iterates generators in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FeatureGenerator>> {
        self.generators.iter()
    }

    /// Collects the configuration violations of every registered generator.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigViolation> {
        self.generators
            .iter()
            .flat_map(|g| g.validate_config())
            .collect()
    }

    /// Checks that no two generators declare the same column.
    ///
    /// # Errors
    /// Returns `FeatureError::MergeConflict` naming the first colliding
    /// column and both generators.
    pub fn check_conflicts(&self) -> Result<(), FeatureError> {
        let mut owners: HashMap<String, &str> = HashMap::new();
        for generator in &self.generators {
            for column in generator.declared_feature_names() {
                if let Some(first) = owners.get(&column) {
                    return Err(FeatureError::MergeConflict {
                        column,
                        first: (*first).to_string(),
                        second: generator.name().to_string(),
                    });
                }
                owners.insert(column, generator.name());
            }
        }
        Ok(())
    }

    /// Every declared feature, in merge order, without importance.
    #[must_use]
    pub fn declared_features(&self) -> Vec<FeatureRecord> {
        self.generators
            .iter()
            .flat_map(|g| {
                let category = g.category();
                g.declared_feature_names()
                    .into_iter()
                    .map(move |name| FeatureRecord::new(name, category))
            })
            .collect()
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("generators", &self.names())
            .finish()
    }
}
