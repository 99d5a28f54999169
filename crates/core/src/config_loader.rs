use std::path::Path;

use crate::config::FeatureConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};

/// Environment variable prefix for overrides, e.g. `FEATURES_MAX_FEATURES=50`.
pub const ENV_PREFIX: &str = "FEATURES_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the pipeline configuration by merging defaults, TOML,
    /// environment variables, and JSON, then validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or if any
    /// parameter fails validation.
    pub fn load() -> Result<FeatureConfig> {
        let config: FeatureConfig = Self::base()
            .merge(Toml::file("config/Features.toml"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .join(Json::file("config/Features.json"))
            .extract()?;

        config.ensure_valid()?;
        Ok(config)
    }

    /// Loads the pipeline configuration with a specific profile.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or if any
    /// parameter fails validation.
    pub fn load_with_profile(profile: &str) -> Result<FeatureConfig> {
        let config: FeatureConfig = Self::base()
            .merge(Toml::file("config/Features.toml"))
            .merge(Toml::file(format!("config/Features.{profile}.toml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .join(Json::file("config/Features.json"))
            .extract()?;

        config.ensure_valid()?;
        Ok(config)
    }

    /// Loads the pipeline configuration from an explicit TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or if any parameter
    /// fails validation.
    pub fn load_from(path: impl AsRef<Path>) -> Result<FeatureConfig> {
        let path = path.as_ref();
        let config: FeatureConfig = Self::base()
            .merge(Toml::file(path))
            .extract()
            .with_context(|| format!("failed to parse {}", path.display()))?;

        config.ensure_valid()?;
        tracing::debug!(path = %path.display(), "feature config loaded");
        Ok(config)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(FeatureConfig::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_from_merges_over_defaults() {
        let file = write_toml(
            r#"
            enable_temporal = false
            max_features = 40
            memory_limit = 512.0

            [cross_timeframe]
            pairs = [{ short = 3, long = 12 }]

            [selection]
            aggregation = "rank_mean"
            seed = 7
            "#,
        );

        let config = ConfigLoader::load_from(file.path()).unwrap();

        assert!(!config.enable_temporal);
        assert!(config.enable_technical);
        assert_eq!(config.max_features, 40);
        assert_eq!(config.memory_limit, Some(512.0));
        assert_eq!(config.cross_timeframe.pairs.len(), 1);
        assert_eq!(config.selection.seed, 7);
        assert_eq!(
            config.selection.aggregation,
            crate::config::AggregationMethod::RankMean
        );
    }

    #[test]
    fn load_from_rejects_invalid_values() {
        let file = write_toml(
            r#"
            [cross_timeframe]
            pairs = [{ short = 50, long = 20 }]
            "#,
        );

        let err = ConfigLoader::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("strictly greater than short"));
    }
}
