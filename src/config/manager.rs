use super::{
    evolution::EvolutionConfig,
    mutation::MutationConfig,
    persistence::PersistenceConfig,
    synthesis::SynthesisConfig,
    traits::{ConfigManifest, ConfigSection},
};
use crate::error::EvolverError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix for environment overrides, e.g. `SDEVOLVE_EVOLUTION__POPULATION_SIZE=16`.
pub const ENV_PREFIX: &str = "SDEVOLVE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub mutation: MutationConfig,
    pub synthesis: SynthesisConfig,
    pub persistence: PersistenceConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), EvolverError> {
        self.evolution.validate()?;
        self.mutation.validate()?;
        self.synthesis.validate()?;
        self.persistence.validate()?;
        Ok(())
    }

    /// Field descriptions of every section.
    pub fn manifests(&self) -> Vec<ConfigManifest> {
        vec![
            self.evolution.to_manifest(),
            self.mutation.to_manifest(),
            self.synthesis.to_manifest(),
            self.persistence.to_manifest(),
        ]
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EvolverError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EvolverError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| EvolverError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.write()? = config;
        Ok(())
    }

    /// Defaults, then the optional TOML file, then `SDEVOLVE_*` environment variables.
    pub fn load_layered(&self, path: Option<&Path>) -> Result<(), EvolverError> {
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&AppConfig::default())
                .map_err(|e| EvolverError::Configuration(format!("Failed to seed defaults: {}", e)))?,
        );

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| EvolverError::Configuration(format!("Failed to load config: {}", e)))?;

        config.validate()?;

        *self.write()? = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EvolverError> {
        let config = self.get();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| EvolverError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| EvolverError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Applies `f` to a copy and stores it only if the result validates.
    pub fn update<F>(&self, f: F) -> Result<(), EvolverError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut candidate = self.get();
        f(&mut candidate);
        candidate.validate()?;
        *self.write()? = candidate;
        Ok(())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, AppConfig>, EvolverError> {
        self.config
            .write()
            .map_err(|_| EvolverError::Configuration("Config lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthesisMode;

    #[test]
    fn test_toml_roundtrip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sdevolve.toml");

        let manager = ConfigManager::new();
        manager
            .update(|c| {
                c.evolution.population_size = 4;
                c.synthesis.mode = SynthesisMode::TwoPhase;
            })
            .unwrap();
        manager.save_to_file(&path).unwrap();

        let loaded = ConfigManager::new();
        loaded.load_from_file(&path).unwrap();
        assert_eq!(loaded.get(), manager.get());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[evolution]\npopulation_size = 12\n").unwrap();

        let manager = ConfigManager::new();
        manager.load_layered(Some(&path)).unwrap();

        let config = manager.get();
        assert_eq!(config.evolution.population_size, 12);
        assert_eq!(config.evolution.steps, 20);
        assert_eq!(config.synthesis.mode, SynthesisMode::SinglePhase);
    }

    #[test]
    fn test_invalid_update_is_rejected_and_not_stored() {
        let manager = ConfigManager::new();
        let result = manager.update(|c| c.evolution.guidance_scale = 0.1);
        assert!(result.is_err());
        assert_eq!(manager.get().evolution.guidance_scale, 7.5);
    }

    #[test]
    fn test_manifests_cover_every_section() {
        let manifests = AppConfig::default().manifests();
        assert_eq!(manifests.len(), 4);
        let evolution = &manifests[0];
        let population = evolution.field("population_size").unwrap();
        assert_eq!(population.default, serde_json::json!(9));
        assert_eq!(population.min, Some(1.0));
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[evolution]\nsteps = 0\n").unwrap();

        let manager = ConfigManager::new();
        assert!(manager.load_from_file(&path).is_err());
        assert_eq!(manager.get(), AppConfig::default());
    }
}
