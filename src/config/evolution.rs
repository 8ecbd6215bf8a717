use super::traits::{ConfigSection, ConfigManifest, FieldManifest};
use crate::error::EvolverError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub steps: u32,
    pub guidance_scale: f64,
    /// Passed through to the refinement pass untouched; the backend decides
    /// how many effective steps this becomes.
    pub refine_steps: u32,
    /// Seed for the engine's own RNG (mutation and keeper choice).
    pub rng_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 9,
            steps: 20,
            guidance_scale: 7.5,
            refine_steps: 20,
            rng_seed: None,
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), EvolverError> {
        if self.population_size == 0 {
            return Err(EvolverError::Configuration(
                "Population size must be at least 1".to_string()
            ));
        }
        if self.steps == 0 {
            return Err(EvolverError::Configuration(
                "Inference steps must be at least 1".to_string()
            ));
        }
        if !(self.guidance_scale >= 1.0) {
            return Err(EvolverError::Configuration(
                "Guidance scale must be at least 1.0".to_string()
            ));
        }
        if self.refine_steps == 0 {
            return Err(EvolverError::Configuration(
                "Refine steps must be at least 1".to_string()
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Evolution".to_string(),
            fields: vec![
                FieldManifest {
                    name: "population_size".to_string(),
                    field_type: "integer".to_string(),
                    default: serde_json::json!(9),
                    min: Some(1.0),
                    max: Some(64.0),
                    description: "Number of images per generation".to_string(),
                },
                FieldManifest {
                    name: "steps".to_string(),
                    field_type: "integer".to_string(),
                    default: serde_json::json!(20),
                    min: Some(1.0),
                    max: None,
                    description: "Inference steps for founding genomes".to_string(),
                },
                FieldManifest {
                    name: "guidance_scale".to_string(),
                    field_type: "float".to_string(),
                    default: serde_json::json!(7.5),
                    min: Some(1.0),
                    max: None,
                    description: "Classifier-free guidance for founding genomes".to_string(),
                },
                FieldManifest {
                    name: "refine_steps".to_string(),
                    field_type: "integer".to_string(),
                    default: serde_json::json!(20),
                    min: Some(1.0),
                    max: None,
                    description: "Refinement pass steps (two-phase backends only)".to_string(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EvolutionConfig::default();
        assert_eq!(config.population_size, 9);
        assert_eq!(config.steps, 20);
        assert_eq!(config.guidance_scale, 7.5);
        assert_eq!(config.refine_steps, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_low_guidance() {
        let config = EvolutionConfig {
            guidance_scale: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_population() {
        let config = EvolutionConfig {
            population_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
