use super::traits::{ConfigSection, ConfigManifest, FieldManifest};
use crate::error::EvolverError;
use serde::{Deserialize, Serialize};

/// Bounds for the mutation operator.
///
/// A mutation is a single coin flip: with `big_jump_probability` the seed is
/// replaced, otherwise every numeric parameter gets a bounded delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    pub big_jump_probability: f64,
    pub max_step_delta: u32,
    pub max_guidance_delta: f64,
    pub max_refine_delta: u32,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            big_jump_probability: 0.5,
            max_step_delta: 5,
            max_guidance_delta: 1.0,
            max_refine_delta: 5,
        }
    }
}

impl ConfigSection for MutationConfig {
    fn section_name() -> &'static str {
        "mutation"
    }

    fn validate(&self) -> Result<(), EvolverError> {
        if !(0.0..=1.0).contains(&self.big_jump_probability) {
            return Err(EvolverError::Configuration(
                "Big jump probability must be between 0 and 1".to_string()
            ));
        }
        if !(self.max_guidance_delta >= 0.0) || !self.max_guidance_delta.is_finite() {
            return Err(EvolverError::Configuration(
                "Guidance delta must be a finite, non-negative number".to_string()
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Mutation".to_string(),
            fields: vec![
                FieldManifest {
                    name: "big_jump_probability".to_string(),
                    field_type: "float".to_string(),
                    default: serde_json::json!(0.5),
                    min: Some(0.0),
                    max: Some(1.0),
                    description: "Chance that a mutation reseeds instead of nudging".to_string(),
                },
                FieldManifest {
                    name: "max_step_delta".to_string(),
                    field_type: "integer".to_string(),
                    default: serde_json::json!(5),
                    min: Some(0.0),
                    max: None,
                    description: "Largest change to inference steps per mutation".to_string(),
                },
                FieldManifest {
                    name: "max_guidance_delta".to_string(),
                    field_type: "float".to_string(),
                    default: serde_json::json!(1.0),
                    min: Some(0.0),
                    max: None,
                    description: "Largest change to guidance scale per mutation".to_string(),
                },
                FieldManifest {
                    name: "max_refine_delta".to_string(),
                    field_type: "integer".to_string(),
                    default: serde_json::json!(5),
                    min: Some(0.0),
                    max: None,
                    description: "Largest change to refine steps per mutation".to_string(),
                },
            ],
        }
    }
}
