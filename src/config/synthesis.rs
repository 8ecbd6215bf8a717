use super::traits::{ConfigSection, ConfigManifest, FieldManifest};
use crate::error::EvolverError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub mode: SynthesisMode,
    pub width: u32,
    pub height: u32,
    /// Latent grid is `width / latent_downscale` by `height / latent_downscale`.
    pub latent_downscale: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SynthesisMode {
    SinglePhase,
    TwoPhase,
}

impl SynthesisMode {
    pub fn is_two_phase(self) -> bool {
        matches!(self, SynthesisMode::TwoPhase)
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            mode: SynthesisMode::SinglePhase,
            width: 256,
            height: 256,
            latent_downscale: 8,
        }
    }
}

impl ConfigSection for SynthesisConfig {
    fn section_name() -> &'static str {
        "synthesis"
    }

    fn validate(&self) -> Result<(), EvolverError> {
        if self.width == 0 || self.height == 0 {
            return Err(EvolverError::Configuration(
                "Image dimensions must be positive".to_string()
            ));
        }
        if self.latent_downscale == 0
            || self.latent_downscale > self.width
            || self.latent_downscale > self.height
        {
            return Err(EvolverError::Configuration(
                "Latent downscale must be between 1 and the image size".to_string()
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Synthesis".to_string(),
            fields: vec![
                FieldManifest {
                    name: "mode".to_string(),
                    field_type: "enum".to_string(),
                    default: serde_json::json!("SinglePhase"),
                    min: None,
                    max: None,
                    description: "SinglePhase or TwoPhase (base pass + refinement)".to_string(),
                },
                FieldManifest {
                    name: "width".to_string(),
                    field_type: "integer".to_string(),
                    default: serde_json::json!(256),
                    min: Some(1.0),
                    max: Some(2048.0),
                    description: "Output width in pixels".to_string(),
                },
                FieldManifest {
                    name: "height".to_string(),
                    field_type: "integer".to_string(),
                    default: serde_json::json!(256),
                    min: Some(1.0),
                    max: Some(2048.0),
                    description: "Output height in pixels".to_string(),
                },
            ],
        }
    }
}
