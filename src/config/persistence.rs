use super::traits::{ConfigSection, ConfigManifest, FieldManifest};
use crate::error::EvolverError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub output_dir: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
        }
    }
}

impl ConfigSection for PersistenceConfig {
    fn section_name() -> &'static str {
        "persistence"
    }

    fn validate(&self) -> Result<(), EvolverError> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(EvolverError::Configuration(
                "Output directory must not be empty".to_string()
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Persistence".to_string(),
            fields: vec![FieldManifest {
                name: "output_dir".to_string(),
                field_type: "path".to_string(),
                default: serde_json::json!("outputs"),
                min: None,
                max: None,
                description: "Directory that saved images are written to".to_string(),
            }],
        }
    }
}
