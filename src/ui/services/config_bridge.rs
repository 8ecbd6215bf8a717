use crate::config::input::parse_at_least;
use crate::config::traits::ConfigSection;
use crate::config::{parse_numeric, EvolutionConfig};
use crate::error::EvolverError;
use crate::ui::state::AppState;

pub struct ConfigBridge;

impl ConfigBridge {
    /// Convert the settings fields of AppState to an EvolutionConfig.
    ///
    /// Fields not shown in the UI are taken from `base`. Any malformed field
    /// yields `InvalidNumericInput` and the caller keeps its current config.
    pub fn to_evolution_config(state: &AppState, base: &EvolutionConfig) -> Result<EvolutionConfig, EvolverError> {
        let config = EvolutionConfig {
            population_size: parse_numeric("population size", &state.population_size_text)?,
            steps: parse_numeric("steps", &state.steps_text)?,
            guidance_scale: parse_at_least("guidance scale", &state.guidance_text, 1.0)?,
            refine_steps: parse_numeric("refine steps", &state.refine_steps_text)?,
            ..base.clone()
        };
        config.validate()?;
        Ok(config)
    }
}
