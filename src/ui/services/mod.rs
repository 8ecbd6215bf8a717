pub mod config_bridge;
pub mod evolution_runner;

pub use config_bridge::ConfigBridge;
pub use evolution_runner::{EvolutionRunner, PopulationView, RunnerCommand, RunnerUpdate, TileView};
