pub mod traits;
pub mod evolution;
pub mod mutation;
pub mod synthesis;
pub mod persistence;
pub mod input;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use evolution::EvolutionConfig;
pub use mutation::MutationConfig;
pub use synthesis::{SynthesisConfig, SynthesisMode};
pub use persistence::PersistenceConfig;
pub use input::parse_numeric;
