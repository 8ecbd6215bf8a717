pub mod generation;
pub mod session;
pub mod synthesis;

pub use session::EvolutionSession;
