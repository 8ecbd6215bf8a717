pub mod identity;
pub mod operators;
pub mod genome;
pub mod population;
pub mod history;
pub mod events;
pub mod evolution_engine;
pub mod progress;

pub use identity::{GenomeId, IdentityAllocator};
pub use genome::{Genome, GenomeDescriptor, GenomeParams};
pub use operators::MutationKind;
pub use population::Population;
pub use history::{HistoryStack, Snapshot};
pub use events::{EvolutionEvent, Selection, Transition};
pub use evolution_engine::{EngineState, EvolutionEngine, PendingGeneration};
pub use progress::{ChannelProgressCallback, ConsoleProgressCallback, ProgressCallback, ProgressMessage};
