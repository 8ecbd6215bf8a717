pub mod traits;
pub mod scheduler;
pub mod procedural;

pub use traits::{ImageSynthesizer, PipelineStage, Residency, TwoPhaseSynthesizer};
pub use scheduler::{FillReport, GenerationScheduler, Pipeline};
pub use procedural::ProceduralSynthesizer;
