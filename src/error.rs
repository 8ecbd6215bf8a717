use thiserror::Error;

use crate::engines::generation::GenomeId;

#[derive(Error, Debug)]
pub enum EvolverError {
    #[error("Invalid numeric input for {field}: {value:?}")]
    InvalidNumericInput { field: String, value: String },

    #[error("Nothing to undo: history is empty")]
    EmptyHistory,

    #[error("Genome {genome_id} already carries a different image")]
    DoubleImageAssignment { genome_id: GenomeId },

    #[error("Synthesis failed: {0}")]
    SynthesisFailure(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Genome {0} appears more than once in a population")]
    DuplicateGenome(GenomeId),

    #[error("No population: initialize the engine first")]
    NoPopulation,

    #[error("Residency error: {0}")]
    Residency(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing metadata: {0}")]
    MissingMetadata(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("PNG encoding error: {0}")]
    PngEncoding(#[from] png::EncodingError),

    #[error("PNG decoding error: {0}")]
    PngDecoding(#[from] png::DecodingError),
}

pub type Result<T> = std::result::Result<T, EvolverError>;
