pub mod png_metadata;

pub use png_metadata::{read_descriptor, read_metadata, ImageSaver, GENOME_KEYWORD};

use crate::engines::generation::GenomeDescriptor;
use crate::error::EvolverError;
use crate::types::Image;
use std::path::PathBuf;

/// Stores a chosen image together with the parameters that produced it.
pub trait Persistence {
    fn save(&mut self, image: &Image, descriptor: &GenomeDescriptor) -> Result<PathBuf, EvolverError>;
}
