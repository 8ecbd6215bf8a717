use crate::engines::generation::Genome;
use crate::error::EvolverError;
use crate::types::{Image, Latents};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Turns a genome into its image in one pass.
///
/// Must be deterministic in the genome's parameters, up to the backend's own
/// numeric tolerance.
pub trait ImageSynthesizer: Send {
    fn synthesize(&mut self, genome: &Genome) -> Result<Image, EvolverError>;
}

/// The two models of a base + refinement pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Base,
    Refiner,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Base => write!(f, "base"),
            PipelineStage::Refiner => write!(f, "refiner"),
        }
    }
}

/// Backend whose work is split into a base pass producing latents and a
/// refinement pass turning latents into the final image.
///
/// Both stages compete for one device and cannot be resident at the same
/// time. `load` must fail while the other stage is still resident.
pub trait TwoPhaseSynthesizer: Send {
    fn load(&mut self, stage: PipelineStage) -> Result<(), EvolverError>;
    fn unload(&mut self, stage: PipelineStage);
    fn synthesize_latents(&mut self, genome: &Genome) -> Result<Latents, EvolverError>;
    /// `refine_steps` is handed to the backend as is; what it means in
    /// effective steps is the backend's business.
    fn refine(&mut self, genome: &Genome, latents: &Latents) -> Result<Image, EvolverError>;
}

/// Scoped, exclusive residency of one stage. Unloads on drop.
pub struct Residency<'a, S: TwoPhaseSynthesizer + ?Sized> {
    synth: &'a mut S,
    stage: PipelineStage,
}

impl<'a, S: TwoPhaseSynthesizer + ?Sized> Residency<'a, S> {
    pub fn acquire(synth: &'a mut S, stage: PipelineStage) -> Result<Self, EvolverError> {
        synth.load(stage)?;
        log::debug!("Loaded {} model", stage);
        Ok(Self { synth, stage })
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }
}

impl<S: TwoPhaseSynthesizer + ?Sized> Deref for Residency<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.synth
    }
}

impl<S: TwoPhaseSynthesizer + ?Sized> DerefMut for Residency<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.synth
    }
}

impl<S: TwoPhaseSynthesizer + ?Sized> Drop for Residency<'_, S> {
    fn drop(&mut self) {
        self.synth.unload(self.stage);
        log::debug!("Unloaded {} model", self.stage);
    }
}
