//! Genome: one configuration of image-generation parameters.
//!
//! The genome is the unit of selection. Its phenotype is the image a
//! synthesizer renders from it; once rendered, that image is cached on the
//! genome and never recomputed.
//!
//! # Variants
//!
//! Two variants share one type. The base variant carries the parameters of a
//! single synthesis pass. The refinement variant additionally carries
//! `refine_steps` for a second pass and, transiently, the `base_latents`
//! produced by the first pass. `refine_steps().is_some()` tells them apart.
//!
//! # Invariants
//!
//! - `num_inference_steps >= 1`, `guidance_scale >= 1.0`, `refine_steps >= 1`.
//!   Construction and mutation clamp; they never fail.
//! - A cached image, once attached, is never replaced by a different one.

use super::identity::{GenomeId, IdentityAllocator};
use super::operators::{
    choose_mutation, perturb_count, perturb_scale, reseed, MutationKind, MIN_GUIDANCE,
    MIN_REFINE_STEPS, MIN_STEPS,
};
use crate::config::MutationConfig;
use crate::error::EvolverError;
use crate::types::{Image, Latents};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The heritable parameters of a genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeParams {
    pub prompt: String,
    pub negative_prompt: String,
    pub seed: u64,
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
    /// Present only on the refinement variant.
    pub refine_steps: Option<u32>,
}

impl GenomeParams {
    pub fn new(prompt: impl Into<String>, negative_prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: negative_prompt.into(),
            seed: 0,
            num_inference_steps: 20,
            guidance_scale: 7.5,
            refine_steps: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_steps(mut self, steps: u32) -> Self {
        self.num_inference_steps = steps;
        self
    }

    pub fn with_guidance(mut self, guidance_scale: f64) -> Self {
        self.guidance_scale = guidance_scale;
        self
    }

    pub fn with_refine_steps(mut self, refine_steps: Option<u32>) -> Self {
        self.refine_steps = refine_steps;
        self
    }

    fn clamped(mut self) -> Self {
        self.num_inference_steps = self.num_inference_steps.max(MIN_STEPS);
        self.guidance_scale = if self.guidance_scale.is_finite() {
            self.guidance_scale.max(MIN_GUIDANCE)
        } else {
            MIN_GUIDANCE
        };
        self.refine_steps = self.refine_steps.map(|r| r.max(MIN_REFINE_STEPS));
        self
    }
}

#[derive(Debug, Clone)]
pub struct Genome {
    id: GenomeId,
    parent_id: Option<GenomeId>,
    params: GenomeParams,
    cached_image: Option<Image>,
    base_latents: Option<Latents>,
}

impl Genome {
    /// Build a genome with a fresh id. Out-of-range parameters are clamped.
    pub fn create(
        ids: &mut IdentityAllocator,
        params: GenomeParams,
        parent_id: Option<GenomeId>,
    ) -> Self {
        Self {
            id: ids.allocate(),
            parent_id,
            params: params.clamped(),
            cached_image: None,
            base_latents: None,
        }
    }

    /// Build a founding genome: fresh id, no parent, then one randomization
    /// pass (reseed plus one small perturbation of every numeric parameter).
    pub fn create_randomized<R: Rng + ?Sized>(
        ids: &mut IdentityAllocator,
        params: GenomeParams,
        mutation: &MutationConfig,
        rng: &mut R,
    ) -> Self {
        let mut genome = Self::create(ids, params, None);
        genome.params.seed = reseed(rng);
        genome.perturb(mutation, rng);
        genome
    }

    /// Apply one stochastic mutation in place and report which branch ran.
    ///
    /// Only prompt-independent numeric parameters change. Any rendered image
    /// or latents are dropped since they no longer match the parameters.
    pub(crate) fn mutate<R: Rng + ?Sized>(&mut self, mutation: &MutationConfig, rng: &mut R) -> MutationKind {
        let kind = choose_mutation(mutation, rng);
        match kind {
            MutationKind::BigJump => self.params.seed = reseed(rng),
            MutationKind::Perturbation => self.perturb(mutation, rng),
        }
        self.cached_image = None;
        self.base_latents = None;
        kind
    }

    /// New genome inheriting every parameter from `self`, with
    /// `parent_id = self.id`, then mutated once. `self` is untouched.
    pub fn mutated_child<R: Rng + ?Sized>(
        &self,
        ids: &mut IdentityAllocator,
        mutation: &MutationConfig,
        rng: &mut R,
    ) -> Self {
        let mut child = Self::create(ids, self.params.clone(), Some(self.id));
        child.mutate(mutation, rng);
        child
    }

    /// Attach the rendered phenotype.
    ///
    /// Attaching the same image again is a no-op; attaching a different one
    /// is a contract violation.
    pub fn set_image(&mut self, image: Image) -> Result<(), EvolverError> {
        match &self.cached_image {
            None => {
                self.cached_image = Some(image);
                Ok(())
            }
            Some(existing) if *existing == image => Ok(()),
            Some(_) => Err(EvolverError::DoubleImageAssignment { genome_id: self.id }),
        }
    }

    /// Whether `set_image(image)` would succeed.
    pub fn accepts_image(&self, image: &Image) -> bool {
        self.cached_image.as_ref().map_or(true, |existing| existing == image)
    }

    pub(crate) fn set_base_latents(&mut self, latents: Latents) {
        self.base_latents = Some(latents);
    }

    pub(crate) fn take_base_latents(&mut self) -> Option<Latents> {
        self.base_latents.take()
    }

    /// Replace the prompts of a genome that has not been rendered yet.
    pub(crate) fn override_prompts(&mut self, prompt: &str, negative_prompt: &str) {
        debug_assert!(self.cached_image.is_none());
        if self.params.prompt != prompt {
            self.params.prompt = prompt.to_string();
        }
        if self.params.negative_prompt != negative_prompt {
            self.params.negative_prompt = negative_prompt.to_string();
        }
    }

    fn perturb<R: Rng + ?Sized>(&mut self, mutation: &MutationConfig, rng: &mut R) {
        self.params.num_inference_steps =
            perturb_count(self.params.num_inference_steps, mutation.max_step_delta, MIN_STEPS, rng);
        self.params.guidance_scale =
            perturb_scale(self.params.guidance_scale, mutation.max_guidance_delta, MIN_GUIDANCE, rng);
        if let Some(refine) = self.params.refine_steps {
            self.params.refine_steps =
                Some(perturb_count(refine, mutation.max_refine_delta, MIN_REFINE_STEPS, rng));
        }
    }

    pub fn id(&self) -> GenomeId {
        self.id
    }

    pub fn parent_id(&self) -> Option<GenomeId> {
        self.parent_id
    }

    pub fn params(&self) -> &GenomeParams {
        &self.params
    }

    pub fn prompt(&self) -> &str {
        &self.params.prompt
    }

    pub fn negative_prompt(&self) -> &str {
        &self.params.negative_prompt
    }

    pub fn seed(&self) -> u64 {
        self.params.seed
    }

    pub fn num_inference_steps(&self) -> u32 {
        self.params.num_inference_steps
    }

    pub fn guidance_scale(&self) -> f64 {
        self.params.guidance_scale
    }

    pub fn refine_steps(&self) -> Option<u32> {
        self.params.refine_steps
    }

    pub fn is_refinement(&self) -> bool {
        self.params.refine_steps.is_some()
    }

    pub fn image(&self) -> Option<&Image> {
        self.cached_image.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.cached_image.is_some()
    }

    pub fn base_latents(&self) -> Option<&Latents> {
        self.base_latents.as_ref()
    }

    /// Complete, serializable parameter record including lineage.
    pub fn descriptor(&self, generation: usize) -> GenomeDescriptor {
        GenomeDescriptor {
            id: self.id,
            parent_id: self.parent_id,
            prompt: self.params.prompt.clone(),
            negative_prompt: self.params.negative_prompt.clone(),
            seed: self.params.seed,
            num_inference_steps: self.params.num_inference_steps,
            guidance_scale: self.params.guidance_scale,
            refine_steps: self.params.refine_steps,
            generation,
        }
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Genome(id={}", self.id)?;
        if let Some(parent) = self.parent_id {
            write!(f, ",parent={}", parent)?;
        }
        write!(
            f,
            ",prompt=\"{}\",seed={},steps={},guidance={:.2}",
            self.params.prompt, self.params.seed, self.params.num_inference_steps, self.params.guidance_scale
        )?;
        if let Some(refine) = self.params.refine_steps {
            write!(f, ",refine={}", refine)?;
        }
        write!(f, ")")
    }
}

/// What gets embedded next to a saved image so the genome can be rebuilt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeDescriptor {
    pub id: GenomeId,
    pub parent_id: Option<GenomeId>,
    pub prompt: String,
    pub negative_prompt: String,
    pub seed: u64,
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refine_steps: Option<u32>,
    pub generation: usize,
}

impl GenomeDescriptor {
    pub fn params(&self) -> GenomeParams {
        GenomeParams {
            prompt: self.prompt.clone(),
            negative_prompt: self.negative_prompt.clone(),
            seed: self.seed,
            num_inference_steps: self.num_inference_steps,
            guidance_scale: self.guidance_scale,
            refine_steps: self.refine_steps,
        }
    }
}
