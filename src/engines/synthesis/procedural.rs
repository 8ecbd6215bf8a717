//! Deterministic stand-in for a diffusion backend.
//!
//! The prompt picks the palette and the seed picks the layout, so a reseed
//! changes the composition while a small step or guidance change only
//! softens or sharpens it. Good enough to drive the evolutionary loop end to
//! end without a GPU.

use super::traits::{ImageSynthesizer, PipelineStage, TwoPhaseSynthesizer};
use crate::config::SynthesisConfig;
use crate::engines::generation::Genome;
use crate::error::EvolverError;
use crate::types::{Image, Latents};
use image::imageops::{self, FilterType};
use image::{Rgb, Rgb32FImage, Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct ProceduralSynthesizer {
    width: u32,
    height: u32,
    latent_downscale: u32,
    resident: Option<PipelineStage>,
}

struct Blob {
    x: f32,
    y: f32,
    radius: f32,
    color: [f32; 3],
}

struct Scene {
    background: [f32; 3],
    blobs: Vec<Blob>,
    /// Edge falloff exponent; more steps give crisper shapes.
    sharpness: f32,
    /// Saturation boost from guidance.
    contrast: f32,
}

impl ProceduralSynthesizer {
    pub fn new(config: &SynthesisConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            latent_downscale: config.latent_downscale.max(1),
            resident: None,
        }
    }

    pub fn resident(&self) -> Option<PipelineStage> {
        self.resident
    }

    fn scene(genome: &Genome) -> Scene {
        let mut palette_rng = StdRng::seed_from_u64(stable_hash(&[
            genome.prompt().as_bytes(),
            genome.negative_prompt().as_bytes(),
        ]));
        let mut layout_rng = StdRng::seed_from_u64(genome.seed());

        let base_hue: [f32; 3] = [palette_rng.gen(), palette_rng.gen(), palette_rng.gen()];
        let background = base_hue.map(|c| c * 0.35);

        let count = layout_rng.gen_range(3..=7);
        let blobs = (0..count)
            .map(|_| {
                let tint: [f32; 3] = [palette_rng.gen(), palette_rng.gen(), palette_rng.gen()];
                Blob {
                    x: layout_rng.gen(),
                    y: layout_rng.gen(),
                    radius: layout_rng.gen_range(0.08..0.35),
                    color: [0, 1, 2].map(|i| 0.6 * base_hue[i] + 0.4 * tint[i]),
                }
            })
            .collect();

        Scene {
            background,
            blobs,
            sharpness: 1.0 + genome.num_inference_steps().min(200) as f32 / 10.0,
            contrast: (genome.guidance_scale() as f32 / 7.5).clamp(0.25, 3.0),
        }
    }

    fn shade(scene: &Scene, u: f32, v: f32) -> [f32; 3] {
        let mut color = scene.background;
        for blob in &scene.blobs {
            let dx = u - blob.x;
            let dy = v - blob.y;
            let d = (dx * dx + dy * dy).sqrt() / blob.radius;
            let weight = (-d.powf(scene.sharpness)).exp();
            for c in 0..3 {
                color[c] = color[c] * (1.0 - weight) + blob.color[c] * weight;
            }
        }
        let mean = (color[0] + color[1] + color[2]) / 3.0;
        color.map(|c| (mean + (c - mean) * scene.contrast).clamp(0.0, 1.0))
    }

    fn render(scene: &Scene, width: u32, height: u32) -> Rgb32FImage {
        Rgb32FImage::from_fn(width, height, |x, y| {
            let u = (x as f32 + 0.5) / width as f32;
            let v = (y as f32 + 0.5) / height as f32;
            Rgb(Self::shade(scene, u, v))
        })
    }

    fn quantize(field: &Rgb32FImage) -> Image {
        RgbaImage::from_fn(field.width(), field.height(), |x, y| {
            let Rgb([r, g, b]) = *field.get_pixel(x, y);
            Rgba([to_u8(r), to_u8(g), to_u8(b), 255])
        })
        .into()
    }

    fn require(&self, stage: PipelineStage) -> Result<(), EvolverError> {
        if self.resident == Some(stage) {
            Ok(())
        } else {
            Err(EvolverError::Residency(format!("{} model is not loaded", stage)))
        }
    }
}

impl ImageSynthesizer for ProceduralSynthesizer {
    fn synthesize(&mut self, genome: &Genome) -> Result<Image, EvolverError> {
        let scene = Self::scene(genome);
        Ok(Self::quantize(&Self::render(&scene, self.width, self.height)))
    }
}

impl TwoPhaseSynthesizer for ProceduralSynthesizer {
    fn load(&mut self, stage: PipelineStage) -> Result<(), EvolverError> {
        match self.resident {
            Some(current) if current != stage => Err(EvolverError::Residency(format!(
                "cannot load {} while {} is resident",
                stage, current
            ))),
            _ => {
                self.resident = Some(stage);
                Ok(())
            }
        }
    }

    fn unload(&mut self, stage: PipelineStage) {
        if self.resident == Some(stage) {
            self.resident = None;
        }
    }

    fn synthesize_latents(&mut self, genome: &Genome) -> Result<Latents, EvolverError> {
        self.require(PipelineStage::Base)?;
        let lw = (self.width / self.latent_downscale).max(1);
        let lh = (self.height / self.latent_downscale).max(1);
        Ok(Self::render(&Self::scene(genome), lw, lh).into())
    }

    fn refine(&mut self, genome: &Genome, latents: &Latents) -> Result<Image, EvolverError> {
        self.require(PipelineStage::Refiner)?;

        let refine_steps = genome.refine_steps().unwrap_or(1);
        // More refinement, less grain.
        let grain = 0.12 / (1.0 + refine_steps as f32 / 4.0);
        let mut noise = StdRng::seed_from_u64(stable_hash(&[
            &genome.seed().to_le_bytes(),
            &refine_steps.to_le_bytes(),
        ]));

        let upscaled = imageops::resize(latents.as_buffer(), self.width, self.height, FilterType::Triangle);
        let image = RgbaImage::from_fn(self.width, self.height, |x, y| {
            let jitter = noise.gen_range(-grain..=grain);
            let Rgb([r, g, b]) = *upscaled.get_pixel(x, y);
            Rgba([to_u8(r + jitter), to_u8(g + jitter), to_u8(b + jitter), 255])
        });
        Ok(image.into())
    }
}

fn to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// 64-bit FNV-1a over `parts`, with a separator byte between parts.
///
/// Fixed across toolchains, so a saved descriptor re-renders to the same image.
fn stable_hash(parts: &[&[u8]]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hash = (hash ^ 0xff).wrapping_mul(PRIME);
        }
        for &byte in part.iter() {
            hash = (hash ^ u64::from(byte)).wrapping_mul(PRIME);
        }
    }
    hash
}
