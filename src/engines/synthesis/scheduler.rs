use super::traits::{ImageSynthesizer, PipelineStage, Residency, TwoPhaseSynthesizer};
use crate::config::SynthesisMode;
use crate::engines::generation::{Population, ProgressCallback};
use crate::error::EvolverError;

/// The backend a scheduler drives.
pub enum Pipeline {
    SinglePhase(Box<dyn ImageSynthesizer>),
    TwoPhase(Box<dyn TwoPhaseSynthesizer>),
}

impl Pipeline {
    pub fn mode(&self) -> SynthesisMode {
        match self {
            Pipeline::SinglePhase(_) => SynthesisMode::SinglePhase,
            Pipeline::TwoPhase(_) => SynthesisMode::TwoPhase,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    pub synthesized: usize,
    pub cached: usize,
}

/// Renders every genome of a population that has no image yet.
///
/// Genomes with a cached image are never handed to the backend. In two-phase
/// mode the base pass runs for every pending genome before the refinement
/// pass runs for any of them, so each model is loaded once per generation.
pub struct GenerationScheduler {
    pipeline: Pipeline,
}

impl GenerationScheduler {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    pub fn mode(&self) -> SynthesisMode {
        self.pipeline.mode()
    }

    pub fn fill(
        &mut self,
        population: &mut Population,
        progress: &mut dyn ProgressCallback,
    ) -> Result<FillReport, EvolverError> {
        let pending: Vec<usize> = population
            .iter()
            .enumerate()
            .filter(|(_, g)| !g.has_image())
            .map(|(i, _)| i)
            .collect();

        let report = FillReport {
            synthesized: pending.len(),
            cached: population.len() - pending.len(),
        };

        for genome in population.iter().filter(|g| g.has_image()) {
            log::debug!("Use cached image for {}", genome);
        }

        if pending.is_empty() {
            return Ok(report);
        }

        match &mut self.pipeline {
            Pipeline::SinglePhase(synth) => {
                Self::fill_single(synth.as_mut(), population, &pending, progress)?
            }
            Pipeline::TwoPhase(synth) => {
                Self::fill_two_phase(synth.as_mut(), population, &pending, progress)?
            }
        }

        Ok(report)
    }

    fn fill_single(
        synth: &mut dyn ImageSynthesizer,
        population: &mut Population,
        pending: &[usize],
        progress: &mut dyn ProgressCallback,
    ) -> Result<(), EvolverError> {
        let genomes = population.genomes_mut();
        for (done, &index) in pending.iter().enumerate() {
            let genome = &mut genomes[index];
            log::info!("Generate new image for {}", genome);
            let image = synth.synthesize(genome)?;
            genome.set_image(image)?;
            progress.on_genome_rendered(genome.id(), done + 1, pending.len());
        }
        Ok(())
    }

    fn fill_two_phase(
        synth: &mut dyn TwoPhaseSynthesizer,
        population: &mut Population,
        pending: &[usize],
        progress: &mut dyn ProgressCallback,
    ) -> Result<(), EvolverError> {
        let genomes = population.genomes_mut();

        for &index in pending {
            if !genomes[index].is_refinement() {
                return Err(EvolverError::SynthesisFailure(format!(
                    "genome {} has no refine_steps but the pipeline is two-phase",
                    genomes[index].id()
                )));
            }
        }

        {
            let mut base = Residency::acquire(&mut *synth, PipelineStage::Base)?;
            for &index in pending {
                let genome = &mut genomes[index];
                log::info!("Generate base latents for {}", genome);
                let latents = base.synthesize_latents(genome)?;
                genome.set_base_latents(latents);
            }
        }

        let mut refiner = Residency::acquire(&mut *synth, PipelineStage::Refiner)?;
        for (done, &index) in pending.iter().enumerate() {
            let genome = &mut genomes[index];
            let latents = genome.take_base_latents().ok_or_else(|| {
                EvolverError::SynthesisFailure(format!("genome {} lost its base latents", genome.id()))
            })?;
            log::info!("Refine image for {}", genome);
            let image = refiner.refine(genome, &latents)?;
            genome.set_image(image)?;
            progress.on_genome_rendered(genome.id(), done + 1, pending.len());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::{Genome, GenomeId, GenomeParams, IdentityAllocator};
    use crate::types::{Image, Latents};
    use std::sync::{Arc, Mutex};

    struct SilentProgress {
        rendered: Vec<GenomeId>,
    }

    impl ProgressCallback for SilentProgress {
        fn on_generation_start(&mut self, _generation: usize, _to_render: usize) {}

        fn on_genome_rendered(&mut self, genome_id: GenomeId, _done: usize, _total: usize) {
            self.rendered.push(genome_id);
        }

        fn on_generation_complete(&mut self, _generation: usize, _rendered: usize, _cached: usize) {}
    }

    fn pixel(genome: &Genome) -> Image {
        Image::from_rgba(1, 1, vec![genome.id().get() as u8; 4]).unwrap()
    }

    struct CountingSynth {
        calls: Arc<Mutex<Vec<GenomeId>>>,
    }

    impl ImageSynthesizer for CountingSynth {
        fn synthesize(&mut self, genome: &Genome) -> Result<Image, EvolverError> {
            self.calls.lock().unwrap().push(genome.id());
            Ok(pixel(genome))
        }
    }

    struct FailingSynth;

    impl ImageSynthesizer for FailingSynth {
        fn synthesize(&mut self, _genome: &Genome) -> Result<Image, EvolverError> {
            Err(EvolverError::SynthesisFailure("out of memory".to_string()))
        }
    }

    /// Records every call and refuses to load a stage while the other is resident.
    struct RecordingTwoPhase {
        log: Arc<Mutex<Vec<String>>>,
        resident: Option<PipelineStage>,
    }

    impl TwoPhaseSynthesizer for RecordingTwoPhase {
        fn load(&mut self, stage: PipelineStage) -> Result<(), EvolverError> {
            if let Some(other) = self.resident {
                return Err(EvolverError::Residency(format!("{} still resident", other)));
            }
            self.resident = Some(stage);
            self.log.lock().unwrap().push(format!("load {}", stage));
            Ok(())
        }

        fn unload(&mut self, stage: PipelineStage) {
            self.resident = None;
            self.log.lock().unwrap().push(format!("unload {}", stage));
        }

        fn synthesize_latents(&mut self, genome: &Genome) -> Result<Latents, EvolverError> {
            assert_eq!(self.resident, Some(PipelineStage::Base));
            self.log.lock().unwrap().push(format!("latents {}", genome.id()));
            Ok(Latents::new(1, 1, vec![genome.id().get() as f32, 0.0, 0.0]).unwrap())
        }

        fn refine(&mut self, genome: &Genome, latents: &Latents) -> Result<Image, EvolverError> {
            assert_eq!(self.resident, Some(PipelineStage::Refiner));
            assert_eq!(latents.data()[0], genome.id().get() as f32);
            self.log.lock().unwrap().push(format!("refine {}", genome.id()));
            Ok(pixel(genome))
        }
    }

    fn population(size: usize, refine_steps: Option<u32>) -> Population {
        let mut ids = IdentityAllocator::new();
        let params = GenomeParams::new("cat", "").with_refine_steps(refine_steps);
        let genomes = (0..size)
            .map(|_| Genome::create(&mut ids, params.clone(), None))
            .collect();
        Population::new(genomes).unwrap()
    }

    fn progress() -> SilentProgress {
        SilentProgress { rendered: Vec::new() }
    }

    #[test]
    fn test_single_phase_renders_in_population_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = GenerationScheduler::new(Pipeline::SinglePhase(Box::new(CountingSynth {
            calls: Arc::clone(&calls),
        })));
        let mut population = population(3, None);
        let mut progress = progress();

        let report = scheduler.fill(&mut population, &mut progress).unwrap();

        assert_eq!(report, FillReport { synthesized: 3, cached: 0 });
        assert_eq!(*calls.lock().unwrap(), vec![GenomeId(0), GenomeId(1), GenomeId(2)]);
        assert_eq!(progress.rendered, vec![GenomeId(0), GenomeId(1), GenomeId(2)]);
        assert!(population.iter().all(|g| g.has_image()));
    }

    #[test]
    fn test_cached_genomes_are_never_resynthesized() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = GenerationScheduler::new(Pipeline::SinglePhase(Box::new(CountingSynth {
            calls: Arc::clone(&calls),
        })));
        let mut population = population(3, None);
        let mut progress = progress();

        scheduler.fill(&mut population, &mut progress).unwrap();
        let report = scheduler.fill(&mut population, &mut progress).unwrap();

        assert_eq!(report, FillReport { synthesized: 0, cached: 3 });
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_failure_is_propagated() {
        let mut scheduler = GenerationScheduler::new(Pipeline::SinglePhase(Box::new(FailingSynth)));
        let mut population = population(2, None);

        let err = scheduler.fill(&mut population, &mut progress()).unwrap_err();
        assert!(matches!(err, EvolverError::SynthesisFailure(_)));
        assert_eq!(population.uncached_count(), 2);
    }

    #[test]
    fn test_two_phase_batches_each_stage() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = GenerationScheduler::new(Pipeline::TwoPhase(Box::new(RecordingTwoPhase {
            log: Arc::clone(&log),
            resident: None,
        })));
        let mut population = population(3, Some(20));

        // genome 1 is already rendered and must be skipped by both stages
        let cached = pixel(&population[1]);
        population.genomes_mut()[1].set_image(cached).unwrap();

        let report = scheduler.fill(&mut population, &mut progress()).unwrap();

        assert_eq!(report, FillReport { synthesized: 2, cached: 1 });
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "load base",
                "latents 0",
                "latents 2",
                "unload base",
                "load refiner",
                "refine 0",
                "refine 2",
                "unload refiner",
            ]
        );
        assert!(population.iter().all(|g| g.base_latents().is_none()));
        assert!(population.iter().all(|g| g.has_image()));
    }

    #[test]
    fn test_two_phase_skips_residency_when_everything_is_cached() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = GenerationScheduler::new(Pipeline::TwoPhase(Box::new(RecordingTwoPhase {
            log: Arc::clone(&log),
            resident: None,
        })));
        let mut population = population(2, Some(20));
        for genome in population.genomes_mut() {
            let image = pixel(genome);
            genome.set_image(image).unwrap();
        }

        scheduler.fill(&mut population, &mut progress()).unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_two_phase_rejects_base_genomes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = GenerationScheduler::new(Pipeline::TwoPhase(Box::new(RecordingTwoPhase {
            log: Arc::clone(&log),
            resident: None,
        })));
        let mut population = population(2, None);

        let err = scheduler.fill(&mut population, &mut progress()).unwrap_err();
        assert!(matches!(err, EvolverError::SynthesisFailure(_)));
        assert!(log.lock().unwrap().is_empty());
    }
}
