use crate::config::traits::ConfigSection;
use crate::config::{EvolutionConfig, MutationConfig, SynthesisMode};
use crate::engines::generation::{
    events::{EvolutionEvent, Selection, Transition},
    genome::{Genome, GenomeParams},
    history::HistoryStack,
    identity::IdentityAllocator,
    population::Population,
};
use crate::error::EvolverError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NoPopulation,
    PopulationReady,
}

/// A computed but not yet committed generation.
///
/// Staging never touches the engine's population, history or generation
/// counter (it only consumes ids and randomness), so a caller can render the
/// staged population and simply drop it if rendering fails.
#[derive(Debug)]
pub struct PendingGeneration {
    kind: PendingKind,
    population: Population,
}

#[derive(Debug)]
enum PendingKind {
    Initialize,
    Advance { previous: Population, survivors: usize },
}

impl PendingGeneration {
    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }

    pub fn is_reset(&self) -> bool {
        matches!(self.kind, PendingKind::Initialize)
    }
}

/// Interactive evolution: the user is the fitness function.
///
/// Survivors are carried over unchanged (apart from their rendered image) and
/// every free slot is filled with a mutated child of a uniformly chosen
/// survivor. There is no crossover, so lineage is a tree.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    mutation: MutationConfig,
    mode: SynthesisMode,
    ids: IdentityAllocator,
    population: Option<Population>,
    history: HistoryStack,
    generation: usize,
    rng: StdRng,
}

impl EvolutionEngine {
    pub fn new(config: EvolutionConfig, mutation: MutationConfig, mode: SynthesisMode) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            mutation,
            mode,
            ids: IdentityAllocator::new(),
            population: None,
            history: HistoryStack::new(),
            generation: 0,
            rng,
        }
    }

    /// Replace the founding population and forget all history.
    pub fn initialize(&mut self, prompt: &str, negative_prompt: &str) -> Transition {
        let pending = self.stage_initialize(prompt, negative_prompt);
        self.commit(pending)
    }

    /// Keep the selected genomes and refill the rest with mutated children.
    /// An empty selection resets the search.
    pub fn advance(
        &mut self,
        selection: Selection,
        prompt: &str,
        negative_prompt: &str,
    ) -> Result<Transition, EvolverError> {
        let pending = self.stage_advance(selection, prompt, negative_prompt)?;
        Ok(self.commit(pending))
    }

    /// Restore the population from before the last advance.
    pub fn revert(&mut self) -> Result<Transition, EvolverError> {
        let snapshot = match self.history.pop() {
            Some(snapshot) => snapshot,
            None => {
                log::warn!("Back requested at generation {} with empty history", self.generation);
                return Err(EvolverError::EmptyHistory);
            }
        };

        self.generation = snapshot.generation;
        self.population = Some(snapshot.population);
        log::info!("Reverted to generation {}", self.generation);

        Ok(Transition::Reverted { generation: self.generation })
    }

    /// State transition for one viewer event, without any rendering.
    pub fn apply(&mut self, event: EvolutionEvent) -> Result<Transition, EvolverError> {
        match event {
            EvolutionEvent::Back => self.revert(),
            other => {
                let pending = self.stage(other)?;
                Ok(self.commit(pending))
            }
        }
    }

    /// Stage the generation an `Advance` or `Reset` event would produce.
    pub fn stage(&mut self, event: EvolutionEvent) -> Result<PendingGeneration, EvolverError> {
        match event {
            EvolutionEvent::Advance { selection, prompt, negative_prompt } => {
                self.stage_advance(selection, &prompt, &negative_prompt)
            }
            EvolutionEvent::Reset { prompt, negative_prompt } => {
                Ok(self.stage_initialize(&prompt, &negative_prompt))
            }
            EvolutionEvent::Back => Err(EvolverError::InvalidSelection(
                "back cannot be staged; use revert".to_string(),
            )),
        }
    }

    pub fn stage_initialize(&mut self, prompt: &str, negative_prompt: &str) -> PendingGeneration {
        let refine_steps = self.mode.is_two_phase().then_some(self.config.refine_steps);
        let base = GenomeParams::new(prompt, negative_prompt)
            .with_steps(self.config.steps)
            .with_guidance(self.config.guidance_scale)
            .with_refine_steps(refine_steps);

        let genomes = (0..self.config.population_size)
            .map(|_| Genome::create_randomized(&mut self.ids, base.clone(), &self.mutation, &mut self.rng))
            .collect();

        PendingGeneration {
            kind: PendingKind::Initialize,
            population: Self::population_of(genomes),
        }
    }

    pub fn stage_advance(
        &mut self,
        selection: Selection,
        prompt: &str,
        negative_prompt: &str,
    ) -> Result<PendingGeneration, EvolverError> {
        if selection.is_empty() {
            log::info!("Empty selection: resetting population");
            return Ok(self.stage_initialize(prompt, negative_prompt));
        }

        let current = self.population.as_ref().ok_or(EvolverError::NoPopulation)?;
        self.validate_selection(current, &selection)?;

        log::info!("Generation {} ---------------------------", self.generation);

        // Attach the rendered images to a copy of the current population; the
        // copy is what goes into history.
        let mut previous = current.clone();
        for (index, image) in &selection {
            let genome = &mut previous.genomes_mut()[*index];
            genome.set_image(image.clone())?;
            log::info!("Selected for survival: {}", genome);
        }

        let keepers: Vec<Genome> = selection
            .iter()
            .map(|(index, _)| previous[*index].clone())
            .collect();
        let survivors = keepers.len();

        let mut next = keepers.clone();
        for _ in survivors..self.config.population_size {
            let parent = keepers
                .choose(&mut self.rng)
                .ok_or_else(|| EvolverError::InvalidSelection("no keepers".to_string()))?;
            let mut child = parent.mutated_child(&mut self.ids, &self.mutation, &mut self.rng);
            child.override_prompts(prompt, negative_prompt);
            log::debug!("New child: {}", child);
            next.push(child);
        }

        Ok(PendingGeneration {
            kind: PendingKind::Advance { previous, survivors },
            population: Self::population_of(next),
        })
    }

    /// Make a staged generation current.
    pub fn commit(&mut self, pending: PendingGeneration) -> Transition {
        match pending.kind {
            PendingKind::Initialize => {
                self.history.clear();
                self.generation = 0;
                self.population = Some(pending.population);
                log::info!(
                    "Initialized population of {} genomes",
                    self.config.population_size
                );
                Transition::Initialized
            }
            PendingKind::Advance { previous, survivors } => {
                self.history.push(self.generation, previous);
                self.generation += 1;
                self.population = Some(pending.population);
                Transition::Advanced {
                    generation: self.generation,
                    survivors,
                }
            }
        }
    }

    fn validate_selection(&self, current: &Population, selection: &Selection) -> Result<(), EvolverError> {
        if selection.len() > self.config.population_size {
            return Err(EvolverError::InvalidSelection(format!(
                "{} genomes selected but the population holds {}",
                selection.len(),
                self.config.population_size
            )));
        }

        let mut seen = HashSet::with_capacity(selection.len());
        for (index, image) in selection {
            let genome = current.get(*index).ok_or_else(|| {
                EvolverError::InvalidSelection(format!(
                    "index {} out of range for population of {}",
                    index,
                    current.len()
                ))
            })?;
            if !seen.insert(*index) {
                return Err(EvolverError::InvalidSelection(format!(
                    "index {} selected twice",
                    index
                )));
            }
            if !genome.accepts_image(image) {
                return Err(EvolverError::DoubleImageAssignment { genome_id: genome.id() });
            }
        }
        Ok(())
    }

    fn population_of(genomes: Vec<Genome>) -> Population {
        // Every genome here either carries a freshly allocated id or is a
        // distinct survivor of the current population.
        match Population::new(genomes) {
            Ok(population) => population,
            Err(e) => unreachable!("engine produced an invalid population: {}", e),
        }
    }

    pub fn state(&self) -> EngineState {
        if self.population.is_some() {
            EngineState::PopulationReady
        } else {
            EngineState::NoPopulation
        }
    }

    pub fn population(&self) -> Option<&Population> {
        self.population.as_ref()
    }

    pub(crate) fn population_mut(&mut self) -> Option<&mut Population> {
        self.population.as_mut()
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn mode(&self) -> SynthesisMode {
        self.mode
    }

    /// Swap the evolution settings used by subsequent stages. The current
    /// population is left as is; `rng_seed` only matters at construction.
    pub fn reconfigure(&mut self, config: EvolutionConfig) -> Result<(), EvolverError> {
        config.validate()?;
        log::info!(
            "Evolution settings now: population {}, steps {}, guidance {:.2}, refine {}",
            config.population_size, config.steps, config.guidance_scale, config.refine_steps
        );
        self.config = config;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::identity::GenomeId;
    use crate::types::Image;

    fn engine(population_size: usize) -> EvolutionEngine {
        let config = EvolutionConfig {
            population_size,
            rng_seed: Some(42),
            ..Default::default()
        };
        EvolutionEngine::new(config, MutationConfig::default(), SynthesisMode::SinglePhase)
    }

    fn image(value: u8) -> Image {
        Image::from_rgba(1, 1, vec![value; 4]).unwrap()
    }

    #[test]
    fn test_starts_without_population() {
        let engine = engine(4);
        assert_eq!(engine.state(), EngineState::NoPopulation);
        assert!(engine.population().is_none());
    }

    #[test]
    fn test_advance_before_initialize_fails() {
        let mut engine = engine(4);
        let err = engine.advance(vec![(0, image(1))], "cat", "").unwrap_err();
        assert!(matches!(err, EvolverError::NoPopulation));
    }

    #[test]
    fn test_out_of_range_selection_leaves_state_untouched() {
        let mut engine = engine(4);
        engine.initialize("cat", "");
        let before = engine.population().unwrap().ids();

        let err = engine.advance(vec![(0, image(1)), (7, image(2))], "cat", "").unwrap_err();
        assert!(matches!(err, EvolverError::InvalidSelection(_)));
        assert_eq!(engine.population().unwrap().ids(), before);
        assert!(engine.history().is_empty());
        assert_eq!(engine.generation(), 0);
        // no image was attached to genome 0 either
        assert!(!engine.population().unwrap()[0].has_image());
    }

    #[test]
    fn test_duplicate_selection_is_rejected() {
        let mut engine = engine(4);
        engine.initialize("cat", "");
        let err = engine.advance(vec![(1, image(1)), (1, image(1))], "cat", "").unwrap_err();
        assert!(matches!(err, EvolverError::InvalidSelection(_)));
    }

    #[test]
    fn test_conflicting_image_is_rejected_before_any_change() {
        let mut engine = engine(4);
        engine.initialize("cat", "");
        engine.advance(vec![(2, image(1))], "cat", "").unwrap();
        // genome at index 0 is the survivor, now carrying image(1)
        let err = engine.advance(vec![(1, image(5)), (0, image(9))], "cat", "").unwrap_err();
        assert!(matches!(err, EvolverError::DoubleImageAssignment { .. }));
        assert_eq!(engine.generation(), 1);
        assert_eq!(engine.history().len(), 1);
        assert!(!engine.population().unwrap()[1].has_image());
    }

    #[test]
    fn test_full_selection_yields_no_children() {
        let mut engine = engine(3);
        engine.initialize("cat", "");
        let ids = engine.population().unwrap().ids();

        let selection = vec![(2, image(2)), (0, image(0)), (1, image(1))];
        engine.advance(selection, "cat", "").unwrap();

        let population = engine.population().unwrap();
        assert_eq!(population.ids(), vec![ids[2], ids[0], ids[1]]);
        assert!(population.iter().all(|g| g.has_image()));
    }

    #[test]
    fn test_prompt_edit_reaches_children_only() {
        let mut engine = engine(4);
        engine.initialize("cat", "");
        engine.advance(vec![(0, image(1))], "dog", "blurry").unwrap();

        let population = engine.population().unwrap();
        assert_eq!(population[0].prompt(), "cat");
        assert_eq!(population[0].negative_prompt(), "");
        for child in population.iter().skip(1) {
            assert_eq!(child.prompt(), "dog");
            assert_eq!(child.negative_prompt(), "blurry");
        }
    }

    #[test]
    fn test_two_phase_mode_founds_refinement_genomes() {
        let config = EvolutionConfig {
            population_size: 2,
            refine_steps: 30,
            rng_seed: Some(1),
            ..Default::default()
        };
        let mut engine = EvolutionEngine::new(config, MutationConfig::default(), SynthesisMode::TwoPhase);
        engine.initialize("cat", "");
        assert!(engine.population().unwrap().iter().all(|g| g.is_refinement()));
    }

    #[test]
    fn test_staged_generation_is_dropped_without_side_effects() {
        let mut engine = engine(4);
        engine.initialize("cat", "");
        let before = engine.population().unwrap().ids();

        let pending = engine.stage_advance(vec![(0, image(1))], "cat", "").unwrap();
        assert!(!pending.is_reset());
        drop(pending);

        assert_eq!(engine.population().unwrap().ids(), before);
        assert!(engine.history().is_empty());
        assert!(!engine.population().unwrap()[0].has_image());

        // ids consumed by the dropped stage are not reused
        engine.advance(vec![(0, image(1))], "cat", "").unwrap();
        assert!(engine.population().unwrap()[1].id() > GenomeId(6));
    }

    #[test]
    fn test_reconfigure_applies_to_next_reset() {
        let mut engine = engine(4);
        engine.initialize("cat", "");

        let bad = EvolutionConfig { population_size: 0, ..Default::default() };
        assert!(matches!(engine.reconfigure(bad), Err(EvolverError::Configuration(_))));

        let config = EvolutionConfig { population_size: 6, steps: 40, ..Default::default() };
        engine.reconfigure(config).unwrap();
        assert_eq!(engine.population().unwrap().len(), 4);

        engine.initialize("cat", "");
        assert_eq!(engine.population().unwrap().len(), 6);
    }

    #[test]
    fn test_apply_back_on_empty_history() {
        let mut engine = engine(4);
        engine.initialize("cat", "");
        let err = engine.apply(EvolutionEvent::Back).unwrap_err();
        assert!(matches!(err, EvolverError::EmptyHistory));
        assert_eq!(engine.state(), EngineState::PopulationReady);
    }
}
