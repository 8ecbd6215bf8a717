use crate::config::EvolutionConfig;
use crate::engines::generation::{
    EvolutionEngine, EvolutionEvent, Population, ProgressCallback, Transition,
};
use crate::engines::synthesis::GenerationScheduler;
use crate::error::EvolverError;

/// One interactive run: the engine plus the backend that renders its
/// populations.
///
/// Every event is applied as stage, render, commit. If rendering fails the
/// staged generation is dropped and the engine keeps its population, history
/// and generation counter.
pub struct EvolutionSession {
    engine: EvolutionEngine,
    scheduler: GenerationScheduler,
}

impl EvolutionSession {
    pub fn new(engine: EvolutionEngine, scheduler: GenerationScheduler) -> Result<Self, EvolverError> {
        if engine.mode() != scheduler.mode() {
            return Err(EvolverError::Configuration(format!(
                "engine expects {:?} genomes but the backend is {:?}",
                engine.mode(),
                scheduler.mode()
            )));
        }
        Ok(Self { engine, scheduler })
    }

    pub fn handle(
        &mut self,
        event: EvolutionEvent,
        progress: &mut dyn ProgressCallback,
    ) -> Result<Transition, EvolverError> {
        log::debug!("Handling {} event", event.name());

        if let EvolutionEvent::Back = event {
            return self.revert(progress);
        }

        let mut pending = self.engine.stage(event)?;
        let generation = if pending.is_reset() {
            0
        } else {
            self.engine.generation() + 1
        };

        progress.on_generation_start(generation, pending.population().uncached_count());
        let report = self.scheduler.fill(pending.population_mut(), progress)?;
        let transition = self.engine.commit(pending);
        progress.on_generation_complete(generation, report.synthesized, report.cached);

        Ok(transition)
    }

    /// Render whatever the top snapshot is missing on a copy, then pop it.
    fn revert(&mut self, progress: &mut dyn ProgressCallback) -> Result<Transition, EvolverError> {
        let mut restored = match self.engine.history().peek() {
            Some(snapshot) => snapshot.population.clone(),
            None => return self.engine.revert(),
        };
        self.scheduler.fill(&mut restored, progress)?;

        let transition = self.engine.revert()?;
        if let Some(population) = self.engine.population_mut() {
            *population = restored;
        }
        Ok(transition)
    }

    pub fn reconfigure(&mut self, config: EvolutionConfig) -> Result<(), EvolverError> {
        self.engine.reconfigure(config)
    }

    pub fn engine(&self) -> &EvolutionEngine {
        &self.engine
    }

    pub fn population(&self) -> Option<&Population> {
        self.engine.population()
    }

    pub fn generation(&self) -> usize {
        self.engine.generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MutationConfig, SynthesisMode};
    use crate::engines::generation::{ConsoleProgressCallback, Genome};
    use crate::engines::synthesis::{ImageSynthesizer, Pipeline};
    use crate::types::Image;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Succeeds for the first `budget` calls, then fails.
    struct BudgetSynth {
        calls: Arc<AtomicUsize>,
        budget: usize,
    }

    impl ImageSynthesizer for BudgetSynth {
        fn synthesize(&mut self, genome: &Genome) -> Result<Image, EvolverError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n >= self.budget {
                return Err(EvolverError::SynthesisFailure("device lost".to_string()));
            }
            Ok(Image::from_rgba(1, 1, vec![genome.id().get() as u8; 4]).unwrap())
        }
    }

    fn session(budget: usize) -> (EvolutionSession, Arc<AtomicUsize>) {
        let config = EvolutionConfig {
            population_size: 4,
            rng_seed: Some(3),
            ..Default::default()
        };
        let engine = EvolutionEngine::new(config, MutationConfig::default(), SynthesisMode::SinglePhase);
        let calls = Arc::new(AtomicUsize::new(0));
        let scheduler = GenerationScheduler::new(Pipeline::SinglePhase(Box::new(BudgetSynth {
            calls: Arc::clone(&calls),
            budget,
        })));
        (EvolutionSession::new(engine, scheduler).unwrap(), calls)
    }

    fn reset() -> EvolutionEvent {
        EvolutionEvent::Reset {
            prompt: "cat".to_string(),
            negative_prompt: String::new(),
        }
    }

    fn keep_first(session: &EvolutionSession) -> EvolutionEvent {
        let first = &session.population().unwrap()[0];
        EvolutionEvent::Advance {
            selection: vec![(0, first.image().unwrap().clone())],
            prompt: "cat".to_string(),
            negative_prompt: String::new(),
        }
    }

    #[test]
    fn test_mode_mismatch_is_rejected() {
        let engine = EvolutionEngine::new(EvolutionConfig::default(), MutationConfig::default(), SynthesisMode::TwoPhase);
        let scheduler = GenerationScheduler::new(Pipeline::SinglePhase(Box::new(BudgetSynth {
            calls: Arc::new(AtomicUsize::new(0)),
            budget: 0,
        })));
        assert!(matches!(
            EvolutionSession::new(engine, scheduler),
            Err(EvolverError::Configuration(_))
        ));
    }

    #[test]
    fn test_committed_population_is_fully_rendered() {
        let (mut session, calls) = session(100);
        session.handle(reset(), &mut ConsoleProgressCallback).unwrap();
        assert!(session.population().unwrap().iter().all(|g| g.has_image()));

        let event = keep_first(&session);
        session.handle(event, &mut ConsoleProgressCallback).unwrap();
        // the survivor is reused, only the three children are rendered
        assert_eq!(calls.load(Ordering::SeqCst), 4 + 3);
    }

    #[test]
    fn test_failed_render_does_not_commit() {
        let (mut session, _) = session(5);
        session.handle(reset(), &mut ConsoleProgressCallback).unwrap();
        let before = session.population().unwrap().ids();

        let event = keep_first(&session);
        let err = session.handle(event, &mut ConsoleProgressCallback).unwrap_err();

        assert!(matches!(err, EvolverError::SynthesisFailure(_)));
        assert_eq!(session.generation(), 0);
        assert!(session.engine().history().is_empty());
        assert_eq!(session.population().unwrap().ids(), before);
    }

    #[test]
    fn test_back_restores_previous_generation() {
        let (mut session, calls) = session(100);
        session.handle(reset(), &mut ConsoleProgressCallback).unwrap();
        let founders = session.population().unwrap().ids();

        let event = keep_first(&session);
        session.handle(event, &mut ConsoleProgressCallback).unwrap();
        let rendered = calls.load(Ordering::SeqCst);

        let transition = session.handle(EvolutionEvent::Back, &mut ConsoleProgressCallback).unwrap();
        assert_eq!(transition, Transition::Reverted { generation: 0 });
        assert_eq!(session.population().unwrap().ids(), founders);
        assert_eq!(calls.load(Ordering::SeqCst), rendered);
    }

    #[test]
    fn test_failed_back_keeps_current_generation() {
        let config = EvolutionConfig {
            population_size: 4,
            rng_seed: Some(9),
            ..Default::default()
        };
        let mut engine = EvolutionEngine::new(config, MutationConfig::default(), SynthesisMode::SinglePhase);
        engine.initialize("cat", "");
        // only genome 0 of the founders ever gets an image
        engine
            .advance(vec![(0, Image::from_rgba(1, 1, vec![0; 4]).unwrap())], "cat", "")
            .unwrap();
        let current = engine.population().unwrap().ids();

        let calls = Arc::new(AtomicUsize::new(0));
        let scheduler = GenerationScheduler::new(Pipeline::SinglePhase(Box::new(BudgetSynth {
            calls: Arc::clone(&calls),
            budget: 1,
        })));
        let mut session = EvolutionSession::new(engine, scheduler).unwrap();

        let err = session.handle(EvolutionEvent::Back, &mut ConsoleProgressCallback).unwrap_err();
        assert!(matches!(err, EvolverError::SynthesisFailure(_)));
        assert_eq!(session.generation(), 1);
        assert_eq!(session.engine().history().len(), 1);
        assert_eq!(session.population().unwrap().ids(), current);
    }

    #[test]
    fn test_back_renders_missing_images_of_snapshot() {
        let config = EvolutionConfig {
            population_size: 4,
            rng_seed: Some(9),
            ..Default::default()
        };
        let mut engine = EvolutionEngine::new(config, MutationConfig::default(), SynthesisMode::SinglePhase);
        engine.initialize("cat", "");
        let founders = engine.population().unwrap().ids();
        engine
            .advance(vec![(0, Image::from_rgba(1, 1, vec![0; 4]).unwrap())], "cat", "")
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let scheduler = GenerationScheduler::new(Pipeline::SinglePhase(Box::new(BudgetSynth {
            calls: Arc::clone(&calls),
            budget: 100,
        })));
        let mut session = EvolutionSession::new(engine, scheduler).unwrap();

        let transition = session.handle(EvolutionEvent::Back, &mut ConsoleProgressCallback).unwrap();
        assert_eq!(transition, Transition::Reverted { generation: 0 });
        assert_eq!(session.population().unwrap().ids(), founders);
        assert!(session.population().unwrap().iter().all(|g| g.has_image()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
