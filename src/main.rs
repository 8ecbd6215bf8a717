use anyhow::{anyhow, Context};
use clap::Parser;
use eframe::NativeOptions;
use sdevolve::config::{AppConfig, ConfigManager, SynthesisMode};
use sdevolve::engines::generation::EvolutionEngine;
use sdevolve::engines::synthesis::{GenerationScheduler, Pipeline, ProceduralSynthesizer};
use sdevolve::engines::EvolutionSession;
use sdevolve::ui::services::EvolutionRunner;
use sdevolve::ui::SdEvolveApp;
use std::path::PathBuf;

/// Interactive evolution of image-generation parameters
#[derive(Parser)]
#[command(name = "sdevolve")]
#[command(about = "Breed images by picking the ones you like", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "SDEVOLVE_CONFIG")]
    config: Option<PathBuf>,

    /// Genomes per generation
    #[arg(long)]
    population_size: Option<usize>,

    /// Inference steps for founding genomes
    #[arg(long)]
    steps: Option<u32>,

    /// Classifier-free guidance scale for founding genomes
    #[arg(long)]
    guidance_scale: Option<f64>,

    /// Refinement steps (two-phase only)
    #[arg(long)]
    refine_steps: Option<u32>,

    /// Use the base + refiner pipeline
    #[arg(long)]
    two_phase: bool,

    /// Seed for the evolution RNG, for reproducible runs
    #[arg(long)]
    rng_seed: Option<u64>,

    /// Where saved images go
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Start immediately with this prompt
    #[arg(short, long, default_value = "")]
    prompt: String,

    #[arg(short, long, default_value = "")]
    negative_prompt: String,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(size) = self.population_size {
            config.evolution.population_size = size;
        }
        if let Some(steps) = self.steps {
            config.evolution.steps = steps;
        }
        if let Some(guidance) = self.guidance_scale {
            config.evolution.guidance_scale = guidance;
        }
        if let Some(refine) = self.refine_steps {
            config.evolution.refine_steps = refine;
        }
        if self.two_phase {
            config.synthesis.mode = SynthesisMode::TwoPhase;
        }
        if self.rng_seed.is_some() {
            config.evolution.rng_seed = self.rng_seed;
        }
        if let Some(dir) = &self.output_dir {
            config.persistence.output_dir = dir.clone();
        }
    }
}

fn build_session(config: &AppConfig) -> anyhow::Result<EvolutionSession> {
    let synth = ProceduralSynthesizer::new(&config.synthesis);
    let pipeline = match config.synthesis.mode {
        SynthesisMode::SinglePhase => Pipeline::SinglePhase(Box::new(synth)),
        SynthesisMode::TwoPhase => Pipeline::TwoPhase(Box::new(synth)),
    };
    let engine = EvolutionEngine::new(
        config.evolution.clone(),
        config.mutation.clone(),
        config.synthesis.mode,
    );
    Ok(EvolutionSession::new(engine, GenerationScheduler::new(pipeline))?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let manager = ConfigManager::new();
    manager
        .load_layered(cli.config.as_deref())
        .context("loading configuration")?;
    manager
        .update(|config| cli.apply(config))
        .context("applying command-line overrides")?;
    let config = manager.get();

    if cli.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    log::info!(
        "Population {}, steps {}, guidance {}, mode {:?}",
        config.evolution.population_size,
        config.evolution.steps,
        config.evolution.guidance_scale,
        config.synthesis.mode
    );

    let runner = EvolutionRunner::start(build_session(&config)?)?;

    let native_options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title("sdevolve"),
        ..Default::default()
    };

    let Cli { prompt, negative_prompt, .. } = cli;
    eframe::run_native(
        "sdevolve",
        native_options,
        Box::new(move |cc| Ok(Box::new(SdEvolveApp::new(cc, runner, &config, prompt, negative_prompt)))),
    )
    .map_err(|e| anyhow!("viewer exited with error: {}", e))
}
