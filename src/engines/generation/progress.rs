use crate::engines::generation::identity::GenomeId;
use std::sync::mpsc::Sender;

/// Observer for the render phase of a generation.
pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize, to_render: usize);
    fn on_genome_rendered(&mut self, genome_id: GenomeId, done: usize, total: usize);
    fn on_generation_complete(&mut self, generation: usize, rendered: usize, cached: usize);
}

pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize, to_render: usize) {
        log::info!("Generation {}: rendering {} new images", generation, to_render);
    }

    fn on_genome_rendered(&mut self, genome_id: GenomeId, done: usize, total: usize) {
        log::debug!("  Rendered genome {} ({}/{})", genome_id, done, total);
    }

    fn on_generation_complete(&mut self, generation: usize, rendered: usize, cached: usize) {
        log::info!(
            "Generation {} ready: {} rendered, {} cached",
            generation, rendered, cached
        );
        log::info!("Make selections and click \"Evolve\"");
    }
}

// For IPC communication with UI
pub struct ChannelProgressCallback {
    sender: Sender<ProgressMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    GenerationStart { generation: usize, to_render: usize },
    GenomeRendered { genome_id: GenomeId, done: usize, total: usize },
    GenerationComplete { generation: usize, rendered: usize, cached: usize },
}

impl ChannelProgressCallback {
    pub fn new(sender: Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize, to_render: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart { generation, to_render });
    }

    fn on_genome_rendered(&mut self, genome_id: GenomeId, done: usize, total: usize) {
        let _ = self.sender.send(ProgressMessage::GenomeRendered { genome_id, done, total });
    }

    fn on_generation_complete(&mut self, generation: usize, rendered: usize, cached: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationComplete {
            generation,
            rendered,
            cached,
        });
    }
}
