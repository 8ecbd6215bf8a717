use crate::types::Image;

/// One kept genome: its index in the current population and the image the
/// viewer showed for it.
pub type Selection = Vec<(usize, Image)>;

/// Discrete messages the viewer posts to the engine.
#[derive(Debug, Clone)]
pub enum EvolutionEvent {
    /// Breed the next generation from the kept genomes, in selection order.
    /// An empty selection is treated as `Reset`.
    Advance {
        selection: Selection,
        prompt: String,
        negative_prompt: String,
    },
    /// Start over with a fresh founding population.
    Reset {
        prompt: String,
        negative_prompt: String,
    },
    /// Undo the last advance.
    Back,
}

impl EvolutionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EvolutionEvent::Advance { selection, .. } if selection.is_empty() => "reset",
            EvolutionEvent::Advance { .. } => "advance",
            EvolutionEvent::Reset { .. } => "reset",
            EvolutionEvent::Back => "back",
        }
    }
}

/// What a transition did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Initialized,
    Advanced { generation: usize, survivors: usize },
    Reverted { generation: usize },
}
