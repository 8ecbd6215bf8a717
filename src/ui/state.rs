use crate::config::AppConfig;
use crate::engines::generation::{GenomeDescriptor, Selection};
use crate::types::Image;
use crate::ui::services::PopulationView;
use std::path::PathBuf;

/// Button presses the panels record for the app to act on after drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Evolve,
    Reset,
    Back,
    SaveSelected,
}

/// One cell of the image grid
pub struct Tile {
    pub descriptor: GenomeDescriptor,
    pub image: Image,
    pub texture: Option<egui::TextureHandle>,
}

/// Central application state for the UI
pub struct AppState {
    // Prompts
    pub prompt: String,
    pub negative_prompt: String,

    // Settings, edited as text and applied on reset
    pub population_size_text: String,
    pub steps_text: String,
    pub guidance_text: String,
    pub refine_steps_text: String,
    pub two_phase: bool,
    pub output_dir: PathBuf,

    // Current generation
    pub tiles: Vec<Tile>,
    pub generation: usize,
    pub history_len: usize,
    /// Grid indices in the order the user picked them.
    pub selection: Vec<usize>,
    pub focused: Option<usize>,

    // Execution State
    pub is_running: bool,
    pub progress_percentage: f32,
    pub status_message: String,
    pub requested: Option<UiAction>,
}

impl AppState {
    pub fn from_config(config: &AppConfig, prompt: String, negative_prompt: String) -> Self {
        Self {
            prompt,
            negative_prompt,
            population_size_text: config.evolution.population_size.to_string(),
            steps_text: config.evolution.steps.to_string(),
            guidance_text: config.evolution.guidance_scale.to_string(),
            refine_steps_text: config.evolution.refine_steps.to_string(),
            two_phase: config.synthesis.mode.is_two_phase(),
            output_dir: config.persistence.output_dir.clone(),
            tiles: Vec::new(),
            generation: 0,
            history_len: 0,
            selection: Vec::new(),
            focused: None,
            is_running: false,
            progress_percentage: 0.0,
            status_message: "Ready".to_string(),
            requested: None,
        }
    }

    /// Select an unselected tile (appending it to the order) or deselect it.
    pub fn toggle_selection(&mut self, index: usize) {
        if index >= self.tiles.len() {
            return;
        }
        match self.selection.iter().position(|&i| i == index) {
            Some(pos) => {
                self.selection.remove(pos);
            }
            None => self.selection.push(index),
        }
        self.focused = Some(index);
    }

    /// 1-based pick order of a tile, if selected.
    pub fn selection_rank(&self, index: usize) -> Option<usize> {
        self.selection.iter().position(|&i| i == index).map(|p| p + 1)
    }

    /// The selection as the engine wants it: ordered `(index, image)` pairs.
    pub fn selection_payload(&self) -> Selection {
        self.selection
            .iter()
            .filter_map(|&i| self.tiles.get(i).map(|tile| (i, tile.image.clone())))
            .collect()
    }

    /// Replace the grid with a freshly rendered population.
    pub fn show_population(&mut self, view: PopulationView) {
        self.generation = view.generation;
        self.history_len = view.history_len;
        self.tiles = view
            .tiles
            .into_iter()
            .map(|tile| Tile {
                descriptor: tile.descriptor,
                image: tile.image,
                texture: None,
            })
            .collect();
        self.selection.clear();
        self.focused = None;
    }

    pub fn focused_tile(&self) -> Option<&Tile> {
        self.focused.and_then(|i| self.tiles.get(i))
    }

    pub fn request(&mut self, action: UiAction) {
        self.requested = Some(action);
    }
}
