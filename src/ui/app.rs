use super::panels::{LeftPanel, MainPanel, RightPanel};
use super::services::{ConfigBridge, EvolutionRunner, RunnerUpdate};
use super::state::{AppState, UiAction};
use crate::config::{AppConfig, EvolutionConfig};
use crate::engines::generation::{EvolutionEvent, ProgressMessage, Transition};
use crate::error::EvolverError;
use crate::persistence::{ImageSaver, Persistence};
use std::time::Duration;

pub struct SdEvolveApp {
    state: AppState,
    left_panel: LeftPanel,
    main_panel: MainPanel,
    right_panel: RightPanel,
    runner: EvolutionRunner,
    evolution_config: EvolutionConfig,
}

impl SdEvolveApp {
    /// Starts the first generation right away when a prompt is already known.
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        runner: EvolutionRunner,
        config: &AppConfig,
        prompt: String,
        negative_prompt: String,
    ) -> Self {
        let mut app = Self {
            state: AppState::from_config(config, prompt, negative_prompt),
            left_panel: LeftPanel::new(),
            main_panel: MainPanel::new(),
            right_panel: RightPanel::new(),
            runner,
            evolution_config: config.evolution.clone(),
        };
        if !app.state.prompt.trim().is_empty() {
            app.submit(EvolutionEvent::Reset {
                prompt: app.state.prompt.clone(),
                negative_prompt: app.state.negative_prompt.clone(),
            });
        }
        app
    }

    fn submit(&mut self, event: EvolutionEvent) {
        let name = event.name();
        match self.runner.send(event) {
            Ok(()) => {
                self.state.is_running = true;
                self.state.progress_percentage = 0.0;
                self.state.status_message = format!("Working on {}...", name);
            }
            Err(e) => self.state.status_message = format!("Error: {}", e),
        }
    }

    fn handle_action(&mut self, action: UiAction) {
        match action {
            UiAction::Evolve => {
                let event = EvolutionEvent::Advance {
                    selection: self.state.selection_payload(),
                    prompt: self.state.prompt.clone(),
                    negative_prompt: self.state.negative_prompt.clone(),
                };
                self.submit(event);
            }
            UiAction::Reset => {
                // Bad settings are reported and the reset is not sent.
                match ConfigBridge::to_evolution_config(&self.state, &self.evolution_config) {
                    Ok(config) => {
                        if config != self.evolution_config {
                            if let Err(e) = self.runner.reconfigure(config.clone()) {
                                self.state.status_message = format!("Error: {}", e);
                                return;
                            }
                            self.evolution_config = config;
                        }
                        self.submit(EvolutionEvent::Reset {
                            prompt: self.state.prompt.clone(),
                            negative_prompt: self.state.negative_prompt.clone(),
                        });
                    }
                    Err(e) => self.state.status_message = e.to_string(),
                }
            }
            UiAction::Back => self.submit(EvolutionEvent::Back),
            UiAction::SaveSelected => self.save_selected(),
        }
    }

    fn save_selected(&mut self) {
        let mut saver = ImageSaver::new(self.state.output_dir.clone());
        let mut saved = 0;
        for &index in &self.state.selection {
            let Some(tile) = self.state.tiles.get(index) else {
                continue;
            };
            match saver.save(&tile.image, &tile.descriptor) {
                Ok(_) => saved += 1,
                Err(e) => {
                    log::error!("Failed to save genome {}: {}", tile.descriptor.id, e);
                    self.state.status_message = format!("Save failed: {}", e);
                    return;
                }
            }
        }
        self.state.status_message = format!("Saved {} image(s) to {}", saved, self.state.output_dir.display());
    }

    fn poll_runner(&mut self) {
        while let Some(message) = self.runner.poll_progress() {
            match message {
                ProgressMessage::GenerationStart { generation, to_render } => {
                    self.state.status_message =
                        format!("Generation {}: rendering {} new images", generation, to_render);
                }
                ProgressMessage::GenomeRendered { genome_id, done, total } => {
                    self.state.progress_percentage = done as f32 / total.max(1) as f32;
                    self.state.status_message = format!("Rendered genome {} ({}/{})", genome_id, done, total);
                }
                ProgressMessage::GenerationComplete { .. } => {
                    self.state.progress_percentage = 1.0;
                }
            }
        }

        while let Some(update) = self.runner.poll_update() {
            match update {
                RunnerUpdate::Ready { transition, view } => {
                    self.state.status_message = match transition {
                        Transition::Initialized => "New population. Make selections and click \"Evolve\"".to_string(),
                        Transition::Advanced { generation, survivors } => {
                            format!("Generation {} bred from {} survivor(s)", generation, survivors)
                        }
                        Transition::Reverted { generation } => format!("Back at generation {}", generation),
                    };
                    self.state.show_population(view);
                }
                RunnerUpdate::Reconfigured => {}
                RunnerUpdate::Failed { action, error } => {
                    self.state.status_message = match error {
                        EvolverError::EmptyHistory => "Nothing to go back to".to_string(),
                        other => format!("{} failed: {}", action, other),
                    };
                }
            }
        }

        self.state.is_running = self.runner.is_busy();
    }
}

impl eframe::App for SdEvolveApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_runner();
        if self.state.is_running {
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("sdevolve");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(if self.state.two_phase { "base + refiner" } else { "single pass" });
                });
            });
        });

        // Left Panel - Prompt and controls
        egui::SidePanel::left("left_panel")
            .default_width(280.0)
            .resizable(true)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.left_panel.show(ui, &mut self.state);
                });
            });

        // Right Panel - Genome Details
        egui::SidePanel::right("right_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.right_panel.show(ui, &self.state);
                });
            });

        // Central Panel - Image grid
        egui::CentralPanel::default().show(ctx, |ui| {
            self.main_panel.show(ui, &mut self.state);
        });

        if let Some(action) = self.state.requested.take() {
            self.handle_action(action);
        }
    }
}
