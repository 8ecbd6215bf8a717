use crate::config::traits::{ConfigManifest, ConfigSection};
use crate::config::EvolutionConfig;
use crate::ui::state::{AppState, UiAction};

pub struct LeftPanel {
    manifest: ConfigManifest,
}

impl LeftPanel {
    pub fn new() -> Self {
        Self {
            manifest: EvolutionConfig::default().to_manifest(),
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, state: &mut AppState) {
        ui.heading("Prompt");
        ui.separator();

        Self::show_prompts(ui, state);

        ui.separator();

        Self::show_control_buttons(ui, state);

        ui.separator();

        ui.collapsing("Settings", |ui| {
            Self::show_settings(ui, state, &self.manifest);
        });

        ui.collapsing("Output", |ui| {
            Self::show_output(ui, state);
        });
    }

    fn show_prompts(ui: &mut egui::Ui, state: &mut AppState) {
        ui.label("Prompt:");
        ui.add(egui::TextEdit::multiline(&mut state.prompt).desired_rows(3));

        ui.label("Negative prompt:");
        ui.add(egui::TextEdit::multiline(&mut state.negative_prompt).desired_rows(2));

        ui.small("Edits apply to new children only.");
    }

    fn show_control_buttons(ui: &mut egui::Ui, state: &mut AppState) {
        let idle = !state.is_running;
        let has_population = !state.tiles.is_empty();

        ui.vertical_centered(|ui| {
            let evolve_label = format!("Evolve ({} selected)", state.selection.len());
            if ui
                .add_enabled(idle && has_population, egui::Button::new(evolve_label))
                .on_hover_text("Keep the selected images and breed the rest from them")
                .clicked()
            {
                state.request(UiAction::Evolve);
            }

            ui.horizontal(|ui| {
                if ui.add_enabled(idle, egui::Button::new("Reset")).clicked() {
                    state.request(UiAction::Reset);
                }
                if ui
                    .add_enabled(idle && state.history_len > 0, egui::Button::new("Back"))
                    .clicked()
                {
                    state.request(UiAction::Back);
                }
                if ui
                    .add_enabled(!state.selection.is_empty(), egui::Button::new("Save selected"))
                    .clicked()
                {
                    state.request(UiAction::SaveSelected);
                }
            });
        });
    }

    fn show_settings(ui: &mut egui::Ui, state: &mut AppState, manifest: &ConfigManifest) {
        egui::Grid::new("settings_grid").num_columns(2).show(ui, |ui| {
            Self::setting_row(ui, manifest, "population_size", "Population:", &mut state.population_size_text);
            Self::setting_row(ui, manifest, "steps", "Steps:", &mut state.steps_text);
            Self::setting_row(ui, manifest, "guidance_scale", "Guidance:", &mut state.guidance_text);
            if state.two_phase {
                Self::setting_row(ui, manifest, "refine_steps", "Refine steps:", &mut state.refine_steps_text);
            }
        });
        ui.small("Applied on the next reset.");
    }

    fn setting_row(ui: &mut egui::Ui, manifest: &ConfigManifest, field: &str, label: &str, text: &mut String) {
        let description = manifest.field(field).map(|f| f.description.as_str()).unwrap_or_default();
        ui.label(label).on_hover_text(description);
        ui.text_edit_singleline(text);
        ui.end_row();
    }

    fn show_output(ui: &mut egui::Ui, state: &mut AppState) {
        ui.label(format!("Folder: {}", state.output_dir.display()));
        if ui.button("Choose folder...").clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .set_directory(&state.output_dir)
                .pick_folder()
            {
                state.output_dir = path;
            }
        }
    }
}
