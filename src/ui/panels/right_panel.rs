use crate::engines::generation::GenomeDescriptor;
use crate::ui::state::AppState;

pub struct RightPanel;

impl RightPanel {
    pub fn new() -> Self {
        Self
    }

    pub fn show(&mut self, ui: &mut egui::Ui, state: &AppState) {
        ui.heading("Genome Details");

        ui.separator();

        match state.focused_tile() {
            Some(tile) => Self::show_descriptor(ui, &tile.descriptor),
            None => {
                ui.centered_and_justified(|ui| {
                    ui.label("Click an image to view its parameters");
                });
            }
        }
    }

    fn show_descriptor(ui: &mut egui::Ui, descriptor: &GenomeDescriptor) {
        ui.group(|ui| {
            egui::Grid::new("genome_details").num_columns(2).show(ui, |ui| {
                ui.label("Id:");
                ui.label(descriptor.id.to_string());
                ui.end_row();

                ui.label("Parent:");
                ui.label(
                    descriptor
                        .parent_id
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "founder".to_string()),
                );
                ui.end_row();

                ui.label("Seed:");
                ui.label(descriptor.seed.to_string());
                ui.end_row();

                ui.label("Steps:");
                ui.label(descriptor.num_inference_steps.to_string());
                ui.end_row();

                ui.label("Guidance:");
                ui.label(format!("{:.2}", descriptor.guidance_scale));
                ui.end_row();

                if let Some(refine) = descriptor.refine_steps {
                    ui.label("Refine steps:");
                    ui.label(refine.to_string());
                    ui.end_row();
                }
            });
        });

        ui.separator();

        ui.collapsing("Prompt", |ui| {
            ui.label(&descriptor.prompt);
        });
        if !descriptor.negative_prompt.is_empty() {
            ui.collapsing("Negative prompt", |ui| {
                ui.label(&descriptor.negative_prompt);
            });
        }
    }
}
