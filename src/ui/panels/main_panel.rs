use crate::ui::state::AppState;
use crate::ui::widgets::ImageGrid;

pub struct MainPanel;

impl MainPanel {
    pub fn new() -> Self {
        Self
    }

    pub fn show(&mut self, ui: &mut egui::Ui, state: &mut AppState) {
        ui.horizontal(|ui| {
            ui.heading(format!("Generation {}", state.generation));
            if state.history_len > 0 {
                ui.label(format!("({} back)", state.history_len));
            }
        });

        if state.is_running {
            ui.add(egui::ProgressBar::new(state.progress_percentage).show_percentage());
        }
        ui.label(&state.status_message);

        ui.separator();

        if state.tiles.is_empty() {
            ui.centered_and_justified(|ui| {
                if state.is_running {
                    ui.spinner();
                } else {
                    ui.label("No population yet. Enter a prompt and click 'Reset'.");
                }
            });
        } else {
            egui::ScrollArea::both().show(ui, |ui| {
                ImageGrid::show(ui, state);
            });
        }
    }
}
