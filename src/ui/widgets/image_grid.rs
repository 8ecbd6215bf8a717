use crate::ui::state::AppState;
use egui::load::SizedTexture;

const SPACING: f32 = 6.0;

/// Square-ish grid of the current population. Clicking a tile toggles its
/// selection; the pick order is drawn in the tile's corner.
pub struct ImageGrid;

impl ImageGrid {
    pub fn columns(count: usize) -> usize {
        ((count as f64).sqrt().ceil() as usize).max(1)
    }

    pub fn show(ui: &mut egui::Ui, state: &mut AppState) {
        Self::upload_textures(ui.ctx(), state);

        let count = state.tiles.len();
        let columns = Self::columns(count);
        let rows = count.div_ceil(columns);
        let available = ui.available_size();
        let side = ((available.x - SPACING * columns as f32) / columns as f32)
            .min((available.y - SPACING * rows as f32) / rows as f32)
            .max(32.0);

        let mut clicked = None;
        egui::Grid::new("image_grid")
            .spacing([SPACING, SPACING])
            .show(ui, |ui| {
                for (index, tile) in state.tiles.iter().enumerate() {
                    let Some(texture) = &tile.texture else {
                        ui.spinner();
                        continue;
                    };
                    let rank = state.selection_rank(index);
                    let image = egui::Image::from_texture(SizedTexture::new(texture.id(), [side, side]));
                    let response = ui
                        .add(egui::Button::image(image).selected(rank.is_some()))
                        .on_hover_text(format!("Genome {}", tile.descriptor.id));

                    if let Some(rank) = rank {
                        ui.painter().text(
                            response.rect.left_top() + egui::vec2(8.0, 6.0),
                            egui::Align2::LEFT_TOP,
                            rank.to_string(),
                            egui::FontId::proportional(20.0),
                            egui::Color32::YELLOW,
                        );
                    }
                    if response.clicked() {
                        clicked = Some(index);
                    }
                    if (index + 1) % columns == 0 {
                        ui.end_row();
                    }
                }
            });

        if let Some(index) = clicked {
            state.toggle_selection(index);
        }
    }

    fn upload_textures(ctx: &egui::Context, state: &mut AppState) {
        for tile in state.tiles.iter_mut().filter(|t| t.texture.is_none()) {
            let pixels = egui::ColorImage::from_rgba_unmultiplied(tile.image.size(), tile.image.pixels());
            tile.texture = Some(ctx.load_texture(
                format!("genome-{}", tile.descriptor.id),
                pixels,
                egui::TextureOptions::LINEAR,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns() {
        assert_eq!(ImageGrid::columns(0), 1);
        assert_eq!(ImageGrid::columns(1), 1);
        assert_eq!(ImageGrid::columns(9), 3);
        assert_eq!(ImageGrid::columns(10), 4);
    }
}
