mod app;
mod panels;
mod state;
mod widgets;
pub mod services;

pub use app::SdEvolveApp;
pub use state::{AppState, Tile, UiAction};
