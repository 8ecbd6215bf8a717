pub mod image_grid;

pub use image_grid::ImageGrid;
