pub mod config;
pub mod engines;
pub mod error;
pub mod persistence;
pub mod types;
pub mod ui;

pub use error::{EvolverError, Result};
pub use types::{Image, Latents};
