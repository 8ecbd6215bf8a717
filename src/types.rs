use image::{Rgb32FImage, RgbaImage};
use std::fmt;
use std::sync::Arc;

/// Rendered phenotype, an RGBA8 buffer.
///
/// The buffer is shared, so cloning an image (into history snapshots,
/// the viewer, the saver) never copies pixels.
#[derive(Clone)]
pub struct Image(Arc<RgbaImage>);

impl Image {
    /// Returns `None` when the buffer length does not match `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, pixels).map(Self::from)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn pixels(&self) -> &[u8] {
        self.0.as_raw()
    }

    pub fn size(&self) -> [usize; 2] {
        [self.width() as usize, self.height() as usize]
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.0
    }

    /// True when both images point at the same pixel buffer.
    pub fn shares_buffer(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<RgbaImage> for Image {
    fn from(buffer: RgbaImage) -> Self {
        Self(Arc::new(buffer))
    }
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.shares_buffer(other)
            || (self.0.dimensions() == other.0.dimensions() && self.pixels() == other.pixels())
    }
}

impl Eq for Image {}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

/// Intermediate output of a base pass, consumed by the refinement pass.
///
/// Three float channels at latent resolution.
#[derive(Clone)]
pub struct Latents(Arc<Rgb32FImage>);

impl Latents {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        Rgb32FImage::from_raw(width, height, data).map(Self::from)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn data(&self) -> &[f32] {
        self.0.as_raw()
    }

    pub fn as_buffer(&self) -> &Rgb32FImage {
        &self.0
    }
}

impl From<Rgb32FImage> for Latents {
    fn from(buffer: Rgb32FImage) -> Self {
        Self(Arc::new(buffer))
    }
}

impl fmt::Debug for Latents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Latents")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}
