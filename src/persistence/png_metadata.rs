use super::Persistence;
use crate::engines::generation::GenomeDescriptor;
use crate::error::EvolverError;
use crate::types::Image;
use chrono::Local;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// iTXt keyword holding the full descriptor as JSON.
pub const GENOME_KEYWORD: &str = "sdevolve:genome";

/// Writes PNGs whose text chunks carry the genome descriptor.
pub struct ImageSaver {
    output_dir: PathBuf,
}

impl ImageSaver {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn file_name(descriptor: &GenomeDescriptor) -> String {
        format!(
            "{}_g{}_{}.png",
            Local::now().format("%Y%m%d-%H%M%S"),
            descriptor.generation,
            descriptor.id
        )
    }

    /// Human-readable chunks alongside the JSON one.
    fn text_chunks(descriptor: &GenomeDescriptor) -> Result<Vec<(String, String)>, EvolverError> {
        let mut chunks = vec![
            (GENOME_KEYWORD.to_string(), serde_json::to_string(descriptor)?),
            ("prompt".to_string(), descriptor.prompt.clone()),
            ("negative_prompt".to_string(), descriptor.negative_prompt.clone()),
            ("seed".to_string(), descriptor.seed.to_string()),
            ("steps".to_string(), descriptor.num_inference_steps.to_string()),
            ("guidance_scale".to_string(), descriptor.guidance_scale.to_string()),
            ("genome_id".to_string(), descriptor.id.to_string()),
            ("generation".to_string(), descriptor.generation.to_string()),
            ("Software".to_string(), format!("sdevolve {}", env!("CARGO_PKG_VERSION"))),
        ];
        if let Some(parent) = descriptor.parent_id {
            chunks.push(("parent_id".to_string(), parent.to_string()));
        }
        if let Some(refine) = descriptor.refine_steps {
            chunks.push(("refine_steps".to_string(), refine.to_string()));
        }
        Ok(chunks)
    }

    pub fn save_to(path: &Path, image: &Image, descriptor: &GenomeDescriptor) -> Result<(), EvolverError> {
        let writer = BufWriter::new(File::create(path)?);
        let mut encoder = png::Encoder::new(writer, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        for (keyword, text) in Self::text_chunks(descriptor)? {
            encoder.add_itxt_chunk(keyword, text)?;
        }

        let mut writer = encoder.write_header()?;
        writer.write_image_data(image.pixels())?;
        writer.finish()?;
        Ok(())
    }
}

impl Persistence for ImageSaver {
    fn save(&mut self, image: &Image, descriptor: &GenomeDescriptor) -> Result<PathBuf, EvolverError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(Self::file_name(descriptor));
        Self::save_to(&path, image, descriptor)?;
        log::info!("Saved genome {} to {}", descriptor.id, path.display());
        Ok(path)
    }
}

/// Every text chunk of a PNG, in file order per chunk type.
pub fn read_metadata(path: &Path) -> Result<Vec<(String, String)>, EvolverError> {
    let decoder = png::Decoder::new(BufReader::new(File::open(path)?));
    let reader = decoder.read_info()?;
    let info = reader.info();

    let mut chunks = Vec::new();
    for chunk in &info.uncompressed_latin1_text {
        chunks.push((chunk.keyword.clone(), chunk.text.clone()));
    }
    for chunk in &info.compressed_latin1_text {
        chunks.push((chunk.keyword.clone(), chunk.get_text()?));
    }
    for chunk in &info.utf8_text {
        chunks.push((chunk.keyword.clone(), chunk.get_text()?));
    }
    Ok(chunks)
}

/// Rebuild the descriptor embedded by [`ImageSaver`].
pub fn read_descriptor(path: &Path) -> Result<GenomeDescriptor, EvolverError> {
    let json = read_metadata(path)?
        .into_iter()
        .find(|(keyword, _)| keyword == GENOME_KEYWORD)
        .map(|(_, text)| text)
        .ok_or_else(|| EvolverError::MissingMetadata(format!("{} has no {} chunk", path.display(), GENOME_KEYWORD)))?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::GenomeId;

    fn descriptor() -> GenomeDescriptor {
        GenomeDescriptor {
            id: GenomeId(5),
            parent_id: Some(GenomeId(1)),
            prompt: "a fox in the snow, ünïcödé".to_string(),
            negative_prompt: "watermark".to_string(),
            seed: 12_345_678_901,
            num_inference_steps: 23,
            guidance_scale: 6.75,
            refine_steps: Some(18),
            generation: 2,
        }
    }

    fn image() -> Image {
        Image::from_rgba(2, 2, (0..16).collect()).unwrap()
    }

    #[test]
    fn test_saved_png_carries_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let mut saver = ImageSaver::new(dir.path().join("nested"));

        let path = saver.save(&image(), &descriptor()).unwrap();

        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().ends_with("_g2_5.png"));
        assert_eq!(read_descriptor(&path).unwrap(), descriptor());

        let chunks = read_metadata(&path).unwrap();
        assert!(chunks.contains(&("seed".to_string(), "12345678901".to_string())));
        assert!(chunks.contains(&("parent_id".to_string(), "1".to_string())));
        assert!(chunks.contains(&("refine_steps".to_string(), "18".to_string())));
    }

    #[test]
    fn test_saved_pixels_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixels.png");
        ImageSaver::save_to(&path, &image(), &descriptor()).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(Image::from(decoded), image());
    }

    #[test]
    fn test_missing_descriptor_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.png");
        image().as_rgba().save(&path).unwrap();

        assert!(matches!(read_descriptor(&path), Err(EvolverError::MissingMetadata(_))));
    }
}
