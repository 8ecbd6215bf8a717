use anyhow::Context;
use clap::Parser;
use sdevolve::persistence::{read_descriptor, read_metadata, GENOME_KEYWORD};
use std::path::PathBuf;

/// Print the text metadata stored in a PNG
#[derive(Parser)]
#[command(name = "png-metadata")]
#[command(version)]
struct Cli {
    image_path: PathBuf,

    /// Only print the embedded genome, as pretty JSON
    #[arg(long)]
    genome: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if cli.genome {
        let descriptor = read_descriptor(&cli.image_path)
            .with_context(|| format!("reading genome from {}", cli.image_path.display()))?;
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(());
    }

    let chunks = read_metadata(&cli.image_path)
        .with_context(|| format!("reading {}", cli.image_path.display()))?;
    if chunks.is_empty() {
        println!("No text metadata in {}", cli.image_path.display());
        return Ok(());
    }

    for (keyword, text) in chunks.iter().filter(|(k, _)| k != GENOME_KEYWORD) {
        println!("{}: {}", keyword, text);
    }
    if let Some((_, json)) = chunks.iter().find(|(k, _)| k == GENOME_KEYWORD) {
        println!("{}: {}", GENOME_KEYWORD, json);
    }
    Ok(())
}
