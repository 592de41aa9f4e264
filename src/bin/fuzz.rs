//! Self-checking test program generator
//!
//! Writes a C++ program of independent check blocks comparing the library's
//! arithmetic against oracle-computed literals.

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fs::File;
use std::io::BufWriter;
use tracing_subscriber::EnvFilter;
use widecheck::{ProgramGenerator, WidecheckConfig};

#[derive(Parser)]
#[command(name = "widecheck-fuzz")]
#[command(about = "Generate a self-checking wide-integer test program")]
struct Args {
    /// Output file path
    #[arg(short, long)]
    output: Option<String>,

    /// Number of check blocks per bit width
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Bit width to exercise (repeatable)
    #[arg(long = "bits")]
    widths: Vec<u32>,

    /// Random seed for reproducible output
    #[arg(short, long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = WidecheckConfig::load_from_cwd().context("Failed to load widecheck.toml")?;

    let output = args.output.unwrap_or(config.fuzz.output);
    let count = args.count.unwrap_or(config.fuzz.count);
    let widths = if args.widths.is_empty() {
        config.fuzz.widths
    } else {
        args.widths
    };

    let mut rng = match args.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let generator = ProgramGenerator::new(&widths)?;
    let file = File::create(&output).with_context(|| format!("Failed to create {}", output))?;
    let mut writer = BufWriter::new(file);

    let written = generator.write_program(&mut writer, &mut rng, count)?;
    tracing::info!(output = %output, blocks = written, widths = ?widths, "wrote test program");
    Ok(())
}
