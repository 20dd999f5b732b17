use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

/// Keep an evenly spaced share of a document file, e.g. to try parameters
/// on a smaller corpus before a full analysis run.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    input: PathBuf,
    output: PathBuf,
    /// Percentage of documents to keep, in (0, 100]
    sample_percentage: f64,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if !(args.sample_percentage > 0.0 && args.sample_percentage <= 100.0) {
        bail!("sample percentage must be in (0, 100], got {}", args.sample_percentage);
    }

    let reader = BufReader::new(
        File::open(&args.input).with_context(|| format!("opening {}", args.input.display()))?,
    );
    let lines: Vec<String> = reader
        .lines()
        .collect::<Result<_, _>>()
        .with_context(|| format!("reading {}", args.input.display()))?;
    let documents: Vec<&String> = lines.iter().filter(|l| !l.trim().is_empty()).collect();

    let sample_size = (documents.len() as f64 * args.sample_percentage / 100.0) as usize;
    let step = (if sample_size > 0 { documents.len() / sample_size } else { 1 }).max(1);
    log::info!(
        "Sampling {}% of {} documents from {}: every {}th",
        args.sample_percentage,
        documents.len(),
        args.input.display(),
        step
    );

    let mut writer = BufWriter::new(
        File::create(&args.output).with_context(|| format!("creating {}", args.output.display()))?,
    );
    let mut sampled = 0;
    for line in documents.iter().step_by(step) {
        writeln!(writer, "{}", line)?;
        sampled += 1;
    }
    writer.flush()?;

    log::info!("Wrote {} documents to {}", sampled, args.output.display());
    Ok(())
}
