use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;

use geocooc::results::{distinct_pairs, read_results};
use geocooc::{reader, AnalysisConfig, AnalysisDriver, CancellationToken, RelationshipSets, ResultWriter};

#[derive(Parser, Debug)]
#[command(version, about = "Find spatially attracted and repulsed bigrams in geotagged texts", long_about = None)]
struct Args {
    /// Also write log output to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Test every frequent bigram of the training corpus and write K scores
    Analyze {
        /// Grid file: id, latmin, lonmin, latmax, lonmax (SW cell first, NE cell last)
        #[arg(long)]
        grid: PathBuf,
        /// Document file: id, lat, lon, space-separated tokens
        #[arg(long)]
        documents: PathBuf,
        /// Result file, truncated and then appended one line per bigram
        #[arg(short, long)]
        output: PathBuf,
        /// JSON file with analysis parameters
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        edge_correction: Option<bool>,
        #[arg(long)]
        significance_range: Option<f64>,
        #[arg(long)]
        simulations: Option<usize>,
        #[arg(long, help = "Neighbour search distance in kilometers")]
        delta_km: Option<f64>,
        #[arg(long)]
        min_term_frequency: Option<usize>,
        #[arg(long, help = "Evaluate Monte Carlo draws on a single thread")]
        serial: bool,
        #[arg(long, help = "Stop after this many seconds, keeping results written so far")]
        max_runtime_secs: Option<u64>,
        #[arg(long, help = "Write run totals as JSON to this file")]
        summary: Option<PathBuf>,
    },
    /// Count attraction and repulsion bigrams in a result file
    Summarize {
        results: PathBuf,
        #[arg(short, long, help = "Print the partners of this primary token")]
        token: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    match args.command {
        Command::Analyze {
            grid,
            documents,
            output,
            config,
            edge_correction,
            significance_range,
            simulations,
            delta_km,
            min_term_frequency,
            serial,
            max_runtime_secs,
            summary,
        } => {
            let mut config = match config {
                Some(path) => AnalysisConfig::from_file(&path)?,
                None => AnalysisConfig::default(),
            };
            if let Some(value) = edge_correction {
                config.edge_correction = value;
            }
            if let Some(value) = significance_range {
                config.significance_range = value;
            }
            if let Some(value) = simulations {
                config.simulation_count = value;
            }
            if let Some(value) = delta_km {
                config.delta_distance_km = value;
            }
            if let Some(value) = min_term_frequency {
                config.min_term_frequency = value;
            }
            if serial {
                config.parallel = false;
            }
            if max_runtime_secs.is_some() {
                config.max_runtime_secs = max_runtime_secs;
            }
            config.validate()?;
            analyze(&config, &grid, &documents, &output, summary.as_deref())
        }
        Command::Summarize { results, token } => summarize(&results, token.as_deref()),
    }
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn analyze(
    config: &AnalysisConfig,
    grid: &Path,
    documents: &Path,
    output: &Path,
    summary_path: Option<&Path>,
) -> anyhow::Result<()> {
    let grid = reader::read_grid(grid).context("loading grid")?;
    let documents = reader::read_documents(documents).context("loading documents")?;
    info!("Loaded {} grid cells and {} documents", grid.cells().len(), documents.len());

    let driver = AnalysisDriver::new(config, &grid, &documents)?;
    let mut writer = ResultWriter::create(output)?;
    let summary = driver.run(&mut writer, &CancellationToken::new())?;

    info!(
        "Wrote {} results to {} ({} not significant)",
        writer.written(),
        output.display(),
        summary.not_significant
    );

    if let Some(path) = summary_path {
        let file = File::create(path).with_context(|| format!("creating summary file {}", path.display()))?;
        serde_json::to_writer_pretty(file, &summary).context("writing summary")?;
        info!("Wrote run summary to {}", path.display());
    }
    Ok(())
}

fn summarize(path: &Path, token: Option<&str>) -> anyhow::Result<()> {
    let results = read_results(path).with_context(|| format!("reading {}", path.display()))?;
    let sets = RelationshipSets::from_results(&results);

    println!("Results: {}", results.len());
    println!("Distinct bigrams: {}", distinct_pairs(&results).len());
    println!(
        "Attractions: {} over {} primary tokens",
        sets.attractions.values().map(|s| s.len()).sum::<usize>(),
        sets.attractions.len()
    );
    println!(
        "Repulsions: {} over {} primary tokens",
        sets.repulsions.values().map(|s| s.len()).sum::<usize>(),
        sets.repulsions.len()
    );

    if let Some(token) = token {
        for (label, partners) in [("attracted", sets.attracted(token)), ("repulsed", sets.repulsed(token))] {
            let mut keys: Vec<String> = partners
                .map(|set| set.iter().map(|k| k.to_string()).collect())
                .unwrap_or_default();
            keys.sort();
            println!("{} {}: {}", token, label, keys.join(", "));
        }
    }
    Ok(())
}
