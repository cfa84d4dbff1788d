use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ooi_explorer::config::{DEFAULT_CONFIG_FILE, ExplorerConfig};
use ooi_explorer::data::export::write_flags_csv;
use ooi_explorer::data::filter::find_samples;
use ooi_explorer::data::loader::{load_bottle_samples, load_file};
use ooi_explorer::data::record::{Instrument, attach_quality_flags};
use ooi_explorer::qc::flag_counts;

/// Run QARTOD quality checks over an OOI SAMI dataset
#[derive(Parser, Debug)]
#[command(name = "ooi-qc", version, about)]
struct Cli {
    /// Dataset to check (.parquet, .json or .csv)
    input: PathBuf,

    /// Instrument type; guessed from the dataset's variables when omitted
    #[arg(short, long, value_enum)]
    instrument: Option<Instrument>,

    /// Write `time,<flag>` rows to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, env = "OOI_EXPLORER_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Discrete sample summary to match against the configured site
    #[arg(long)]
    samples: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = ExplorerConfig::load_or_default(&cli.config)?;

    let mut ds = load_file(&cli.input)
        .with_context(|| format!("loading {}", cli.input.display()))?;
    let instrument = match cli.instrument {
        Some(instrument) => instrument,
        None => Instrument::detect(&ds).with_context(|| {
            format!("cannot tell the instrument of '{}'; pass --instrument", ds.id)
        })?,
    };

    let flags = attach_quality_flags(&mut ds, instrument)
        .with_context(|| format!("{instrument} checks on '{}'", ds.id))?;

    println!("{} ({instrument}): {} samples", ds.id, ds.len());
    for (flag, n) in flag_counts(&flags) {
        let share = 100.0 * n as f64 / flags.len() as f64;
        println!("  {:<34} {n:>8}  {share:5.1}%", flag.to_string());
    }

    if let Some(path) = &cli.output {
        write_flags_csv(path, &ds, instrument.flag_variable(), &flags)?;
        println!("Flags written to {}", path.display());
    }

    if let Some(path) = &cli.samples {
        let samples = load_bottle_samples(path)?;
        let site = &config.site;
        let matched = find_samples(
            &samples,
            site.buoy(),
            site.depth,
            site.max_distance_km,
            site.depth_tolerance,
        );
        println!(
            "{} of {} discrete samples within {} km and {} ± {} m of the buoy",
            matched.len(),
            samples.len(),
            site.max_distance_km,
            site.depth,
            site.depth_tolerance
        );
    }
    Ok(())
}
