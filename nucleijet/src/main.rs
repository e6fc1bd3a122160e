use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use nucleijet::analysis::config::AnalysisConfig;
use nucleijet::analysis::task::{AnalysisTask, Mode};
use nucleijet::calib::lookup::Calibrations;
use nucleijet::calib::store::{CalibrationStore, FileCalibrationStore};
use nucleijet::data::source::{EventSource, JsonLinesSource};
use nucleijet::runner::{Runner, DEFAULT_CHUNK_SIZE};

/// Antinuclei in jets: per-event jet finding and (anti)nuclei spectra in jets and
/// in the underlying event.
#[derive(Parser, Debug)]
#[command(name = "nucleijet", version, about)]
struct Args {
    /// Events as JSON lines, one collision per line
    #[arg(long)]
    events: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override a configuration option, e.g. --set minJetPt=5 (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Directory with calibration objects; replaces both configured URLs
    #[arg(long)]
    calibration_dir: Option<PathBuf>,

    /// Output file for the merged histogram registries
    #[arg(long, default_value = "AnalysisResults.json")]
    output: PathBuf,

    /// Worker threads, 0 for one per core
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Events per work unit
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
}

fn open_store(url: &str, override_dir: Option<&PathBuf>) -> Option<FileCalibrationStore> {
    if let Some(dir) = override_dir {
        return Some(FileCalibrationStore::new(dir));
    }
    match FileCalibrationStore::from_url(url) {
        Ok(store) => Some(store),
        Err(e) => {
            log::error!("calibration store unavailable: {}", e);
            None
        }
    }
}

fn load_config(args: &Args) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    for assignment in &args.overrides {
        config.apply_override(assignment).with_context(|| format!("applying --set {}", assignment))?;
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = load_config(&args)?;
    let modes = Mode::enabled(&config.modes);
    if modes.is_empty() {
        log::warn!("no execution mode enabled, nothing to do");
    }

    let calibration = &config.calibration;
    let weights_store = calibration
        .apply_reweighting
        .then(|| open_store(&calibration.url_to_ccdb, args.calibration_dir.as_ref()))
        .flatten();
    let unfolding_store = calibration
        .apply_pt_unfolding
        .then(|| open_store(&calibration.url_to_ccdb_pt_unfolding, args.calibration_dir.as_ref()))
        .flatten();
    let calibrations = Calibrations::load(
        calibration,
        weights_store.as_ref().map(|s| s as &dyn CalibrationStore),
        unfolding_store.as_ref().map(|s| s as &dyn CalibrationStore),
    );

    let mut source: Box<dyn EventSource> = Box::new(
        JsonLinesSource::open(&args.events).with_context(|| format!("opening {}", args.events.display()))?,
    );
    let events = source
        .read_all()
        .with_context(|| format!("reading events from {}", args.events.display()))?;
    log::info!("read {} events from {}", events.len(), args.events.display());

    let task = AnalysisTask::new(&config, Arc::new(calibrations));
    let runner = Runner::new(task, modes).with_threads(args.threads).with_chunk_size(args.chunk_size);
    let registries = runner.run(&events)?;

    let file = File::create(&args.output).with_context(|| format!("creating {}", args.output.display()))?;
    serde_json::to_writer(BufWriter::new(file), &registries)
        .with_context(|| format!("writing {}", args.output.display()))?;
    log::info!("results written to {}", args.output.display());

    Ok(())
}
