mod animation;
mod config;
mod droplet;
mod error;
mod export;
mod fire;
mod grid;
mod observer;
mod presets;
mod runner;
mod settings;
mod sweep;

use animation::{GifRecorder, Palette, RecorderOptions};
use clap::Parser;
use config::AppConfig;
use error::Error;
use export::{format_table, write_json_report, CsvTableWriter};
use grid::GridSize;
use observer::NoopObserver;
use presets::{Preset, PresetManager};
use runner::ModelKind;
use settings::{ModelChoice, SweepSettings};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use sweep::{run_sweep, SweepTable, TableSink};

#[derive(Parser, Debug)]
#[command(name = "percolation-sim")]
#[command(about = "Monte-Carlo percolation sweeps for droplet and fire spread models")]
struct Args {
    // === Model ===
    /// Model to run (droplet, fire)
    #[arg(short = 'm', long)]
    model: Option<String>,

    /// Chance a tree next to the fire ignites (0-1], enables the stochastic fire rule
    #[arg(short = 'f', long = "ignition-probability")]
    ignition_probability: Option<f64>,

    // === Grid ===
    /// Square grid sizes to compare (comma separated)
    #[arg(long, value_delimiter = ',')]
    size: Vec<usize>,

    /// Grid height (use with --width for a rectangular grid)
    #[arg(long, requires = "width")]
    height: Option<usize>,

    /// Grid width
    #[arg(long, requires = "height")]
    width: Option<usize>,

    // === Sweep ===
    /// Replication counts to compare (comma separated)
    #[arg(short = 'n', long, value_delimiter = ',')]
    nrep: Vec<u32>,

    /// Highest density in the sweep (0-1)
    #[arg(long)]
    start: Option<f64>,

    /// Lowest density in the sweep, inclusive (0-1)
    #[arg(long)]
    stop: Option<f64>,

    /// Density decrement (0.01-1)
    #[arg(long)]
    step: Option<f64>,

    /// RNG seed for a reproducible sweep
    #[arg(long)]
    seed: Option<u64>,

    // === Animation ===
    /// Record trials as GIF animations
    #[arg(long)]
    animate: bool,

    /// Animation output path
    #[arg(long, default_value = "percolation.gif")]
    gif: PathBuf,

    /// Write all frames to one GIF instead of one per density
    #[arg(long = "single-gif")]
    single_gif: bool,

    /// Delay between frames in milliseconds
    #[arg(long = "frame-delay")]
    frame_delay: Option<u32>,

    /// Maximum number of frames recorded
    #[arg(long = "max-frames")]
    max_frames: Option<usize>,

    /// Pixels per cell in the animation (1-32)
    #[arg(long)]
    scale: Option<u32>,

    // === Output ===
    /// Write every table row to a CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the full report as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    // === Config and presets ===
    /// Load settings from a config file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Save the resolved settings to a config file
    #[arg(long = "save-config")]
    save_config: Option<PathBuf>,

    /// Start from a named preset
    #[arg(short = 'p', long)]
    preset: Option<String>,

    /// List available presets and exit
    #[arg(long = "list-presets")]
    list_presets: bool,

    /// Save the resolved settings as a user preset
    #[arg(long = "save-preset")]
    save_preset: Option<String>,

    /// Delete a user preset and exit
    #[arg(long = "delete-preset")]
    delete_preset: Option<String>,
}

fn parse_model(s: &str) -> Option<ModelChoice> {
    match s.to_lowercase().as_str() {
        "droplet" | "drop" | "water" => Some(ModelChoice::Droplet),
        "fire" | "forest" | "forest-fire" => Some(ModelChoice::Fire),
        _ => None,
    }
}

/// Command line values override whatever the preset or config file set
fn apply_args(settings: &mut SweepSettings, args: &Args) -> Result<(), Error> {
    // Apply model settings
    if let Some(model) = &args.model {
        settings.model = parse_model(model)
            .ok_or_else(|| Error::invalid("model", format!("unknown model '{model}'")))?;
    }
    if let Some(f) = args.ignition_probability {
        settings.ignition_probability = Some(f);
    }

    // Apply grid settings
    if let (Some(height), Some(width)) = (args.height, args.width) {
        settings.sizes = vec![GridSize::new(height, width)];
    } else if !args.size.is_empty() {
        settings.sizes = args.size.iter().map(|&n| GridSize::square(n)).collect();
    }

    // Apply sweep settings
    if !args.nrep.is_empty() {
        settings.replications = args.nrep.clone();
    }
    if let Some(start) = args.start {
        settings.density_start = start;
    }
    if let Some(stop) = args.stop {
        settings.density_stop = stop;
    }
    if let Some(step) = args.step {
        settings.density_step = step;
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }

    // Apply animation settings
    if args.animate {
        settings.animate = true;
    }
    if args.single_gif {
        settings.separate_animations = false;
    }
    if let Some(delay) = args.frame_delay {
        settings.frame_delay_ms = delay;
    }
    if let Some(max_frames) = args.max_frames {
        settings.max_frames = max_frames;
    }
    if let Some(scale) = args.scale {
        settings.cell_scale = scale.clamp(1, 32);
    }
    Ok(())
}

/// Prints each table as it completes and mirrors it to the CSV file
struct ReportSink {
    csv: Option<CsvTableWriter<BufWriter<File>>>,
}

impl TableSink for ReportSink {
    fn table_ready(&mut self, model: &ModelKind, table: &SweepTable) -> error::Result<()> {
        println!("{}", format_table(model, table));
        if let Some(csv) = self.csv.as_mut() {
            csv.table_ready(model, table)?;
        }
        Ok(())
    }
}

fn list_presets(presets: &PresetManager) {
    println!("Built-in presets:");
    for preset in &presets.built_in {
        println!("  {:<24} {}", preset.name, preset.description);
    }
    if !presets.saved.is_empty() {
        println!("Saved presets:");
        for preset in &presets.saved {
            println!("  {:<24} {}", preset.name, preset.description);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut presets = PresetManager::new();

    if args.list_presets {
        list_presets(&presets);
        return Ok(());
    }

    if let Some(name) = &args.delete_preset {
        presets.delete_preset(name)?;
        log::info!("Deleted preset '{}'", name);
        return Ok(());
    }

    // Resolve settings: defaults, then preset, then config file, then flags
    let mut settings = match &args.preset {
        Some(name) => {
            let preset = presets.find(name).ok_or_else(|| {
                Error::Preset(format!(
                    "unknown preset '{}' (available: {})",
                    name,
                    presets.names().join(", ")
                ))
            })?;
            log::info!("Using preset '{}'", preset.name);
            preset.settings.clone()
        }
        None => SweepSettings::default(),
    };

    if let Some(path) = &args.config {
        let config = AppConfig::load_from_file(path)?;
        log::info!("Loaded config version {} from {}", config.version, path.display());
        settings = config.settings;
    }

    apply_args(&mut settings, &args)?;

    if let Some(path) = &args.save_config {
        AppConfig::new(settings.clone()).save_to_file(path)?;
        log::info!("Saved config to {}", path.display());
    }

    if let Some(name) = &args.save_preset {
        presets.save_preset(Preset::new(
            name.as_str(),
            "Saved from the command line",
            settings.clone(),
        ))?;
        log::info!("Saved preset '{}'", name);
    }

    let config = settings.to_sweep_config();
    let [empty, occupied, active] = settings.model.cell_labels();
    log::debug!(
        "{} model cells: empty={}, occupied={}, active={}",
        settings.model.name(),
        empty,
        occupied,
        active
    );

    let mut sink = ReportSink {
        csv: match &args.csv {
            Some(path) => Some(CsvTableWriter::create(path)?),
            None => None,
        },
    };

    let mut recorder = settings.animate.then(|| {
        GifRecorder::new(
            args.gif.clone(),
            Palette::for_model(&config.model),
            RecorderOptions::from_settings(&settings),
        )
    });

    let report = match recorder.as_mut() {
        Some(recorder) => run_sweep(&config, recorder, &mut sink)?,
        None => run_sweep(&config, &mut NoopObserver, &mut sink)?,
    };

    println!("Seed: {}", report.seed);

    if let Some(csv) = sink.csv.take() {
        csv.into_inner()?;
    }
    if let Some(path) = &args.csv {
        log::info!("Wrote CSV to {}", path.display());
    }

    if let Some(path) = &args.json {
        write_json_report(path, &report)?;
        log::info!("Wrote report to {}", path.display());
    }

    if let Some(recorder) = recorder {
        let files = recorder.finish()?;
        if files.is_empty() {
            log::warn!("No animation frames were recorded");
        }
    }

    Ok(())
}
