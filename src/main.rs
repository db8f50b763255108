mod app;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use eframe::egui;

use simview::builder::demo_scene;
use simview::net::SimulationSource;
use simview::ViewerConfig;

use app::ViewerApp;

/// Batched simulation playback viewer
#[derive(Parser)]
#[command(name = "simview", version, long_about = None)]
struct Cli {
    /// JSON config file (missing keys keep their defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Playback speed multiplier
    #[arg(long, global = true)]
    speed: Option<f64>,

    /// Recording format: png, jpeg or gif
    #[arg(long, global = true)]
    record_format: Option<String>,

    /// Directory recordings are written to
    #[arg(long, global = true)]
    record_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a recording file or a simulation server
    View {
        /// Path to a `{"model", "states"}` JSON file, or an http(s) base URL
        #[arg(name = "SOURCE")]
        source: String,
    },

    /// Write the two-batch demo recording
    Demo {
        #[arg(name = "OUT", default_value = "example_sim.json")]
        out: PathBuf,
    },
}

fn load_config(cli: &Cli) -> simview::Result<ViewerConfig> {
    let mut cfg = match &cli.config {
        Some(path) => ViewerConfig::from_file(path)?,
        None => ViewerConfig::default(),
    }
    .with_env_overrides();
    if let Some(speed) = cli.speed {
        cfg = cfg.with_playback_speed(speed);
    }
    if let Some(kind) = &cli.record_format {
        cfg = cfg.with_recording_format(kind.clone());
    }
    if let Some(dir) = &cli.record_dir {
        cfg = cfg.with_recording_dir(dir.clone());
    }
    Ok(cfg)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Demo { out } => {
            demo_scene()?.save(&out)?;
            println!("Simulation saved to {}", out.display());
            Ok(())
        }
        Commands::View { source } => {
            let source = SimulationSource::parse(&source)?;
            let timeout = Duration::from_secs(config.request_timeout_secs);
            let options = eframe::NativeOptions {
                viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
                ..Default::default()
            };
            let title = format!("simview: {}", source);
            eframe::run_native(
                &title,
                options,
                Box::new(move |cc| Ok(Box::new(ViewerApp::new(cc, config, source, timeout)))),
            )?;
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("simview: {}", e);
            ExitCode::FAILURE
        }
    }
}
