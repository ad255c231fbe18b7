//! CLI entry point for galvo-scan.
//!
//! Loads settings and the CSV point source, wires the mock hardware, then
//! runs the orchestrator. With a display (the default) the scan runs on a
//! tokio runtime while the egui viewer occupies the main thread; `--headless`
//! skips the viewer and blocks on the scan directly.
//!
//! ```bash
//! galvo-scan points.csv
//! galvo-scan --config config/galvo.toml --headless --seed 7 points.csv
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use galvo_scan::config::Settings;
use galvo_scan::display::display_channels;
use galvo_scan::error::ScanError;
use galvo_scan::executor::ScanOutcome;
use galvo_scan::hardware::{MockGalvoPair, SimulatedDetector};
use galvo_scan::orchestrator::Orchestrator;
use galvo_scan::path::load_path_file;
use galvo_scan::transform::TransformParams;
use galvo_scan::app;
use mimalloc::MiMalloc;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "galvo-scan")]
#[command(about = "Two-axis galvo scan controller with live heatmap", long_about = None)]
struct Cli {
    /// CSV point source: one `x,y` grid index pair per row.
    points: PathBuf,

    /// Settings file (TOML). Missing file falls back to built-in defaults;
    /// `GALVO_SCAN_*` environment variables override either.
    #[arg(long, default_value = "config/galvo.toml")]
    config: PathBuf,

    /// Run the scan without a viewer window.
    #[arg(long)]
    headless: bool,

    /// Seed the simulated detector for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_from(&cli.config)?;
    settings.validate().map_err(ScanError::Configuration)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.application.log_level)),
        )
        .init();

    let params = TransformParams {
        step_size_deg: settings.optics.step_size_deg,
        voltage_range_v: settings.device.voltage_range_v,
        angle_range_deg: settings.optics.angle_range_deg,
    };
    let path = load_path_file(&cli.points, &params)?;
    info!(points = path.len(), source = %cli.points.display(), "point source loaded");

    let galvo = MockGalvoPair::new();
    let detector_range = settings.detector.sim_min..=settings.detector.sim_max;
    let detector = match cli.seed {
        Some(seed) => SimulatedDetector::with_seed(detector_range, seed),
        None => SimulatedDetector::new(detector_range),
    };

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;

    let report = if cli.headless {
        runtime.block_on(async {
            let mut orchestrator = Orchestrator::new(&galvo, &detector, &settings, None);
            orchestrator.run(&path).await
        })?
    } else {
        let (link, ui) = display_channels();
        let window_size = settings.display.window_size;

        let scan = runtime.spawn(async move {
            let mut orchestrator = Orchestrator::new(&galvo, &detector, &settings, Some(link));
            orchestrator.run(&path).await
        });

        // The viewer owns the main thread until the window closes; dropping
        // its channel ends reads as an exit on the scan side.
        app::run_viewer(ui, window_size).map_err(|e| anyhow!("viewer failed: {e}"))?;

        runtime.block_on(scan).context("scan task panicked")??
    };

    match report.outcome {
        ScanOutcome::Completed => info!("run complete"),
        ScanOutcome::Aborted => info!("run aborted by user"),
    }
    if let Some(peak) = report.buffer.cells().iter().copied().max() {
        info!(peak, "intensity summary");
    }

    Ok(())
}
