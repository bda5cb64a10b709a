mod capture;
mod overlay;

use anyhow::Context;
use capture::VideoFrameSource;
use clap::Parser;
use opencv::{
    core::Size,
    highgui,
    prelude::*,
    videoio::VideoWriter,
};
use spot_vision::{DetectorConfig, SpotDetector, load_regions};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const WINDOW_NAME: &str = "Parking Lot Status";

#[derive(Parser, Debug)]
#[command(name = "spot_tester", about = "Parking spot occupancy over a video file")]
struct Args {
    /// Video file to detect occupancy on.
    #[arg(long)]
    video: String,

    /// Region file: a YAML list of `{id, coordinates}` records.
    #[arg(long)]
    data: PathBuf,

    /// Frame to start from.
    #[arg(long, default_value_t = 1)]
    start_frame: u64,

    /// Override the edge energy threshold.
    #[arg(long)]
    threshold: Option<f64>,

    /// Write the annotated video to this path.
    #[arg(long)]
    output: Option<String>,

    /// Show the annotated video in a window; `q` quits.
    #[arg(long)]
    display: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // --- 1. Argument Parsing & Setup ---
    let args = Args::parse();
    let regions = load_regions(&args.data)
        .with_context(|| format!("Failed to load regions from {}", args.data.display()))?;
    let mut config = DetectorConfig::default();
    if let Some(threshold) = args.threshold {
        config.edge_energy_threshold = threshold;
    }
    info!(regions = regions.len(), threshold = config.edge_energy_threshold, "Region file loaded");

    // --- 2. Video I/O Initialization ---
    let source = VideoFrameSource::open(&args.video)?;
    let properties = source.properties()?;
    let mut writer = match &args.output {
        Some(path) => {
            let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
            let writer = VideoWriter::new(
                path,
                fourcc,
                properties.fps,
                Size::new(properties.width as i32, properties.height as i32),
                true,
            )?;
            Some(writer)
        }
        None => None,
    };

    // --- 3. Detector Initialization ---
    let mut detector = SpotDetector::new(regions, source, &config)?;
    if args.start_frame > 0 {
        detector.start_at(args.start_frame)?;
    }

    // --- 4. Main Processing Loop ---
    let mut last_summary = None;
    while let Some(detection) = detector.detect_next()? {
        let annotated = overlay::render(
            detector.source().last_frame(),
            detector.regions(),
            detector.geometry(),
            &detection.readings,
        )?;

        if let Some(writer) = writer.as_mut() {
            writer.write(&annotated)?;
        }

        if args.display {
            highgui::imshow(WINDOW_NAME, &annotated)?;
            if highgui::wait_key(1)? & 0xFF == 'q' as i32 {
                info!(frame_index = detection.frame_index, "Stopped by user");
                break;
            }
        }

        last_summary = Some(detection.summary());
    }

    if args.display {
        highgui::destroy_all_windows()?;
    }

    match last_summary {
        Some(summary) => info!(frames = detector.frames_read(), %summary, "Processing complete"),
        None => info!("No frames processed"),
    }
    if let Some(path) = &args.output {
        info!(path = %path, "Annotated video saved");
    }
    Ok(())
}
