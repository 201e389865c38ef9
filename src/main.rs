use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use superpixel_animator::{
    config::Config, AnimationEngine, PipelinePhase, ProgressSink, ProgressUpdate,
};

#[derive(Parser)]
#[command(
    name = "superpixel-animator",
    version,
    about = "Turn a video into a flat-color superpixel animation",
    long_about = "Samples every N-th frame of a video, replaces each sampled frame with its superpixel-averaged version, and writes a video with the original frame count and rate."
)]
struct Cli {
    /// Input video file
    input: PathBuf,

    /// Output video file (H.264)
    output: PathBuf,

    /// Process every N-th frame and hold it for N frames [default: 5]
    #[arg(long)]
    step: Option<usize>,

    /// Approximate number of superpixels per frame [default: 500]
    #[arg(long)]
    segments: Option<usize>,

    /// Spatial regularity versus color fidelity [default: 5]
    #[arg(long)]
    compactness: Option<f32>,

    /// Gaussian smoothing before segmentation, 0 disables [default: 1]
    #[arg(long)]
    sigma: Option<f32>,

    /// Segmenter to use (slic, grid) [default: slic]
    #[arg(long)]
    segmenter: Option<String>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Hide progress bars
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    /// Command line values win over the configuration file
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(step) = self.step {
            config.pipeline.step = step;
        }
        if let Some(segments) = self.segments {
            config.segmentation.params.segments = segments;
        }
        if let Some(compactness) = self.compactness {
            config.segmentation.params.compactness = compactness;
        }
        if let Some(sigma) = self.sigma {
            config.segmentation.params.sigma = sigma;
        }
        if let Some(segmenter) = &self.segmenter {
            config.segmentation.segmenter = segmenter.clone();
        }
    }
}

/// Renders segmentation and writing progress as console bars
struct ConsoleProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    fn new() -> Self {
        Self { bar: Mutex::new(None) }
    }

    fn label(phase: PipelinePhase) -> &'static str {
        match phase {
            PipelinePhase::Segmenting => "Segmenting keyframes",
            PipelinePhase::Writing => "Writing video",
            _ => "Working",
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_phase(&self, _phase: PipelinePhase) {
        if let Ok(mut bar) = self.bar.lock() {
            if let Some(finished) = bar.take() {
                finished.finish();
            }
        }
    }

    fn on_progress(&self, update: &ProgressUpdate) {
        let Ok(mut bar) = self.bar.lock() else {
            return;
        };

        let bar = bar.get_or_insert_with(|| {
            let pb = ProgressBar::new(update.total as u64);
            let template = "{msg} {bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}]";
            if let Ok(style) = ProgressStyle::with_template(template) {
                pb.set_style(style.progress_chars("##-"));
            }
            pb.set_message(Self::label(update.phase));
            pb
        });
        bar.set_position(update.current as u64);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting superpixel-animator v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path).map_err(|e| anyhow!(e.user_message()))?
        }
        None => Config::default(),
    };
    cli.apply_overrides(&mut config);

    let mut engine = AnimationEngine::new(config).map_err(|e| anyhow!(e.user_message()))?;
    if !cli.no_progress {
        engine = engine.with_progress(Arc::new(ConsoleProgress::new()));
    }

    let summary = engine
        .convert(&cli.input, &cli.output)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    println!("\n{}", summary);
    if !summary.is_complete() {
        warn!(
            "{} of {} keyframes were dropped; the output is shorter than the input",
            summary.keyframes_expected - summary.keyframes_processed,
            summary.keyframes_expected
        );
    }

    info!("Done! Output saved to: {:?}", cli.output);
    Ok(())
}
