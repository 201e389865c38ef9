// Segment a single image or video frame and save it as PNG, for tuning
// segmentation parameters without converting a whole video.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing::info;

use superpixel_animator::{
    config::Config,
    pipeline::{NoOpProgress, SegmentationWorkerPool},
    video::{FfmpegSource, Frame, Keyframe, VideoDescriptor, VideoSource},
    SegmenterRegistry,
};

#[derive(Parser)]
#[command(name = "superpixel-preview", version, about = "Preview superpixel segmentation on one frame")]
struct Cli {
    /// Image or video file
    input: PathBuf,

    /// Output PNG file
    output: PathBuf,

    /// Frame index to take when the input is a video
    #[arg(long, default_value_t = 0)]
    frame: usize,

    #[arg(long)]
    segments: Option<usize>,

    #[arg(long)]
    compactness: Option<f32>,

    #[arg(long)]
    sigma: Option<f32>,

    #[arg(long)]
    segmenter: Option<String>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn is_image(path: &std::path::Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("png" | "jpg" | "jpeg")
    )
}

fn load_frame(cli: &Cli, config: &Config) -> Result<Frame> {
    if is_image(&cli.input) {
        let image = image::open(&cli.input)
            .with_context(|| format!("Failed to open image {:?}", cli.input))?;
        return Ok(Frame::new(image.to_rgb8()));
    }

    let mut source =
        FfmpegSource::open(&cli.input, &config.video).map_err(|e| anyhow!(e.user_message()))?;
    let total = source.descriptor().total_frames;
    if cli.frame >= total {
        bail!("Frame {} is out of range, the video has {} frames", cli.frame, total);
    }
    source.read_frame(cli.frame).map_err(|e| anyhow!(e.user_message()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path).map_err(|e| anyhow!(e.user_message()))?,
        None => Config::default(),
    };
    if let Some(segments) = cli.segments {
        config.segmentation.params.segments = segments;
    }
    if let Some(compactness) = cli.compactness {
        config.segmentation.params.compactness = compactness;
    }
    if let Some(sigma) = cli.sigma {
        config.segmentation.params.sigma = sigma;
    }
    if let Some(segmenter) = &cli.segmenter {
        config.segmentation.segmenter = segmenter.clone();
    }
    config.validate().map_err(|e| anyhow!(e.user_message()))?;

    let segmenter = SegmenterRegistry::new()
        .require(&config.segmentation.segmenter)
        .map_err(|e| anyhow!(e.user_message()))?;

    let frame = load_frame(&cli, &config)?;
    let descriptor = VideoDescriptor::new(1.0, 1, frame.width(), frame.height());
    info!(
        "Segmenting {}x{} frame with {} ({} segments)",
        frame.width(),
        frame.height(),
        segmenter.name(),
        config.segmentation.params.segments
    );

    let params = config.segmentation.params.clone();
    let pool = SegmentationWorkerPool::new(Arc::clone(&segmenter), params, 1);
    let mut results = pool
        .process(vec![Keyframe::new(cli.frame, frame)], &descriptor, &NoOpProgress)
        .map_err(|e| anyhow!(e.user_message()))?;

    let segmented = results
        .pop()
        .and_then(|result| result.frame)
        .ok_or_else(|| anyhow!("Segmentation failed, see the log for details"))?;

    segmented
        .save_png(&cli.output)
        .with_context(|| format!("Failed to write {:?}", cli.output))?;

    println!("✅ Preview saved to {:?}", cli.output);
    Ok(())
}
