//! # Superpixel Animator
//!
//! Turn any video into a flat-color animation: every `step`-th frame is
//! segmented into superpixels, each superpixel is filled with its mean color,
//! and the processed keyframes are held in place of the frames in between so
//! the output keeps the source's frame count and timing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use superpixel_animator::{AnimationEngine, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let mut config = Config::default();
//! config.pipeline.step = 3;
//!
//! let engine = AnimationEngine::new(config)?;
//! let summary = engine.convert("input.mp4", "output.mp4").await?;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`video`] - Frame types, the `ffmpeg`-backed source and sink, in-memory doubles
//! - [`segmentation`] - The [`Segmenter`] capability and the SLIC / grid implementations
//! - [`pipeline`] - Sampler, worker pool, reconstructor and the [`AnimationEngine`]
//! - [`config`] - Configuration management
//!
//! ## Custom Segmenters
//!
//! Any pure frame transform can replace SLIC by implementing [`Segmenter`]:
//!
//! ```rust,no_run
//! use superpixel_animator::segmentation::{LabFrame, SegmentationParams, Segmenter};
//! use superpixel_animator::Result;
//!
//! struct Identity;
//!
//! impl Segmenter for Identity {
//!     fn name(&self) -> &str {
//!         "identity"
//!     }
//!
//!     fn description(&self) -> &str {
//!         "Leaves frames untouched"
//!     }
//!
//!     fn segment(&self, frame: &LabFrame, _params: &SegmentationParams) -> Result<LabFrame> {
//!         Ok(frame.clone())
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod segmentation;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    error::{AnimatorError, Result},
    pipeline::{AnimationEngine, ConversionSummary, PipelinePhase, ProgressSink, ProgressUpdate},
    segmentation::{Segmenter, SegmenterRegistry},
};
