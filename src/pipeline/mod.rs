//! # Conversion Pipeline
//!
//! Sampling, bounded-parallel segmentation and ordered reconstruction.

pub mod engine;
pub mod pool;
pub mod progress;
pub mod reconstructor;
pub mod sampler;

pub use engine::{AnimationEngine, ConversionSummary};
pub use pool::{worker_bound, SegmentationWorkerPool};
pub use progress::{NoOpProgress, PipelinePhase, ProgressSink, ProgressUpdate};
pub use reconstructor::{FrameReconstructor, RepeatSpan};
pub use sampler::FrameSampler;
