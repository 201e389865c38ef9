//! # Video Module
//!
//! Frame types plus the source/sink collaborators the pipeline reads from
//! and writes to.

pub mod memory;
pub mod sink;
pub mod source;
pub mod types;

pub use memory::{MemorySink, MemorySource};
pub use sink::{FfmpegSink, VideoSink, OUTPUT_ENCODING_ARGS};
pub use source::{FfmpegSource, VideoSource};
pub use types::{Frame, Keyframe, ProcessedResult, VideoDescriptor};
