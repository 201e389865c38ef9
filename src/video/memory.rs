//! In-memory source and sink, for tests, benchmarks and embedding callers
//! that already hold decoded frames.

use crate::error::{Result, VideoError};
use crate::video::sink::VideoSink;
use crate::video::source::VideoSource;
use crate::video::types::{Frame, VideoDescriptor};

/// Video source over a vector of frames
///
/// A `None` slot simulates a corrupt frame: reading it fails.
#[derive(Debug, Clone)]
pub struct MemorySource {
    descriptor: VideoDescriptor,
    frames: Vec<Option<Frame>>,
    reads: Vec<usize>,
}

impl MemorySource {
    /// Build a source whose frame count is the number of slots
    pub fn new(fps: f64, width: u32, height: u32, frames: Vec<Option<Frame>>) -> Self {
        let descriptor = VideoDescriptor::new(fps, frames.len(), width, height);
        Self::with_descriptor(descriptor, frames)
    }

    /// Build a source that reports `descriptor` regardless of how many slots exist
    ///
    /// Useful to model containers whose reported frame count is wrong.
    pub fn with_descriptor(descriptor: VideoDescriptor, frames: Vec<Option<Frame>>) -> Self {
        Self {
            descriptor,
            frames,
            reads: Vec::new(),
        }
    }

    /// Indices requested so far, in call order
    pub fn reads(&self) -> &[usize] {
        &self.reads
    }
}

impl VideoSource for MemorySource {
    fn descriptor(&self) -> &VideoDescriptor {
        &self.descriptor
    }

    fn read_frame(&mut self, index: usize) -> Result<Frame> {
        self.reads.push(index);
        match self.frames.get(index) {
            Some(Some(frame)) => Ok(frame.clone()),
            Some(None) => Err(VideoError::FrameReadFailed {
                index,
                reason: "corrupt frame".to_string(),
            }
            .into()),
            None => Err(VideoError::FrameReadFailed {
                index,
                reason: "past end of stream".to_string(),
            }
            .into()),
        }
    }
}

/// Video sink that keeps every written frame
#[derive(Debug, Clone)]
pub struct MemorySink {
    descriptor: VideoDescriptor,
    frames: Vec<Frame>,
    finished: bool,
}

impl MemorySink {
    pub fn new(descriptor: VideoDescriptor) -> Self {
        Self {
            descriptor,
            frames: Vec::new(),
            finished: false,
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl VideoSink for MemorySink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if self.finished {
            return Err(VideoError::EncodingFailed {
                reason: "sink already finished".to_string(),
            }
            .into());
        }
        if !frame.matches(&self.descriptor) {
            return Err(VideoError::DimensionMismatch {
                expected_width: self.descriptor.width,
                expected_height: self.descriptor.height,
                actual_width: frame.width(),
                actual_height: frame.height(),
            }
            .into());
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
