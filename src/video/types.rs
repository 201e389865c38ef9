use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Number of interleaved channels in every frame buffer
pub const CHANNELS: usize = 3;

/// Represents a single video frame
///
/// A thin wrapper around an RGB8 image buffer. Everything that flows through
/// the pipeline (sampled keyframes, segmented results, frames handed to the
/// sink) uses this type.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        Self {
            buffer: ImageBuffer::new(width, height),
        }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(color));
    }

    /// Get the underlying image buffer
    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// Raw interleaved RGB bytes, row-major
    pub fn as_raw(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Create a frame from raw RGB bytes
    ///
    /// Returns `None` when `data` does not hold exactly `width * height * 3` bytes.
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * CHANNELS {
            return None;
        }
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    /// Whether this frame has exactly the descriptor's width, height and channel depth
    pub fn matches(&self, descriptor: &VideoDescriptor) -> bool {
        self.width() == descriptor.width
            && self.height() == descriptor.height
            && self.as_raw().len() == descriptor.frame_len()
    }

    /// Save the frame as a PNG file
    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.buffer.save(path)
    }
}

/// Immutable properties of the input video, read once when the source opens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    /// Frames per second
    pub fps: f64,

    /// Total frame count reported by the container
    pub total_frames: usize,

    pub width: u32,
    pub height: u32,
}

impl VideoDescriptor {
    pub fn new(fps: f64, total_frames: usize, width: u32, height: u32) -> Self {
        Self {
            fps,
            total_frames,
            width,
            height,
        }
    }

    /// Size in bytes of one RGB frame
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * CHANNELS
    }

    /// Duration in seconds implied by the frame count and rate
    pub fn duration(&self) -> f64 {
        if self.fps > 0.0 {
            self.total_frames as f64 / self.fps
        } else {
            0.0
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if !(self.fps.is_finite() && self.fps > 0.0) || self.width == 0 || self.height == 0 {
            return Err(crate::error::VideoError::InvalidParameters {
                details: format!("{}x{} @ {} fps", self.width, self.height, self.fps),
            }
            .into());
        }
        Ok(())
    }
}

/// A sampled frame awaiting segmentation, tagged with its position in the source
#[derive(Debug, Clone)]
pub struct Keyframe {
    pub original_index: usize,
    pub frame: Frame,
}

impl Keyframe {
    pub fn new(original_index: usize, frame: Frame) -> Self {
        Self {
            original_index,
            frame,
        }
    }
}

/// Outcome of segmenting one keyframe
///
/// `frame` is `None` when segmentation failed or produced a buffer with the
/// wrong dimensions; the reconstructor skips such slots.
#[derive(Debug, Clone)]
pub struct ProcessedResult {
    pub original_index: usize,
    pub frame: Option<Frame>,
}

impl ProcessedResult {
    pub fn present(original_index: usize, frame: Frame) -> Self {
        Self {
            original_index,
            frame: Some(frame),
        }
    }

    pub fn absent(original_index: usize) -> Self {
        Self {
            original_index,
            frame: None,
        }
    }

    pub fn is_present(&self) -> bool {
        self.frame.is_some()
    }
}
