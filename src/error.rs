use thiserror::Error;

/// Main error type for the superpixel animator
#[derive(Error, Debug)]
pub enum AnimatorError {
    #[error("Video error: {0}")]
    Video(#[from] VideoError),

    #[error("Segmentation error: {0}")]
    Segmentation(#[from] SegmentationError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Errors raised by video sources and sinks
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to open video source: {path} ({reason})")]
    SourceOpenFailed { path: String, reason: String },

    #[error("Failed to open video sink: {path} ({reason})")]
    SinkOpenFailed { path: String, reason: String },

    #[error("Failed to read frame {index}: {reason}")]
    FrameReadFailed { index: usize, reason: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("Frame is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Invalid video parameters: {details}")]
    InvalidParameters { details: String },
}

/// Errors raised by a segmenter for a single frame
#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("Segmenter not found: {name}")]
    NotFound { name: String },

    #[error("Invalid segmentation parameter: {key} = {value}")]
    InvalidParameter { key: String, value: String },

    #[error("Segmentation failed: {reason}")]
    Failed { reason: String },

    #[error("Segmentation task panicked: {message}")]
    Panicked { message: String },
}

/// Errors raised while orchestrating a conversion
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to build worker pool: {reason}")]
    WorkerPoolFailed { reason: String },

    #[error("Conversion task failed: {reason}")]
    TaskFailed { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using AnimatorError
pub type Result<T> = std::result::Result<T, AnimatorError>;

impl AnimatorError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Whether this error aborts a conversion.
    ///
    /// Per-frame failures (a bad read, a segmenter error) are dropped by the
    /// pipeline and never surface from `run`; everything else is fatal.
    /// A segmenter returning the wrong size is dropped inside the worker
    /// pool, so a `DimensionMismatch` that reaches the caller came from the
    /// sink and counts as fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Video(VideoError::FrameReadFailed { .. })
                | Self::Segmentation(SegmentationError::Failed { .. })
                | Self::Segmentation(SegmentationError::Panicked { .. })
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Video(VideoError::SourceOpenFailed { path, .. }) => {
                format!("Could not open input video '{}'. Please check the file exists and that ffprobe can read it.", path)
            }
            Self::Video(VideoError::SinkOpenFailed { path, .. }) => {
                format!("Could not create output video '{}'. Please check the directory exists and ffmpeg is installed.", path)
            }
            Self::Segmentation(SegmentationError::NotFound { name }) => {
                format!("Segmenter '{}' not found. Available segmenters: slic, grid", name)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_frame_errors_are_not_fatal() {
        let read: AnimatorError = VideoError::FrameReadFailed {
            index: 3,
            reason: "eof".to_string(),
        }
        .into();
        assert!(!read.is_fatal());

        let seg: AnimatorError = SegmentationError::Failed {
            reason: "boom".to_string(),
        }
        .into();
        assert!(!seg.is_fatal());
    }

    #[test]
    fn test_open_failures_are_fatal() {
        let err: AnimatorError = VideoError::SinkOpenFailed {
            path: "out.mp4".to_string(),
            reason: "no such directory".to_string(),
        }
        .into();
        assert!(err.is_fatal());
        assert!(err.user_message().contains("out.mp4"));
    }

    #[test]
    fn test_sink_dimension_mismatch_is_fatal() {
        let err: AnimatorError = VideoError::DimensionMismatch {
            expected_width: 16,
            expected_height: 16,
            actual_width: 8,
            actual_height: 8,
        }
        .into();
        assert!(err.is_fatal());
    }
}
