use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::{debug, info, warn};

use crate::config::VideoConfig;
use crate::error::{Result, VideoError};
use crate::video::types::{Frame, VideoDescriptor};

/// Sequential frame writer bound to fixed dimensions, rate and encoding
///
/// Frames are written strictly in the order they are handed over.
/// [`finish`](VideoSink::finish) flushes and closes the output; a sink that
/// is dropped without finishing must still release its resources.
pub trait VideoSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}

/// Output encoding arguments, fixed for every conversion
///
/// H.264 in yuv420p needs even dimensions, so odd sizes are padded by one pixel.
pub const OUTPUT_ENCODING_ARGS: &[&str] = &[
    "-c:v",
    "libx264",
    "-preset",
    "medium",
    "-crf",
    "18",
    "-pix_fmt",
    "yuv420p",
    "-vf",
    "pad=ceil(iw/2)*2:ceil(ih/2)*2",
];

/// Video sink that pipes raw RGB24 frames into an external `ffmpeg` encoder
pub struct FfmpegSink {
    path: PathBuf,
    descriptor: VideoDescriptor,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    frames_written: usize,
}

impl FfmpegSink {
    /// Open `path` for writing frames shaped like `descriptor`
    ///
    /// The output location is checked before the encoder starts, so a bad
    /// path fails here with [`VideoError::SinkOpenFailed`] rather than after
    /// frames have been produced.
    pub fn open<P: AsRef<Path>>(
        path: P,
        descriptor: &VideoDescriptor,
        config: &VideoConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let open_failed = |reason: String| VideoError::SinkOpenFailed {
            path: path.display().to_string(),
            reason,
        };

        descriptor.validate()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(open_failed("output directory does not exist".to_string()).into());
            }
        }

        // Probe writability without truncating an existing file
        let existed = path.exists();
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| open_failed(e.to_string()))?;
        let discard = || {
            if !existed {
                let _ = std::fs::remove_file(path);
            }
        };

        let spawned = Command::new(&config.ffmpeg_path)
            .args(["-y", "-v", "error", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("-s")
            .arg(format!("{}x{}", descriptor.width, descriptor.height))
            .arg("-r")
            .arg(descriptor.fps.to_string())
            .args(["-i", "-", "-an"])
            .args(OUTPUT_ENCODING_ARGS)
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                discard();
                return Err(open_failed(format!("ffmpeg could not be started: {}", e)).into());
            }
        };

        let Some(stdin) = child.stdin.take() else {
            let _ = child.kill();
            let _ = child.wait();
            discard();
            return Err(open_failed("encoder stdin unavailable".to_string()).into());
        };

        info!(
            "Writing {}x{} @ {:.2} fps to {}",
            descriptor.width, descriptor.height, descriptor.fps, path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            descriptor: *descriptor,
            child: Some(child),
            stdin: Some(stdin),
            frames_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }
}

impl VideoSink for FfmpegSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if !frame.matches(&self.descriptor) {
            return Err(VideoError::DimensionMismatch {
                expected_width: self.descriptor.width,
                expected_height: self.descriptor.height,
                actual_width: frame.width(),
                actual_height: frame.height(),
            }
            .into());
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| VideoError::EncodingFailed {
            reason: "sink already finished".to_string(),
        })?;

        stdin.write_all(frame.as_raw()).map_err(|e| VideoError::EncodingFailed {
            reason: format!("ffmpeg stopped accepting frames: {}", e),
        })?;

        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // Closing stdin signals end of input to the encoder
        drop(self.stdin.take());

        let Some(child) = self.child.take() else {
            return Ok(());
        };

        let output = child.wait_with_output().map_err(|e| VideoError::EncodingFailed {
            reason: format!("waiting for ffmpeg failed: {}", e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::EncodingFailed {
                reason: format!("ffmpeg failed: {}", stderr.trim()),
            }
            .into());
        }

        debug!("Encoder finished after {} frames", self.frames_written);
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            warn!("Sink for {} dropped before finishing, stopping encoder", self.path.display());
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.mp4");
        let descriptor = VideoDescriptor::new(30.0, 10, 16, 16);

        let result = FfmpegSink::open(&path, &descriptor, &VideoConfig::default());
        assert!(matches!(
            result,
            Err(crate::error::AnimatorError::Video(VideoError::SinkOpenFailed { .. }))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_encoder_leaves_no_output_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        let descriptor = VideoDescriptor::new(30.0, 10, 16, 16);
        let config = VideoConfig {
            ffmpeg_path: dir.path().join("no-such-ffmpeg").display().to_string(),
            ..VideoConfig::default()
        };

        let result = FfmpegSink::open(&path, &descriptor, &config);
        assert!(matches!(
            result,
            Err(crate::error::AnimatorError::Video(VideoError::SinkOpenFailed { .. }))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_encoder_keeps_existing_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        std::fs::write(&path, b"previous render").unwrap();
        let descriptor = VideoDescriptor::new(30.0, 10, 16, 16);
        let config = VideoConfig {
            ffmpeg_path: dir.path().join("no-such-ffmpeg").display().to_string(),
            ..VideoConfig::default()
        };

        assert!(FfmpegSink::open(&path, &descriptor, &config).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"previous render");
    }

    #[test]
    fn test_open_rejects_invalid_descriptor() {
        let dir = tempdir().unwrap();
        let descriptor = VideoDescriptor::new(0.0, 10, 16, 16);
        let path = dir.path().join("out.mp4");
        let result = FfmpegSink::open(&path, &descriptor, &VideoConfig::default());
        assert!(result.is_err());
    }
}
