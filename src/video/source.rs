use std::ffi::OsString;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::VideoConfig;
use crate::error::{Result, VideoError};
use crate::video::types::{Frame, VideoDescriptor};

/// Random-access frame reader
///
/// Implementations report the video's properties once through
/// [`descriptor`](VideoSource::descriptor) and serve frames by their index in
/// the source. A failed read is reported per frame; callers decide whether
/// it is fatal.
pub trait VideoSource {
    fn descriptor(&self) -> &VideoDescriptor;

    /// Seek to `index` and decode that frame
    fn read_frame(&mut self, index: usize) -> Result<Frame>;
}

/// Video source backed by the external `ffprobe`/`ffmpeg` binaries
///
/// Metadata comes from a single `ffprobe` call at open time. Frames are
/// decoded by a long-lived `ffmpeg` process streaming raw RGB24 on stdout;
/// seeking forward skips frames on that stream, seeking backwards restarts
/// the decoder. The sampler only ever seeks forward, so a conversion decodes
/// the file once.
pub struct FfmpegSource {
    path: PathBuf,
    ffmpeg_path: String,
    descriptor: VideoDescriptor,
    decoder: Option<Decoder>,
    /// First index the decoder failed to deliver; reads at or past it fail fast
    exhausted_at: Option<usize>,
}

struct Decoder {
    child: Child,
    stdout: BufReader<ChildStdout>,
    position: usize,
}

impl Drop for Decoder {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

impl FfmpegSource {
    /// Probe `path` and prepare it for reading
    ///
    /// Fails with [`VideoError::SourceOpenFailed`] when the file is missing,
    /// `ffprobe` cannot run, or the file has no readable video stream.
    pub fn open<P: AsRef<Path>>(path: P, config: &VideoConfig) -> Result<Self> {
        let path = path.as_ref();
        let open_failed = |reason: String| VideoError::SourceOpenFailed {
            path: path.display().to_string(),
            reason,
        };

        if !path.is_file() {
            return Err(open_failed("file does not exist".to_string()).into());
        }

        let output = Command::new(&config.ffprobe_path)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,avg_frame_rate,r_frame_rate,nb_frames,duration",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| open_failed(format!("ffprobe could not be started: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(open_failed(format!("ffprobe failed: {}", stderr.trim())).into());
        }

        let descriptor = parse_probe_output(&output.stdout).map_err(open_failed)?;

        debug!("Probed {}: {:?}", path.display(), descriptor);

        Ok(Self {
            path: path.to_path_buf(),
            ffmpeg_path: config.ffmpeg_path.clone(),
            descriptor,
            decoder: None,
            exhausted_at: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn spawn_decoder(&self) -> std::io::Result<Decoder> {
        debug!("Starting decoder for {}", self.path.display());

        let mut child = Command::new(&self.ffmpeg_path)
            .args(decoder_args(&self.path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "decoder stdout unavailable")
        })?;

        Ok(Decoder {
            child,
            stdout: BufReader::with_capacity(self.descriptor.frame_len().max(8192), stdout),
            position: 0,
        })
    }
}

impl VideoSource for FfmpegSource {
    fn descriptor(&self) -> &VideoDescriptor {
        &self.descriptor
    }

    fn read_frame(&mut self, index: usize) -> Result<Frame> {
        let read_failed = |reason: String| VideoError::FrameReadFailed { index, reason };

        if let Some(end) = self.exhausted_at {
            if index >= end {
                return Err(read_failed(format!("decoder stopped at frame {}", end)).into());
            }
        }

        let mut decoder = match self.decoder.take() {
            Some(decoder) if decoder.position <= index => decoder,
            _ => self
                .spawn_decoder()
                .map_err(|e| read_failed(format!("ffmpeg could not be started: {}", e)))?,
        };

        let mut buffer = vec![0u8; self.descriptor.frame_len()];
        while decoder.position <= index {
            if let Err(e) = decoder.stdout.read_exact(&mut buffer) {
                warn!(
                    "Decoder ended at frame {} of {}",
                    decoder.position, self.descriptor.total_frames
                );
                self.exhausted_at = Some(decoder.position);
                return Err(read_failed(e.to_string()).into());
            }
            decoder.position += 1;
        }

        self.decoder = Some(decoder);

        Frame::from_rgb_bytes(self.descriptor.width, self.descriptor.height, buffer)
            .ok_or_else(|| read_failed("decoded buffer has the wrong size".to_string()).into())
    }
}

/// Arguments for the rawvideo decoder of `path`
///
/// Autorotation is disabled so frames keep the coded dimensions that
/// ffprobe reports; a rotated stream would otherwise come out transposed
/// with the same byte count per frame.
fn decoder_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "error", "-nostdin", "-noautorotate", "-i"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(path.as_os_str().to_os_string());
    args.extend(
        ["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"]
            .iter()
            .map(OsString::from),
    );
    args
}

/// Build a descriptor from `ffprobe -of json` output
fn parse_probe_output(stdout: &[u8]) -> std::result::Result<VideoDescriptor, String> {
    let probe: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| format!("invalid ffprobe output: {}", e))?;

    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "no video stream".to_string())?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err("video stream has no dimensions".to_string()),
    };

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
        .ok_or_else(|| "video stream has no frame rate".to_string())?;

    let total_frames = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<usize>().ok())
        .or_else(|| {
            let duration: f64 = stream.duration.as_deref()?.parse().ok()?;
            Some((duration * fps).round() as usize)
        })
        .ok_or_else(|| "video stream has no frame count".to_string())?;

    Ok(VideoDescriptor::new(fps, total_frames, width, height))
}

/// Parse an ffmpeg rational like `30000/1001`; zero rates count as missing
fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };

    (value.is_finite() && value > 0.0).then_some(value)
}
