use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task;
use tracing::{debug, error, info};

use crate::{
    config::Config,
    error::{PipelineError, Result},
    pipeline::{
        progress::{NoOpProgress, PipelinePhase, ProgressSink},
        FrameReconstructor, FrameSampler, SegmentationWorkerPool,
    },
    segmentation::{Segmenter, SegmenterRegistry},
    video::{FfmpegSink, FfmpegSource, VideoSink, VideoSource},
};

/// Main engine that turns a video into a superpixel animation
///
/// The engine runs strictly sequential phases:
/// 1. Sampling - read every `step`-th frame from the source
/// 2. Segmenting - flatten the keyframes on a bounded worker pool
/// 3. Reconstructing - plan how long each processed keyframe is held
/// 4. Writing - stream the planned frames into the sink
///
/// Per-frame failures only drop that frame; the run fails only when the
/// source or sink cannot be opened or the sink stops accepting frames.
#[derive(Clone)]
pub struct AnimationEngine {
    config: Config,
    segmenter: Arc<dyn Segmenter>,
    progress: Arc<dyn ProgressSink>,
}

/// Outcome of a completed conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    pub frames_written: usize,
    pub total_frames: usize,
    /// Keyframes the stride selects, `⌈total_frames / step⌉`
    pub keyframes_expected: usize,
    /// Keyframes actually read from the source
    pub keyframes_sampled: usize,
    /// Keyframes that survived segmentation
    pub keyframes_processed: usize,
    pub elapsed: Duration,
}

impl ConversionSummary {
    /// Whether the output has as many frames as the source
    pub fn is_complete(&self) -> bool {
        self.frames_written == self.total_frames
    }
}

impl fmt::Display for ConversionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frames written: {}/{}", self.frames_written, self.total_frames)
    }
}

impl AnimationEngine {
    /// Create an engine using the segmenter named in the configuration
    pub fn new(config: Config) -> Result<Self> {
        let segmenter = SegmenterRegistry::new().require(&config.segmentation.segmenter)?;
        Self::with_segmenter(config, segmenter)
    }

    /// Create an engine with an explicit segmenter, ignoring `segmentation.segmenter`
    pub fn with_segmenter(config: Config, segmenter: Arc<dyn Segmenter>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            segmenter,
            progress: Arc::new(NoOpProgress),
        })
    }

    /// Report phase changes and progress to `progress`
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn segmenter(&self) -> &dyn Segmenter {
        self.segmenter.as_ref()
    }

    /// Convert `input_path` into a superpixel animation at `output_path`
    ///
    /// The pipeline is CPU bound and blocking, so it runs on tokio's blocking pool.
    pub async fn convert<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
    ) -> Result<ConversionSummary> {
        let engine = self.clone();
        let input_path = input_path.as_ref().to_path_buf();
        let output_path = output_path.as_ref().to_path_buf();

        task::spawn_blocking(move || engine.convert_blocking(&input_path, &output_path))
            .await
            .map_err(|e| PipelineError::TaskFailed { reason: e.to_string() })?
    }

    /// Blocking form of [`convert`](Self::convert)
    ///
    /// Source and sink are both opened before any frame is sampled, so a bad
    /// input or output path fails without doing any work. Both are released
    /// when this returns, on success or failure.
    pub fn convert_blocking(
        &self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<ConversionSummary> {
        info!("🎬 Converting {:?} -> {:?}", input_path, output_path);
        info!("   Segmenter: {}", self.segmenter.name());
        info!("   Step: {}", self.config.pipeline.step);

        let opened = FfmpegSource::open(input_path, &self.config.video).and_then(|source| {
            let sink = FfmpegSink::open(output_path, source.descriptor(), &self.config.video)?;
            Ok((source, sink))
        });

        let (mut source, mut sink) = match opened {
            Ok(pair) => pair,
            Err(e) => {
                self.enter(PipelinePhase::Failed);
                return Err(e);
            }
        };

        self.run(&mut source, &mut sink)
    }

    /// Run the pipeline between an opened source and sink
    ///
    /// The sink is finished on success. On failure it is left as is and the
    /// caller's drop releases it.
    pub fn run<S, K>(&self, source: &mut S, sink: &mut K) -> Result<ConversionSummary>
    where
        S: VideoSource + ?Sized,
        K: VideoSink + ?Sized,
    {
        self.enter(PipelinePhase::Idle);

        match self.run_phases(source, sink) {
            Ok(summary) => {
                self.enter(PipelinePhase::Done);
                info!("🎉 {} in {:.1}s", summary, summary.elapsed.as_secs_f64());
                Ok(summary)
            }
            Err(e) => {
                error!("Conversion failed: {}", e);
                self.enter(PipelinePhase::Failed);
                Err(e)
            }
        }
    }

    fn run_phases<S, K>(&self, source: &mut S, sink: &mut K) -> Result<ConversionSummary>
    where
        S: VideoSource + ?Sized,
        K: VideoSink + ?Sized,
    {
        let started = Instant::now();
        let descriptor = *source.descriptor();
        descriptor.validate()?;

        let step = self.config.pipeline.step;
        info!(
            "Video parameters: {}x{} / {:.2} fps / {} frames",
            descriptor.width, descriptor.height, descriptor.fps, descriptor.total_frames
        );

        self.enter(PipelinePhase::Sampling);
        let sampler = FrameSampler::new(step)?;
        let keyframes_expected = sampler.keyframe_count(descriptor.total_frames);
        let keyframes = sampler.sample(source);
        let keyframes_sampled = keyframes.len();

        self.enter(PipelinePhase::Segmenting);
        let pool = SegmentationWorkerPool::new(
            Arc::clone(&self.segmenter),
            self.config.segmentation.params.clone(),
            self.config.pipeline.max_workers,
        );
        let results = pool.process(keyframes, &descriptor, self.progress.as_ref())?;
        let keyframes_processed = results.iter().filter(|r| r.is_present()).count();

        self.enter(PipelinePhase::Reconstructing);
        let reconstructor = FrameReconstructor::new(step, descriptor.total_frames)?;
        let plan = reconstructor.plan(&results);
        debug!(
            "Reconstruction plan: {} spans, {} frames",
            plan.len(),
            FrameReconstructor::planned_frames(&plan)
        );

        self.enter(PipelinePhase::Writing);
        let frames_written = reconstructor.write(&plan, &results, sink, self.progress.as_ref())?;
        sink.finish()?;

        Ok(ConversionSummary {
            frames_written,
            total_frames: descriptor.total_frames,
            keyframes_expected,
            keyframes_sampled,
            keyframes_processed,
            elapsed: started.elapsed(),
        })
    }

    fn enter(&self, phase: PipelinePhase) {
        info!("Pipeline phase: {}", phase);
        self.progress.on_phase(phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::GridSegmenter;

    #[test]
    fn test_unknown_segmenter_rejected() {
        let mut config = Config::default();
        config.segmentation.segmenter = "watershed".to_string();
        assert!(AnimationEngine::new(config).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.pipeline.step = 0;
        assert!(AnimationEngine::with_segmenter(config, Arc::new(GridSegmenter::new())).is_err());
    }

    #[test]
    fn test_summary_display() {
        let summary = ConversionSummary {
            frames_written: 87,
            total_frames: 90,
            keyframes_expected: 30,
            keyframes_sampled: 30,
            keyframes_processed: 29,
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(summary.to_string(), "Frames written: 87/90");
        assert!(!summary.is_complete());
    }
}
