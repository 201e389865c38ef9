use tracing::{info, warn};

use crate::error::{ConfigError, Result};
use crate::pipeline::progress::{PipelinePhase, ProgressSink, ProgressUpdate};
use crate::video::{ProcessedResult, VideoSink};

/// How often one processed keyframe is written to the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatSpan {
    /// Position of the result in the processed sequence
    pub position: usize,
    pub original_index: usize,
    pub repeats: usize,
}

/// Expands processed keyframes back into a full-length frame stream
///
/// Every present result but the last is held for `step` frames. The last one
/// is held for `total_frames - (original_index / step) * step` frames, which
/// absorbs a short final segment. Absent results get no frames at all, so
/// each dropped keyframe before the last present one shortens the output by
/// `step` frames; the gap is not redistributed.
#[derive(Debug, Clone, Copy)]
pub struct FrameReconstructor {
    step: usize,
    total_frames: usize,
}

impl FrameReconstructor {
    pub fn new(step: usize, total_frames: usize) -> Result<Self> {
        if step == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.step".to_string(),
                value: step.to_string(),
            }
            .into());
        }
        Ok(Self { step, total_frames })
    }

    /// Repeat counts for each present result, in temporal order
    pub fn plan(&self, results: &[ProcessedResult]) -> Vec<RepeatSpan> {
        let present: Vec<(usize, &ProcessedResult)> = results
            .iter()
            .enumerate()
            .filter(|(_, result)| result.is_present())
            .collect();

        let last = present.len().saturating_sub(1);

        present
            .iter()
            .enumerate()
            .map(|(i, &(position, result))| {
                let repeats = if i < last {
                    self.step
                } else {
                    let covered = result.original_index / self.step * self.step;
                    self.total_frames.saturating_sub(covered)
                };

                RepeatSpan {
                    position,
                    original_index: result.original_index,
                    repeats,
                }
            })
            .collect()
    }

    /// Total frames a plan will write
    pub fn planned_frames(plan: &[RepeatSpan]) -> usize {
        plan.iter().map(|span| span.repeats).sum()
    }

    /// Write the planned frames to `sink` in order and return how many were written
    pub fn write<K: VideoSink + ?Sized>(
        &self,
        plan: &[RepeatSpan],
        results: &[ProcessedResult],
        sink: &mut K,
        progress: &dyn ProgressSink,
    ) -> Result<usize> {
        let mut written = 0;

        for span in plan {
            let Some(frame) = results.get(span.position).and_then(|r| r.frame.as_ref()) else {
                continue;
            };

            for _ in 0..span.repeats {
                sink.write_frame(frame)?;
                written += 1;
                progress.on_progress(&ProgressUpdate {
                    phase: PipelinePhase::Writing,
                    current: written,
                    total: self.total_frames,
                });
            }
        }

        if written < self.total_frames {
            warn!(
                "Output is {} frames short of the source ({} / {})",
                self.total_frames - written,
                written,
                self.total_frames
            );
        } else {
            info!("Wrote {} frames", written);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::progress::NoOpProgress;
    use crate::video::{Frame, MemorySink, VideoDescriptor};

    fn results(indices: &[usize], absent: &[usize]) -> Vec<ProcessedResult> {
        indices
            .iter()
            .map(|&i| {
                if absent.contains(&i) {
                    ProcessedResult::absent(i)
                } else {
                    ProcessedResult::present(i, Frame::new_filled(2, 2, [i as u8, 0, 0]))
                }
            })
            .collect()
    }

    fn repeats(plan: &[RepeatSpan]) -> Vec<usize> {
        plan.iter().map(|s| s.repeats).collect()
    }

    #[test]
    fn test_full_plan_matches_total() {
        let reconstructor = FrameReconstructor::new(3, 10).unwrap();
        let plan = reconstructor.plan(&results(&[0, 3, 6, 9], &[]));
        assert_eq!(repeats(&plan), vec![3, 3, 3, 1]);
        assert_eq!(FrameReconstructor::planned_frames(&plan), 10);
    }

    #[test]
    fn test_dropped_middle_keyframe_shortens_output() {
        let reconstructor = FrameReconstructor::new(3, 12).unwrap();
        let plan = reconstructor.plan(&results(&[0, 3, 6, 9], &[3]));
        assert_eq!(repeats(&plan), vec![3, 3, 3]);
        assert_eq!(FrameReconstructor::planned_frames(&plan), 12 - 3);
    }

    #[test]
    fn test_dropped_last_keyframe_is_absorbed() {
        let reconstructor = FrameReconstructor::new(3, 12).unwrap();
        let plan = reconstructor.plan(&results(&[0, 3, 6, 9], &[9]));
        assert_eq!(repeats(&plan), vec![3, 3, 6]);
        assert_eq!(FrameReconstructor::planned_frames(&plan), 12);
    }

    #[test]
    fn test_single_result_fills_from_its_index() {
        let reconstructor = FrameReconstructor::new(5, 23).unwrap();
        let plan = reconstructor.plan(&results(&[0, 5, 10, 15, 20], &[0, 5, 10, 20]));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].original_index, 15);
        assert_eq!(plan[0].repeats, 23 - 15);
    }

    #[test]
    fn test_nothing_present() {
        let reconstructor = FrameReconstructor::new(2, 6).unwrap();
        assert!(reconstructor.plan(&results(&[0, 2, 4], &[0, 2, 4])).is_empty());
        assert!(reconstructor.plan(&[]).is_empty());
    }

    #[test]
    fn test_write_emits_in_temporal_order() {
        let reconstructor = FrameReconstructor::new(2, 5).unwrap();
        let processed = results(&[0, 2, 4], &[]);
        let plan = reconstructor.plan(&processed);

        let mut sink = MemorySink::new(VideoDescriptor::new(30.0, 5, 2, 2));
        let written = reconstructor.write(&plan, &processed, &mut sink, &NoOpProgress).unwrap();

        assert_eq!(written, 5);
        let reds: Vec<u8> = sink.frames().iter().map(|f| f.get_pixel(0, 0)[0]).collect();
        assert_eq!(reds, vec![0, 0, 2, 2, 4]);
    }
}
