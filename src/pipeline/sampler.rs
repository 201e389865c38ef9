use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};
use crate::video::{Keyframe, VideoSource};

/// Selects every `step`-th frame of a source as a keyframe
#[derive(Debug, Clone, Copy)]
pub struct FrameSampler {
    step: usize,
}

impl FrameSampler {
    pub fn new(step: usize) -> Result<Self> {
        if step == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.step".to_string(),
                value: step.to_string(),
            }
            .into());
        }
        Ok(Self { step })
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Keyframe indices `0, step, 2·step, …` below `total_frames`
    pub fn indices(&self, total_frames: usize) -> impl Iterator<Item = usize> {
        (0..total_frames).step_by(self.step)
    }

    /// Number of keyframes for a video of `total_frames` frames, `⌈total / step⌉`
    pub fn keyframe_count(&self, total_frames: usize) -> usize {
        total_frames.div_ceil(self.step)
    }

    /// Read every keyframe from `source`
    ///
    /// Frames that fail to read are skipped with a warning, so the result may
    /// be shorter than [`keyframe_count`](Self::keyframe_count). Each keyframe
    /// keeps its index in the source.
    pub fn sample<S: VideoSource + ?Sized>(&self, source: &mut S) -> Vec<Keyframe> {
        let total_frames = source.descriptor().total_frames;
        let expected = self.keyframe_count(total_frames);
        let mut keyframes = Vec::with_capacity(expected);

        for index in self.indices(total_frames) {
            match source.read_frame(index) {
                Ok(frame) => {
                    debug!("Sampled keyframe {}", index);
                    keyframes.push(Keyframe::new(index, frame));
                }
                Err(e) => warn!("Skipping keyframe {}: {}", index, e),
            }
        }

        info!("Sampled {}/{} keyframes (step {})", keyframes.len(), expected, self.step);
        keyframes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::{Frame, MemorySource};

    fn source(total: usize) -> MemorySource {
        let frames = (0..total)
            .map(|i| Some(Frame::new_filled(4, 4, [i as u8, 0, 0])))
            .collect();
        MemorySource::new(30.0, 4, 4, frames)
    }

    #[test]
    fn test_indices() {
        let sampler = FrameSampler::new(3).unwrap();
        assert_eq!(sampler.indices(10).collect::<Vec<_>>(), vec![0, 3, 6, 9]);
        assert_eq!(sampler.indices(9).collect::<Vec<_>>(), vec![0, 3, 6]);
        assert_eq!(sampler.indices(0).count(), 0);
    }

    #[test]
    fn test_keyframe_count_is_ceiling() {
        for (total, step) in [(90, 3), (91, 3), (1, 5), (0, 5), (7, 1), (4, 10)] {
            let sampler = FrameSampler::new(step).unwrap();
            assert_eq!(sampler.keyframe_count(total), (total + step - 1) / step);
            assert_eq!(sampler.indices(total).count(), sampler.keyframe_count(total));
        }
    }

    #[test]
    fn test_zero_step_rejected() {
        assert!(FrameSampler::new(0).is_err());
    }

    #[test]
    fn test_sample_tags_original_index() {
        let mut source = source(12);
        let keyframes = FrameSampler::new(5).unwrap().sample(&mut source);

        let indices: Vec<usize> = keyframes.iter().map(|k| k.original_index).collect();
        assert_eq!(indices, vec![0, 5, 10]);
        assert_eq!(keyframes[2].frame.get_pixel(0, 0), [10, 0, 0]);
        assert_eq!(source.reads(), &[0, 5, 10]);
    }

    #[test]
    fn test_sample_skips_unreadable_frames() {
        let mut frames: Vec<Option<Frame>> =
            (0..10).map(|_| Some(Frame::new_black(4, 4))).collect();
        frames[4] = None;
        let mut source = MemorySource::new(30.0, 4, 4, frames);

        let keyframes = FrameSampler::new(2).unwrap().sample(&mut source);
        let indices: Vec<usize> = keyframes.iter().map(|k| k.original_index).collect();
        assert_eq!(indices, vec![0, 2, 6, 8]);
    }
}
