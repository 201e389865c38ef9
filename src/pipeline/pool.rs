use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result, SegmentationError, VideoError};
use crate::pipeline::progress::{PipelinePhase, ProgressSink, ProgressUpdate};
use crate::segmentation::{LabFrame, SegmentationParams, Segmenter};
use crate::video::{Frame, Keyframe, ProcessedResult, VideoDescriptor};

/// Number of segmentation workers for a batch
///
/// One core is left for the caller, the batch never gets more workers than
/// keyframes, and `hard_cap` bounds the rest. Non-empty batches always get at
/// least one worker.
pub fn worker_bound(available: usize, keyframes: usize, hard_cap: usize) -> usize {
    if keyframes == 0 {
        return 0;
    }
    available
        .saturating_sub(1)
        .min(keyframes)
        .min(hard_cap)
        .max(1)
}

/// Segments keyframes in parallel on a bounded rayon pool
///
/// Results come back in submission order no matter which task finishes
/// first. A keyframe whose segmentation errors, panics or yields a frame of
/// the wrong size becomes an absent result; its siblings are unaffected.
/// There is no per-task timeout: a segmenter that never returns blocks
/// [`process`](Self::process).
pub struct SegmentationWorkerPool {
    segmenter: Arc<dyn Segmenter>,
    params: SegmentationParams,
    max_workers: usize,
    available: usize,
}

impl SegmentationWorkerPool {
    pub fn new(
        segmenter: Arc<dyn Segmenter>,
        params: SegmentationParams,
        max_workers: usize,
    ) -> Self {
        Self {
            segmenter,
            params,
            max_workers: max_workers.max(1),
            available: num_cpus::get(),
        }
    }

    /// Size the pool as if `available` cores were present instead of the detected count
    pub fn with_available_parallelism(mut self, available: usize) -> Self {
        self.available = available;
        self
    }

    pub fn worker_count(&self, keyframes: usize) -> usize {
        worker_bound(self.available, keyframes, self.max_workers)
    }

    /// Segment every keyframe and block until all are done
    ///
    /// Returns one [`ProcessedResult`] per keyframe, in the order given.
    /// Progress is reported as each task completes.
    pub fn process(
        &self,
        keyframes: Vec<Keyframe>,
        descriptor: &VideoDescriptor,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<ProcessedResult>> {
        let total = keyframes.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let workers = self.worker_count(total);
        info!(
            "Segmenting {} keyframes with {} on {} workers",
            total,
            self.segmenter.name(),
            workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("segment-{}", i))
            .build()
            .map_err(|e| PipelineError::WorkerPoolFailed { reason: e.to_string() })?;

        let completed = AtomicUsize::new(0);

        // Indexed collect writes each result into the slot of its keyframe,
        // so completion order never leaks into the output order.
        let results: Vec<ProcessedResult> = pool.install(|| {
            keyframes
                .into_par_iter()
                .map(|keyframe| {
                    let index = keyframe.original_index;
                    let result = match self.segment_keyframe(&keyframe.frame, descriptor) {
                        Ok(frame) => ProcessedResult::present(index, frame),
                        Err(e) => {
                            warn!("Dropping keyframe {}: {}", index, e);
                            ProcessedResult::absent(index)
                        }
                    };

                    let current = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    progress.on_progress(&ProgressUpdate {
                        phase: PipelinePhase::Segmenting,
                        current,
                        total,
                    });
                    result
                })
                .collect()
        });

        let present = results.iter().filter(|r| r.is_present()).count();
        info!("Segmented {}/{} keyframes", present, total);
        Ok(results)
    }

    /// Lab round trip through the segmenter plus output validation
    fn segment_keyframe(&self, frame: &Frame, descriptor: &VideoDescriptor) -> Result<Frame> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let lab = LabFrame::from_frame(frame);
            self.segmenter
                .segment(&lab, &self.params)
                .map(|segmented| segmented.to_frame())
        }));

        let segmented = match outcome {
            Ok(result) => result?,
            Err(payload) => {
                return Err(SegmentationError::Panicked {
                    message: panic_message(payload.as_ref()),
                }
                .into())
            }
        };

        if !segmented.matches(descriptor) {
            return Err(VideoError::DimensionMismatch {
                expected_width: descriptor.width,
                expected_height: descriptor.height,
                actual_width: segmented.width(),
                actual_height: segmented.height(),
            }
            .into());
        }

        debug!("Segmented {}x{} frame", segmented.width(), segmented.height());
        Ok(segmented)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::pipeline::progress::NoOpProgress;
    use crate::segmentation::GridSegmenter;

    #[test]
    fn test_worker_bound() {
        assert_eq!(worker_bound(8, 100, 16), 7);
        assert_eq!(worker_bound(64, 100, 16), 16);
        assert_eq!(worker_bound(8, 3, 16), 3);
        assert_eq!(worker_bound(1, 10, 16), 1);
        assert_eq!(worker_bound(0, 10, 16), 1);
        assert_eq!(worker_bound(8, 0, 16), 0);
    }

    #[test]
    fn test_empty_batch() {
        let grid = Arc::new(GridSegmenter::new());
        let pool = SegmentationWorkerPool::new(grid, SegmentationParams::default(), 4);
        let descriptor = VideoDescriptor::new(30.0, 0, 4, 4);
        let results = pool.process(Vec::new(), &descriptor, &NoOpProgress).unwrap();
        assert!(results.is_empty());
    }

    /// Sleeps on the frame whose first pixel is `slow` and logs completion order
    struct SlowOnOne {
        slow: [f32; 3],
        finished: Mutex<Vec<[f32; 3]>>,
    }

    impl Segmenter for SlowOnOne {
        fn name(&self) -> &str {
            "slow-on-one"
        }

        fn description(&self) -> &str {
            "Delays a single frame"
        }

        fn segment(&self, frame: &LabFrame, _params: &SegmentationParams) -> Result<LabFrame> {
            let first = frame.get(0, 0);
            if first == self.slow {
                std::thread::sleep(Duration::from_millis(300));
            }
            self.finished.lock().unwrap().push(first);
            Ok(frame.clone())
        }
    }

    #[test]
    fn test_results_keep_submission_order_when_first_finishes_last() {
        let frames: Vec<Frame> = [10u8, 120, 240]
            .iter()
            .map(|&v| Frame::new_filled(6, 4, [v, v, v]))
            .collect();
        let labs: Vec<[f32; 3]> = frames
            .iter()
            .map(|f| LabFrame::from_frame(f).get(0, 0))
            .collect();

        let segmenter = Arc::new(SlowOnOne {
            slow: labs[0],
            finished: Mutex::new(Vec::new()),
        });
        let pool = SegmentationWorkerPool::new(segmenter.clone(), SegmentationParams::default(), 4)
            .with_available_parallelism(4);
        assert_eq!(pool.worker_count(3), 3);

        let keyframes = frames
            .into_iter()
            .enumerate()
            .map(|(i, frame)| Keyframe::new(i * 3, frame))
            .collect();
        let descriptor = VideoDescriptor::new(30.0, 9, 6, 4);
        let results = pool.process(keyframes, &descriptor, &NoOpProgress).unwrap();

        // The delayed first keyframe completed after the others
        let finished = segmenter.finished.lock().unwrap().clone();
        assert_eq!(finished.len(), 3);
        assert_eq!(finished.last(), Some(&labs[0]));

        let indices: Vec<usize> = results.iter().map(|r| r.original_index).collect();
        assert_eq!(indices, vec![0, 3, 6]);
        for (result, lab) in results.iter().zip(&labs) {
            let frame = result.frame.as_ref().unwrap();
            assert_eq!(LabFrame::from_frame(frame).get(0, 0), *lab);
        }
    }

    #[test]
    fn test_available_parallelism_override() {
        let grid = Arc::new(GridSegmenter::new());
        let pool = SegmentationWorkerPool::new(grid, SegmentationParams::default(), 16)
            .with_available_parallelism(1);
        assert_eq!(pool.worker_count(10), 1);
        let pool = pool.with_available_parallelism(9);
        assert_eq!(pool.worker_count(10), 8);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
