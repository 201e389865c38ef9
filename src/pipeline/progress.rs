//! Progress reporting for conversions.
//!
//! The pipeline never writes to the console itself; it reports phase
//! changes and per-item progress to a [`ProgressSink`] supplied by the
//! caller. The CLI renders these as progress bars.

use std::fmt;

/// States of a conversion run
///
/// A run moves `Idle → Sampling → Segmenting → Reconstructing → Writing`
/// and ends in `Done`, or in `Failed` when a fatal error aborts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelinePhase {
    Idle,
    Sampling,
    Segmenting,
    Reconstructing,
    Writing,
    Done,
    Failed,
}

impl PipelinePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Sampling => "sampling",
            Self::Segmenting => "segmenting",
            Self::Reconstructing => "reconstructing",
            Self::Writing => "writing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A progress snapshot within one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// `Segmenting` (keyframes completed) or `Writing` (output frames written)
    pub phase: PipelinePhase,
    pub current: usize,
    pub total: usize,
}

impl ProgressUpdate {
    /// Completion percentage (0.0 – 100.0); 100 when there is nothing to do
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            100.0
        } else {
            self.current as f32 / self.total as f32 * 100.0
        }
    }
}

/// Receiver for conversion progress
///
/// Implementations must be [`Send`] and [`Sync`]: segmentation progress is
/// reported from worker threads as tasks complete, in completion order.
pub trait ProgressSink: Send + Sync {
    /// Called when the pipeline enters a new phase
    fn on_phase(&self, phase: PipelinePhase) {
        let _ = phase;
    }

    fn on_progress(&self, update: &ProgressUpdate);
}

/// Discards all progress notifications. This is the engine's default.
pub struct NoOpProgress;

impl ProgressSink for NoOpProgress {
    fn on_progress(&self, _update: &ProgressUpdate) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        let update = ProgressUpdate { phase: PipelinePhase::Writing, current: 45, total: 90 };
        assert_eq!(update.percentage(), 50.0);

        let empty = ProgressUpdate { phase: PipelinePhase::Segmenting, current: 0, total: 0 };
        assert_eq!(empty.percentage(), 100.0);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(PipelinePhase::Done.is_terminal());
        assert!(PipelinePhase::Failed.is_terminal());
        assert!(!PipelinePhase::Writing.is_terminal());
        assert_eq!(PipelinePhase::Segmenting.to_string(), "segmenting");
    }
}
