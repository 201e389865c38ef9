use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SegmentationError},
    segmentation::color::LabFrame,
};

/// Core trait for superpixel segmenters
///
/// A segmenter partitions a frame into spatially coherent regions and
/// replaces every pixel with the mean color of its region. Segmenters are
/// called from several worker threads at once, so `segment` must be a pure
/// function of its inputs with no shared mutable state.
pub trait Segmenter: Send + Sync {
    /// Returns the unique name of this segmenter
    fn name(&self) -> &str;

    /// Returns a human-readable description of this segmenter
    fn description(&self) -> &str;

    /// Segment a frame and flatten each region to its mean color
    ///
    /// # Arguments
    ///
    /// * `frame` - The input frame in Lab space
    /// * `params` - Tuning parameters (segment count, compactness, smoothing)
    ///
    /// # Returns
    ///
    /// A frame with the same dimensions as `frame`, or an error if the
    /// parameters are invalid or segmentation failed.
    fn segment(&self, frame: &LabFrame, params: &SegmentationParams) -> Result<LabFrame>;
}

/// Tuning parameters shared by all segmenters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    /// Approximate number of superpixels per frame
    pub segments: usize,

    /// Trade-off between spatial regularity (high) and color fidelity (low)
    pub compactness: f32,

    /// Gaussian smoothing applied before clustering (0 disables it)
    pub sigma: f32,

    /// Number of clustering refinement passes
    pub max_iterations: usize,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            segments: 500,
            compactness: 5.0,
            sigma: 1.0,
            max_iterations: 10,
        }
    }
}

impl SegmentationParams {
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, value: String| SegmentationError::InvalidParameter {
            key: key.to_string(),
            value,
        };

        if self.segments == 0 {
            return Err(invalid("segments", self.segments.to_string()).into());
        }

        if !(self.compactness.is_finite() && self.compactness > 0.0) {
            return Err(invalid("compactness", self.compactness.to_string()).into());
        }

        if !(self.sigma.is_finite() && self.sigma >= 0.0) {
            return Err(invalid("sigma", self.sigma.to_string()).into());
        }

        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", self.max_iterations.to_string()).into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        assert!(SegmentationParams::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_params() {
        let params = SegmentationParams { segments: 0, ..Default::default() };
        assert!(params.validate().is_err());

        let params = SegmentationParams { compactness: 0.0, ..Default::default() };
        assert!(params.validate().is_err());

        let params = SegmentationParams { sigma: -1.0, ..Default::default() };
        assert!(params.validate().is_err());

        let params = SegmentationParams { sigma: 0.0, ..Default::default() };
        assert!(params.validate().is_ok());
    }
}
