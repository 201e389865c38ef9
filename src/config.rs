use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    segmentation::SegmentationParams,
};

/// Upper bound on segmentation workers regardless of core count
pub const DEFAULT_MAX_WORKERS: usize = 16;

/// Main configuration for the superpixel animator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Sampling and worker pool settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Segmenter choice and tuning
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// External tool locations
    #[serde(default)]
    pub video: VideoConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string(),
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        self.segmentation.validate()?;
        self.video.validate()?;
        Ok(())
    }
}

/// Keyframe sampling and worker pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sampling stride: every `step`-th frame is segmented and held for `step` frames
    pub step: usize,

    /// Hard cap on concurrent segmentation workers
    pub max_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            step: 5,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<()> {
        if self.step == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.step".to_string(),
                value: self.step.to_string(),
            }
            .into());
        }

        if self.max_workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.max_workers".to_string(),
                value: self.max_workers.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Segmentation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Registered segmenter name (`slic`, `grid`)
    pub segmenter: String,

    /// Tuning parameters passed to the segmenter
    pub params: SegmentationParams,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            segmenter: "slic".to_string(),
            params: SegmentationParams::default(),
        }
    }
}

impl SegmentationConfig {
    fn validate(&self) -> Result<()> {
        if self.segmenter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "segmentation.segmenter".to_string(),
                value: self.segmenter.clone(),
            }
            .into());
        }

        self.params.validate().map_err(|e| ConfigError::InvalidValue {
            key: "segmentation.params".to_string(),
            value: e.to_string(),
        })?;

        Ok(())
    }
}

/// Locations of the external ffmpeg tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

impl VideoConfig {
    fn validate(&self) -> Result<()> {
        let paths = [
            ("video.ffmpeg_path", &self.ffmpeg_path),
            ("video.ffprobe_path", &self.ffprobe_path),
        ];
        for (key, value) in paths {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.step, 5);
        assert_eq!(config.segmentation.params.segments, 500);
        assert_eq!(config.segmentation.params.compactness, 5.0);
        assert_eq!(config.segmentation.params.sigma, 1.0);
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let mut original_config = Config::default();
        original_config.pipeline.step = 3;
        original_config.segmentation.segmenter = "grid".to_string();

        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(&file_path, "[pipeline]\nstep = 2\nmax_workers = 4\n").unwrap();

        let config = Config::from_file(&file_path).unwrap();
        assert_eq!(config.pipeline.step, 2);
        assert_eq!(config.segmentation, SegmentationConfig::default());
    }

    #[test]
    fn test_partial_params_table() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("params.toml");
        std::fs::write(&file_path, "[segmentation]\nsegmenter = \"grid\"\n\n[segmentation.params]\nsegments = 200\n").unwrap();

        let config = Config::from_file(&file_path).unwrap();
        assert_eq!(config.segmentation.segmenter, "grid");
        assert_eq!(config.segmentation.params.segments, 200);
        assert_eq!(config.segmentation.params.compactness, 5.0);
        assert_eq!(config.pipeline, PipelineConfig::default());
    }

    #[test]
    fn test_missing_file() {
        assert!(Config::from_file("no/such/config.toml").is_err());
    }

    #[test]
    fn test_zero_step_is_invalid() {
        let mut config = Config::default();
        config.pipeline.step = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_segmentation_params() {
        let mut config = Config::default();
        config.segmentation.params.compactness = 0.0;
        assert!(config.validate().is_err());
    }
}
