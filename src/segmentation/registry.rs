use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    error::{Result, SegmentationError},
    segmentation::{GridSegmenter, Segmenter, SlicSegmenter},
};

/// Registry for the available segmenters
///
/// Segmenters are registered by name and instantiated on lookup. Instances
/// are handed out as `Arc` because the worker pool shares one segmenter
/// across all of its threads.
pub struct SegmenterRegistry {
    factories: HashMap<String, Box<dyn Fn() -> Arc<dyn Segmenter> + Send + Sync>>,
}

impl SegmenterRegistry {
    /// Create a new registry with all built-in segmenters
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };

        registry.register("slic", || Arc::new(SlicSegmenter::new()));
        registry.register("grid", || Arc::new(GridSegmenter::new()));
        registry
    }

    /// Register a custom segmenter, replacing any existing one with that name
    pub fn register<N, F>(&mut self, name: N, factory: F)
    where
        N: Into<String>,
        F: Fn() -> Arc<dyn Segmenter> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Get a segmenter by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Segmenter>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Like [`get`](Self::get) but fails with [`SegmentationError::NotFound`]
    pub fn require(&self, name: &str) -> Result<Arc<dyn Segmenter>> {
        self.get(name).ok_or_else(|| {
            SegmentationError::NotFound {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Get all available segmenter names, sorted
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for SegmenterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_segmenters_available() {
        let registry = SegmenterRegistry::new();
        assert!(registry.contains("slic"));
        assert!(registry.contains("grid"));
        assert_eq!(registry.available(), vec!["grid".to_string(), "slic".to_string()]);
    }

    #[test]
    fn test_get_segmenter() {
        let registry = SegmenterRegistry::new();
        assert_eq!(registry.get("slic").unwrap().name(), "slic");
        assert!(registry.get("watershed").is_none());
        assert!(registry.require("watershed").is_err());
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = SegmenterRegistry::new();
        registry.register("blocks", || Arc::new(GridSegmenter::new()));
        assert!(registry.contains("blocks"));
        assert_eq!(registry.len(), 3);
    }
}
