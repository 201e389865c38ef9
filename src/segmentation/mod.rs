//! # Segmentation
//!
//! The per-frame transform of the pipeline. A [`Segmenter`] partitions a
//! frame into superpixels and flattens each one to its mean color; it works
//! in CIE L*a*b* ([`LabFrame`]) so regions follow perceived color.
//!
//! ## Built-in Segmenters
//!
//! - **slic**: SLIC superpixels (default)
//! - **grid**: fixed square blocks
//!
//! ## Usage
//!
//! ```rust
//! use superpixel_animator::segmentation::{LabFrame, SegmentationParams, SegmenterRegistry};
//! use superpixel_animator::video::Frame;
//!
//! let registry = SegmenterRegistry::new();
//! let slic = registry.get("slic").unwrap();
//!
//! let frame = Frame::new_filled(64, 48, [200, 40, 40]);
//! let flat = slic.segment(&LabFrame::from_frame(&frame), &SegmentationParams::default()).unwrap();
//! assert_eq!(flat.to_frame().width(), 64);
//! ```

pub mod color;
pub mod grid;
pub mod registry;
pub mod slic;
pub mod traits;

pub use color::LabFrame;
pub use grid::GridSegmenter;
pub use registry::SegmenterRegistry;
pub use slic::SlicSegmenter;
pub use traits::{SegmentationParams, Segmenter};
