use crate::{
    error::{Result, SegmentationError},
    segmentation::{color::LabFrame, traits::Segmenter, SegmentationParams},
};

/// Regular grid of square cells sized so that roughly `segments` cells cover
/// the frame. SLIC seeds its cluster centers from the cell centers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SeedGrid {
    pub width: usize,
    pub height: usize,
    /// Cell edge length in pixels (the SLIC interval `S`)
    pub step: f32,
    pub columns: usize,
    pub rows: usize,
}

impl SeedGrid {
    pub fn new(width: usize, height: usize, segments: usize) -> Self {
        let pixels = (width * height).max(1);
        let segments = segments.clamp(1, pixels);
        let step = (pixels as f32 / segments as f32).sqrt().max(1.0);
        let columns = ((width as f32 / step).ceil() as usize).max(1);
        let rows = ((height as f32 / step).ceil() as usize).max(1);

        Self {
            width,
            height,
            step,
            columns,
            rows,
        }
    }

    pub fn cells(&self) -> usize {
        self.columns * self.rows
    }

    /// Cell id of pixel `(x, y)`
    pub fn cell_of(&self, x: usize, y: usize) -> usize {
        let column = ((x as f32 / self.step) as usize).min(self.columns - 1);
        let row = ((y as f32 / self.step) as usize).min(self.rows - 1);
        row * self.columns + column
    }

    /// Pixel coordinates of each cell's center, in cell-id order
    pub fn centers(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        (0..self.rows).flat_map(move |row| {
            (0..self.columns).map(move |column| {
                (
                    ((column as f32 + 0.5) * self.step).min(max_x),
                    ((row as f32 + 0.5) * self.step).min(max_y),
                )
            })
        })
    }

    /// Row-major cell assignment for every pixel
    pub fn labels(&self) -> Vec<usize> {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .map(|(x, y)| self.cell_of(x, y))
            .collect()
    }
}

/// Block averaging over a fixed grid
///
/// Cheap stand-in for SLIC that ignores image content: every grid cell
/// becomes one flat region. Only the segment count is used.
pub struct GridSegmenter;

impl GridSegmenter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GridSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for GridSegmenter {
    fn name(&self) -> &str {
        "grid"
    }

    fn description(&self) -> &str {
        "Fixed square blocks, each filled with its mean color"
    }

    fn segment(&self, frame: &LabFrame, params: &SegmentationParams) -> Result<LabFrame> {
        params.validate()?;

        if frame.width() == 0 || frame.height() == 0 {
            return Err(SegmentationError::Failed {
                reason: "empty frame".to_string(),
            }
            .into());
        }

        let grid = SeedGrid::new(frame.width() as usize, frame.height() as usize, params.segments);
        Ok(frame.with_region_means(&grid.labels(), grid.cells()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_grid_covers_frame() {
        let grid = SeedGrid::new(100, 50, 50);
        assert_eq!(grid.step, 10.0);
        assert_eq!((grid.columns, grid.rows), (10, 5));
        assert_eq!(grid.cell_of(0, 0), 0);
        assert_eq!(grid.cell_of(99, 49), grid.cells() - 1);
        assert_eq!(grid.centers().count(), grid.cells());
    }

    #[test]
    fn test_seed_grid_clamps_segment_count() {
        let grid = SeedGrid::new(3, 2, 1000);
        assert_eq!(grid.step, 1.0);
        assert_eq!(grid.cells(), 6);
    }

    #[test]
    fn test_grid_segmenter_flattens_blocks() {
        // 4x2 frame, two 2x2 blocks with different lightness
        let pixels = vec![
            [10.0, 0.0, 0.0], [20.0, 0.0, 0.0], [60.0, 0.0, 0.0], [60.0, 0.0, 0.0],
            [30.0, 0.0, 0.0], [40.0, 0.0, 0.0], [80.0, 0.0, 0.0], [80.0, 0.0, 0.0],
        ];
        let frame = LabFrame::new(4, 2, pixels).unwrap();
        let params = SegmentationParams { segments: 2, ..Default::default() };

        let out = GridSegmenter::new().segment(&frame, &params).unwrap();
        assert_eq!(out.get(0, 0), [25.0, 0.0, 0.0]);
        assert_eq!(out.get(1, 1), [25.0, 0.0, 0.0]);
        assert_eq!(out.get(3, 0), [70.0, 0.0, 0.0]);
    }
}
