// SLIC superpixels: k-means over (L, a, b, x, y) restricted to a local window

use crate::{
    error::{Result, SegmentationError},
    segmentation::{color::LabFrame, grid::SeedGrid, traits::Segmenter, SegmentationParams},
};

/// Simple Linear Iterative Clustering segmenter
///
/// Cluster centers are seeded on a regular grid with interval `S` and refined
/// for `max_iterations` passes. Each pass assigns every pixel inside a
/// `2S x 2S` window around a center to that center when the combined
/// distance `d_lab² + (d_xy / S)² · m²` is smaller than its current best,
/// where `m` is the compactness. Region means are taken over the unsmoothed
/// input so smoothing only influences the boundaries.
///
/// Connectivity is not enforced: a cluster may own disjoint patches.
pub struct SlicSegmenter;

#[derive(Debug, Clone, Copy)]
struct Center {
    lab: [f32; 3],
    x: f32,
    y: f32,
}

impl SlicSegmenter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SlicSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for SlicSegmenter {
    fn name(&self) -> &str {
        "slic"
    }

    fn description(&self) -> &str {
        "SLIC superpixels in Lab space, each filled with its mean color"
    }

    fn segment(&self, frame: &LabFrame, params: &SegmentationParams) -> Result<LabFrame> {
        params.validate()?;

        let width = frame.width() as usize;
        let height = frame.height() as usize;
        if width == 0 || height == 0 {
            return Err(SegmentationError::Failed {
                reason: "empty frame".to_string(),
            }
            .into());
        }

        let smoothed = if params.sigma > 0.0 {
            gaussian_blur(frame.pixels(), width, height, params.sigma)
        } else {
            frame.pixels().to_vec()
        };

        let grid = SeedGrid::new(width, height, params.segments);
        let step = grid.step;
        let spatial_weight = (params.compactness / step).powi(2);

        let mut centers: Vec<Center> = grid
            .centers()
            .map(|(x, y)| Center {
                lab: smoothed[y.round() as usize * width + x.round() as usize],
                x,
                y,
            })
            .collect();

        // Start from the grid partition so pixels no window reaches keep a label
        let mut labels = grid.labels();
        let mut distances = vec![f32::INFINITY; width * height];

        for _ in 0..params.max_iterations {
            distances.fill(f32::INFINITY);

            for (id, center) in centers.iter().enumerate() {
                let x0 = (center.x - step).floor().max(0.0) as usize;
                let y0 = (center.y - step).floor().max(0.0) as usize;
                let x1 = ((center.x + step).ceil() as usize).min(width - 1);
                let y1 = ((center.y + step).ceil() as usize).min(height - 1);

                for y in y0..=y1 {
                    let dy = y as f32 - center.y;
                    for x in x0..=x1 {
                        let i = y * width + x;
                        let pixel = smoothed[i];
                        let dx = x as f32 - center.x;

                        let color = (pixel[0] - center.lab[0]).powi(2)
                            + (pixel[1] - center.lab[1]).powi(2)
                            + (pixel[2] - center.lab[2]).powi(2);
                        let distance = color + (dx * dx + dy * dy) * spatial_weight;

                        if distance < distances[i] {
                            distances[i] = distance;
                            labels[i] = id;
                        }
                    }
                }
            }

            update_centers(&mut centers, &smoothed, &labels, width);
        }

        Ok(frame.with_region_means(&labels, centers.len()))
    }
}

/// Move each center to the mean position and color of its pixels.
/// Centers that lost all their pixels stay where they are.
fn update_centers(centers: &mut [Center], pixels: &[[f32; 3]], labels: &[usize], width: usize) {
    let mut sums = vec![[0f64; 5]; centers.len()];
    let mut counts = vec![0usize; centers.len()];

    for (i, (pixel, &label)) in pixels.iter().zip(labels).enumerate() {
        let sum = &mut sums[label];
        sum[0] += pixel[0] as f64;
        sum[1] += pixel[1] as f64;
        sum[2] += pixel[2] as f64;
        sum[3] += (i % width) as f64;
        sum[4] += (i / width) as f64;
        counts[label] += 1;
    }

    for ((center, sum), &count) in centers.iter_mut().zip(&sums).zip(&counts) {
        if count == 0 {
            continue;
        }
        let n = count as f64;
        center.lab = [(sum[0] / n) as f32, (sum[1] / n) as f32, (sum[2] / n) as f32];
        center.x = (sum[3] / n) as f32;
        center.y = (sum[4] / n) as f32;
    }
}

/// Separable Gaussian blur with clamped edges, kernel radius `ceil(3σ)`
///
/// The radius never exceeds the larger frame side: taps past the edge only
/// resample clamped border pixels.
fn gaussian_blur(pixels: &[[f32; 3]], width: usize, height: usize, sigma: f32) -> Vec<[f32; 3]> {
    let max_radius = width.max(height) as f32;
    let radius = (3.0 * sigma).ceil().min(max_radius) as isize;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|k| (-(k * k) as f32 / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= total);

    let convolve = |source: &[[f32; 3]], horizontal: bool| -> Vec<[f32; 3]> {
        let mut out = vec![[0f32; 3]; source.len()];
        for y in 0..height {
            for x in 0..width {
                let mut acc = [0f32; 3];
                for (k, weight) in kernel.iter().enumerate() {
                    let offset = k as isize - radius;
                    let (sx, sy) = if horizontal {
                        ((x as isize + offset).clamp(0, width as isize - 1) as usize, y)
                    } else {
                        (x, (y as isize + offset).clamp(0, height as isize - 1) as usize)
                    };
                    let sample = source[sy * width + sx];
                    acc[0] += sample[0] * weight;
                    acc[1] += sample[1] * weight;
                    acc[2] += sample[2] * weight;
                }
                out[y * width + x] = acc;
            }
        }
        out
    };

    let horizontal = convolve(pixels, true);
    convolve(&horizontal, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn split_frame(width: u32, height: u32) -> LabFrame {
        // Dark left half, bright right half
        let pixels = (0..height)
            .flat_map(|_| {
                (0..width).map(move |x| {
                    if x < width / 2 {
                        [20.0, 10.0, -10.0]
                    } else {
                        [80.0, -5.0, 30.0]
                    }
                })
            })
            .collect();
        LabFrame::new(width, height, pixels).unwrap()
    }

    #[test]
    fn test_output_has_input_dimensions() {
        let frame = split_frame(37, 23);
        let out = SlicSegmenter::new()
            .segment(&frame, &SegmentationParams::default())
            .unwrap();
        assert_eq!((out.width(), out.height()), (37, 23));
    }

    #[test]
    fn test_regions_do_not_mix_distinct_colors() {
        let frame = split_frame(40, 20);
        let params = SegmentationParams {
            segments: 8,
            sigma: 0.0,
            ..Default::default()
        };

        let out = SlicSegmenter::new().segment(&frame, &params).unwrap();
        for y in 0..20 {
            assert_eq!(out.get(0, y), [20.0, 10.0, -10.0]);
            assert_eq!(out.get(39, y), [80.0, -5.0, 30.0]);
        }
    }

    #[test]
    fn test_number_of_colors_is_bounded_by_seeds() {
        let pixels = (0..30 * 30)
            .map(|i| [(i % 97) as f32, (i % 13) as f32, (i % 7) as f32])
            .collect();
        let frame = LabFrame::new(30, 30, pixels).unwrap();
        let params = SegmentationParams { segments: 9, ..Default::default() };

        let out = SlicSegmenter::new().segment(&frame, &params).unwrap();
        let colors: HashSet<[u32; 3]> = out
            .pixels()
            .iter()
            .map(|p| [p[0].to_bits(), p[1].to_bits(), p[2].to_bits()])
            .collect();
        assert!(colors.len() <= SeedGrid::new(30, 30, 9).cells());
    }

    #[test]
    fn test_uniform_frame_stays_uniform() {
        let frame = LabFrame::new(16, 16, vec![[50.0, 5.0, 5.0]; 256]).unwrap();
        let out = SlicSegmenter::new()
            .segment(&frame, &SegmentationParams::default())
            .unwrap();
        assert!(out.pixels().iter().all(|p| *p == [50.0, 5.0, 5.0]));
    }

    #[test]
    fn test_invalid_params_fail() {
        let frame = split_frame(8, 8);
        let params = SegmentationParams { compactness: -1.0, ..Default::default() };
        assert!(SlicSegmenter::new().segment(&frame, &params).is_err());
    }

    #[test]
    fn test_huge_sigma_kernel_is_bounded_by_frame() {
        let frame = split_frame(12, 6);
        let params = SegmentationParams {
            segments: 4,
            sigma: 1e9,
            ..Default::default()
        };

        let out = SlicSegmenter::new().segment(&frame, &params).unwrap();
        assert_eq!((out.width(), out.height()), (12, 6));

        let blurred = gaussian_blur(frame.pixels(), 12, 6, 1e9);
        assert_eq!(blurred.len(), 72);
        assert!(blurred.iter().all(|p| p.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn test_blur_preserves_constant_image() {
        let pixels = vec![[42.0, 1.0, 2.0]; 25];
        let blurred = gaussian_blur(&pixels, 5, 5, 1.5);
        for p in blurred {
            assert!((p[0] - 42.0).abs() < 1e-3);
        }
    }
}
