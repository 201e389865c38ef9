use palette::{FromColor, Lab, Srgb};

use crate::video::types::Frame;

/// A frame in CIE L*a*b* (D65), the working color space of the segmenters
///
/// Pixels are stored row-major as `[L, a, b]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabFrame {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 3]>,
}

impl LabFrame {
    /// Returns `None` unless `pixels` holds exactly `width * height` entries
    pub fn new(width: u32, height: u32, pixels: Vec<[f32; 3]>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Convert an sRGB frame into Lab
    pub fn from_frame(frame: &Frame) -> Self {
        let pixels = frame
            .as_raw()
            .chunks_exact(3)
            .map(|px| rgb_to_lab([px[0], px[1], px[2]]))
            .collect();

        Self {
            width: frame.width(),
            height: frame.height(),
            pixels,
        }
    }

    /// Convert back to an sRGB frame, clamping out-of-gamut colors
    pub fn to_frame(&self) -> Frame {
        let data = self.pixels.iter().flat_map(|&lab| lab_to_rgb(lab)).collect();
        Frame::from_rgb_bytes(self.width, self.height, data)
            .unwrap_or_else(|| Frame::new_black(self.width, self.height))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[[f32; 3]] {
        &self.pixels
    }

    pub fn get(&self, x: u32, y: u32) -> [f32; 3] {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Replace every pixel with the mean color of its region
    ///
    /// `labels` assigns each pixel (row-major) a region id below `regions`.
    pub fn with_region_means(&self, labels: &[usize], regions: usize) -> LabFrame {
        let mut sums = vec![[0f64; 3]; regions];
        let mut counts = vec![0usize; regions];

        for (pixel, &label) in self.pixels.iter().zip(labels) {
            let sum = &mut sums[label];
            sum[0] += pixel[0] as f64;
            sum[1] += pixel[1] as f64;
            sum[2] += pixel[2] as f64;
            counts[label] += 1;
        }

        let means: Vec<[f32; 3]> = sums
            .iter()
            .zip(&counts)
            .map(|(sum, &count)| {
                let count = count.max(1) as f64;
                [
                    (sum[0] / count) as f32,
                    (sum[1] / count) as f32,
                    (sum[2] / count) as f32,
                ]
            })
            .collect();

        LabFrame {
            width: self.width,
            height: self.height,
            pixels: labels.iter().map(|&label| means[label]).collect(),
        }
    }
}

pub fn rgb_to_lab(rgb: [u8; 3]) -> [f32; 3] {
    let srgb: Srgb = Srgb::new(rgb[0], rgb[1], rgb[2]).into_format();
    let lab: Lab = Lab::from_color(srgb);
    [lab.l, lab.a, lab.b]
}

pub fn lab_to_rgb(lab: [f32; 3]) -> [u8; 3] {
    let lab: Lab = Lab::new(lab[0], lab[1], lab[2]);
    let srgb: Srgb = Srgb::from_color(lab);
    [to_u8(srgb.red), to_u8(srgb.green), to_u8(srgb.blue)]
}

fn to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}
