// THEORY:
// The `GrayFrame` is the single-channel view of a decoded photo that every
// image heuristic in the crate works from. It owns a flat buffer of 8-bit
// luma values and offers the handful of whole-frame statistics the quality
// assessor needs (mean, population variance) plus the 3x3 edge filter used as
// the sharpness proxy.
//
// Luma follows Rec. 601 (0.299 R + 0.587 G + 0.114 B), evaluated in 16-bit
// fixed point and rounded to the nearest integer. The edge filter is the
// classic 8-neighbour Laplacian-style kernel; results are clamped to 0..=255
// and out-of-bounds neighbours replicate the nearest edge pixel, so a frame
// of constant intensity produces an all-zero edge map.

use image::{GrayImage, RgbImage};
use imageproc::filter::filter3x3;

const LUMA_R: u32 = 19_595;
const LUMA_G: u32 = 38_470;
const LUMA_B: u32 = 7_471;
const LUMA_ROUND: u32 = 1 << 15;

const EDGE_KERNEL: [i32; 9] = [-1, -1, -1, -1, 8, -1, -1, -1, -1];

/// Converts one RGB pixel to Rec. 601 luma.
pub fn luma(red: u8, green: u8, blue: u8) -> u8 {
    ((red as u32 * LUMA_R + green as u32 * LUMA_G + blue as u32 * LUMA_B + LUMA_ROUND) >> 16) as u8
}

/// A grayscale frame stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl GrayFrame {
    pub fn from_rgb(image: &RgbImage) -> Self {
        let data = image
            .pixels()
            .map(|p| luma(p.0[0], p.0[1], p.0[2]))
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            data,
        }
    }

    /// Applies the 3x3 edge-detection kernel to every pixel.
    pub fn find_edges(&self) -> GrayFrame {
        let Some(image) = self.to_image().filter(|g| g.width() > 0 && g.height() > 0) else {
            return self.clone();
        };
        let edges: GrayImage = filter3x3::<_, i32, u8>(&image, &EDGE_KERNEL);
        GrayFrame {
            width: self.width,
            height: self.height,
            data: edges.into_raw(),
        }
    }

    /// Mean intensity; 0.0 for an empty frame.
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.data.iter().map(|&v| v as u64).sum();
        sum as f64 / self.data.len() as f64
    }

    /// Population variance of the intensities; 0.0 for an empty frame.
    pub fn variance(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        self.data
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / self.data.len() as f64
    }

    pub fn to_image(&self) -> Option<GrayImage> {
        GrayImage::from_raw(self.width, self.height, self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::utils::image_helper::{checkerboard, uniform};
    use image::Rgb;

    #[test]
    fn luma_uses_rec601_weights() {
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 150);
        assert_eq!(luma(0, 0, 255), 29);
    }

    #[test]
    fn constant_frame_has_no_edges() {
        let gray = GrayFrame::from_rgb(&uniform(16, 12, 128));
        let edges = gray.find_edges();
        assert!(edges.data.iter().all(|&v| v == 0));
        assert_eq!(edges.variance(), 0.0);
        assert_eq!(gray.mean(), 128.0);
    }

    #[test]
    fn checkerboard_edges_saturate() {
        let gray = GrayFrame::from_rgb(&checkerboard(8, 8, 0, 255));
        let edges = gray.find_edges();
        // Every light cell saturates high, every dark cell clamps to zero.
        assert_eq!(edges.data, gray.data);
        assert_eq!(edges.mean(), 127.5);
        assert_eq!(edges.variance(), 127.5 * 127.5);
    }

    #[test]
    fn borders_replicate_the_nearest_pixel() {
        // A dark centre in a bright ring: every ring pixel sees the dark
        // centre once and its own value in place of missing neighbours.
        let frame = RgbImage::from_fn(3, 3, |x, y| {
            let v = if (x, y) == (1, 1) { 0 } else { 100 };
            Rgb([v, v, v])
        });
        let edges = GrayFrame::from_rgb(&frame).find_edges();
        assert_eq!(edges.data, vec![100, 100, 100, 100, 0, 100, 100, 100, 100]);
    }

    #[test]
    fn empty_frame_statistics_are_zero() {
        let gray = GrayFrame::from_rgb(&RgbImage::new(0, 0));
        assert_eq!(gray.mean(), 0.0);
        assert_eq!(gray.variance(), 0.0);
        assert!(gray.find_edges().data.is_empty());
    }
}
