//! Auxiliary image statistics reported next to the tamper verdict.

use image::RgbImage;
use imageproc::edges::canny;
use serde::{Deserialize, Serialize};

use super::raster::{self, gray_mean, round_to, std_dev};

const CANNY_LOW: f32 = 80.0;
const CANNY_HIGH: f32 = 160.0;
/// JPEG block height
const BLOCK_SIZE: u32 = 8;

/// Summary statistics of an evidence image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetrics {
    /// Variance of the Laplacian; low values indicate blur
    pub blur: f64,
    pub noise: f64,
    /// Fraction of Canny edge pixels. The edge detector smooths with a
    /// Gaussian (sigma 1.4) first, so fine texture scores lower than with
    /// an unsmoothed Canny and values are not comparable with OpenCV's.
    pub edge_density: f64,
    pub blockiness: f64,
    pub ringing: f64,
    pub saturation: f64,
}

pub fn compute_image_metrics(image: &RgbImage) -> ImageMetrics {
    let gray = raster::to_gray(image);
    let lap = raster::laplacian(&gray);

    let gray_values: Vec<f64> = gray.as_raw().iter().map(|&v| f64::from(v)).collect();
    let edges = canny(&gray, CANNY_LOW, CANNY_HIGH);

    ImageMetrics {
        blur: round_to(lap.variance(), 1),
        noise: round_to(std_dev(&gray_values) / 255.0, 3),
        edge_density: round_to(gray_mean(&edges) / 255.0, 3),
        blockiness: round_to(blockiness(&gray) / 255.0, 3),
        ringing: round_to(lap.mean_abs() / 255.0, 3),
        saturation: round_to(gray_mean(&raster::saturation(image)) / 255.0, 3),
    }
}

/// Spread of the difference between the first and second row of each 8-row block.
///
/// The difference is taken on the 8-bit values and wraps modulo 256, so a
/// second row brighter than the first by `d` counts as `256 - d`.
fn blockiness(gray: &image::GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    let mut diffs = Vec::new();
    let mut row = 0;
    while row + 1 < height {
        for x in 0..width {
            let a = gray.get_pixel(x, row)[0];
            let b = gray.get_pixel(x, row + 1)[0];
            diffs.push(f64::from(a.wrapping_sub(b)));
        }
        row += BLOCK_SIZE;
    }
    std_dev(&diffs)
}
