//! Pixel-level helpers shared by the image and video pipelines.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};

/// BT.601 luma, rounded to the nearest integer.
pub fn to_gray(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let Rgb([r, g, b]) = *image.get_pixel(x, y);
        let luma = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Reflect-101 border index (`dcb|abcd|cba`).
fn reflect101(index: i64, len: u32) -> u32 {
    let len = i64::from(len);
    if len == 1 {
        return 0;
    }
    let mut i = index;
    // Borders here are never wider than one pixel, but loop for safety on tiny images.
    while i < 0 || i >= len {
        if i < 0 {
            i = -i;
        }
        if i >= len {
            i = 2 * (len - 1) - i;
        }
    }
    i as u32
}

/// A single-channel f64 plane in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f64>,
}

impl Plane {
    pub fn mean(&self) -> f64 {
        mean(&self.data)
    }

    pub fn variance(&self) -> f64 {
        variance(&self.data)
    }

    /// Mean of absolute values
    pub fn mean_abs(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|v| v.abs()).sum::<f64>() / self.data.len() as f64
    }
}

/// 4-neighbour Laplacian (`[0,1,0; 1,-4,1; 0,1,0]`) with reflect-101 borders.
pub fn laplacian(gray: &GrayImage) -> Plane {
    let (width, height) = gray.dimensions();
    let mut data = Vec::with_capacity(width as usize * height as usize);

    let at = |x: i64, y: i64| -> f64 {
        let px = reflect101(x, width);
        let py = reflect101(y, height);
        f64::from(gray.get_pixel(px, py)[0])
    };

    for y in 0..i64::from(height) {
        for x in 0..i64::from(width) {
            let center = at(x, y);
            let value = at(x, y - 1) + at(x, y + 1) + at(x - 1, y) + at(x + 1, y) - 4.0 * center;
            data.push(value);
        }
    }

    Plane {
        width,
        height,
        data,
    }
}

/// Classic JET colormap: dark blue at 0, through cyan, yellow, to dark red at 255.
pub fn jet(value: u8) -> Rgb<u8> {
    let x = f64::from(value) / 255.0;
    let channel = |offset: f64| {
        let v = (1.5 - (4.0 * x - offset).abs()).clamp(0.0, 1.0);
        (v * 255.0).round() as u8
    };
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}

/// Apply JET to every pixel of a gray map.
pub fn apply_jet(gray: &GrayImage) -> RgbImage {
    let (width, height) = gray.dimensions();
    RgbImage::from_fn(width, height, |x, y| jet(gray.get_pixel(x, y)[0]))
}

/// `round(a * alpha + b * beta)` per channel, saturated to u8.
///
/// Both images must have the same dimensions; the smaller overlap is used otherwise.
pub fn blend(a: &RgbImage, alpha: f64, b: &RgbImage, beta: f64) -> RgbImage {
    let width = a.width().min(b.width());
    let height = a.height().min(b.height());
    RgbImage::from_fn(width, height, |x, y| {
        let pa = a.get_pixel(x, y);
        let pb = b.get_pixel(x, y);
        let mix = |i: usize| {
            (f64::from(pa[i]) * alpha + f64::from(pb[i]) * beta)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgb([mix(0), mix(1), mix(2)])
    })
}

/// HSV saturation channel on the 0-255 scale.
pub fn saturation(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let Rgb([r, g, b]) = *image.get_pixel(x, y);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        if max == 0 {
            Luma([0])
        } else {
            let s = f64::from(max - min) / f64::from(max) * 255.0;
            Luma([s.round() as u8])
        }
    })
}

/// Nearest-neighbour resize of a gray map.
pub fn resize_nearest(gray: &GrayImage, width: u32, height: u32) -> GrayImage {
    if gray.dimensions() == (width, height) {
        return gray.clone();
    }
    imageops::resize(gray, width, height, FilterType::Nearest)
}

/// Convert `|laplacian| * gain` into a clipped u8 map.
pub fn laplacian_magnitude(gray: &GrayImage, gain: f64) -> GrayImage {
    let lap = laplacian(gray);
    let mut out = GrayImage::new(lap.width, lap.height);
    for (pixel, value) in out.pixels_mut().zip(lap.data.iter()) {
        *pixel = Luma([(value.abs() * gain).clamp(0.0, 255.0) as u8]);
    }
    out
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Mean of a gray image's pixel values
pub fn gray_mean(gray: &GrayImage) -> f64 {
    let count = gray.as_raw().len();
    if count == 0 {
        return 0.0;
    }
    gray.as_raw().iter().map(|&v| f64::from(v)).sum::<f64>() / count as f64
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_weights() {
        let img = RgbImage::from_pixel(1, 1, Rgb([255, 0, 0]));
        assert_eq!(to_gray(&img).get_pixel(0, 0)[0], 76);
        let img = RgbImage::from_pixel(1, 1, Rgb([0, 255, 0]));
        assert_eq!(to_gray(&img).get_pixel(0, 0)[0], 150);
        let img = RgbImage::from_pixel(1, 1, Rgb([255, 255, 255]));
        assert_eq!(to_gray(&img).get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_reflect101() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(2, 5), 2);
        assert_eq!(reflect101(-1, 1), 0);
        assert_eq!(reflect101(2, 2), 0);
    }

    #[test]
    fn test_laplacian_flat_is_zero() {
        let gray = GrayImage::from_pixel(6, 4, Luma([120]));
        let lap = laplacian(&gray);
        assert!(lap.data.iter().all(|&v| v == 0.0));
        assert_eq!(lap.variance(), 0.0);
    }

    #[test]
    fn test_laplacian_single_spike() {
        let mut gray = GrayImage::from_pixel(5, 5, Luma([0]));
        gray.put_pixel(2, 2, Luma([10]));
        let lap = laplacian(&gray);
        assert_eq!(lap.data[2 * 5 + 2], -40.0);
        assert_eq!(lap.data[2 * 5 + 1], 10.0);
        assert_eq!(lap.data[5 + 2], 10.0);
        assert_eq!(lap.data[0], 0.0);
    }

    #[test]
    fn test_jet_endpoints() {
        assert_eq!(jet(0), Rgb([0, 0, 128]));
        assert_eq!(jet(255), Rgb([128, 0, 0]));
        // Middle of the map is green-dominant
        let mid = jet(128);
        assert!(mid[1] > mid[0] && mid[1] > mid[2]);
    }

    #[test]
    fn test_blend_weights() {
        let a = RgbImage::from_pixel(2, 2, Rgb([100, 200, 0]));
        let b = RgbImage::from_pixel(2, 2, Rgb([0, 100, 255]));
        let out = blend(&a, 0.6, &b, 0.4);
        assert_eq!(*out.get_pixel(1, 1), Rgb([60, 160, 102]));
    }

    #[test]
    fn test_saturation_channel() {
        let img = RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([255, 0, 0])
            } else {
                Rgb([128, 128, 128])
            }
        });
        let s = saturation(&img);
        assert_eq!(s.get_pixel(0, 0)[0], 255);
        assert_eq!(s.get_pixel(1, 0)[0], 0);
        let black = RgbImage::new(1, 1);
        assert_eq!(saturation(&black).get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_resize_nearest_keeps_values() {
        let gray = GrayImage::from_fn(2, 2, |x, y| Luma([(x + 2 * y) as u8 * 50]));
        let big = resize_nearest(&gray, 4, 4);
        assert_eq!(big.dimensions(), (4, 4));
        let mut values: Vec<u8> = big.as_raw().clone();
        values.sort_unstable();
        values.dedup();
        assert_eq!(values, vec![0, 50, 100, 150]);
    }

    #[test]
    fn test_statistics() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(mean(&values), 2.5);
        assert_eq!(variance(&values), 1.25);
        assert!((std_dev(&values) - 1.25f64.sqrt()).abs() < 1e-12);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(round_to(0.123456, 3), 0.123);
        assert_eq!(round_to(12.37, 1), 12.4);
    }
}
