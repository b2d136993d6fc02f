//! Image forgery scoring
//!
//! Converts a tamper probability map into a colorized heatmap, an overlay on
//! the original evidence image, a mean score and a three-level verdict.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::metadata::extract_exif_anomalies;
use super::metrics::{compute_image_metrics, ImageMetrics};
use super::raster::{self, gray_mean};
use super::tamper_map::load_tamper_map;
use super::{ImageVerdict, RiskLevel};
use crate::error::{ForensicsError, ForensicsResult};

/// Score above which an image is reported as tampered
pub const TAMPERED_THRESHOLD: f64 = 0.6;
/// Score above which an image is reported as suspicious
pub const SUSPICIOUS_THRESHOLD: f64 = 0.3;

const ORIGINAL_WEIGHT: f64 = 0.6;
const HEATMAP_WEIGHT: f64 = 0.4;

/// Result of scoring one image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub heatmap: PathBuf,
    pub overlay: PathBuf,
    /// Mean normalized tamper probability in `[0, 1]`
    pub score: f64,
    pub verdict: ImageVerdict,
    pub risk: RiskLevel,
    pub metrics: ImageMetrics,
    pub exif: Vec<String>,
}

/// Map a score to verdict and risk. Both thresholds are exclusive.
pub fn classify_score(score: f64) -> (ImageVerdict, RiskLevel) {
    if score > TAMPERED_THRESHOLD {
        (ImageVerdict::Tampered, RiskLevel::High)
    } else if score > SUSPICIOUS_THRESHOLD {
        (ImageVerdict::Suspicious, RiskLevel::Medium)
    } else {
        (ImageVerdict::Authentic, RiskLevel::Low)
    }
}

pub fn load_rgb(path: &Path) -> ForensicsResult<RgbImage> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| ForensicsError::ImageUnreadable {
            path: path.to_path_buf(),
            source,
        })
}

pub fn save_image(image: &RgbImage, path: &Path) -> ForensicsResult<()> {
    image.save(path).map_err(|source| ForensicsError::ImageWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Score a tamper map against its original image.
///
/// Writes `<base_name>_heatmap.png` and `<base_name>_overlay.png` into
/// `output_dir`.
pub fn analyze_tamper_map(
    npz_path: impl AsRef<Path>,
    original_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    base_name: &str,
) -> ForensicsResult<ImageAnalysis> {
    let output_dir = output_dir.as_ref();
    let original_path = original_path.as_ref();
    std::fs::create_dir_all(output_dir)?;

    let original = load_rgb(original_path)?;
    let map = load_tamper_map(npz_path.as_ref())?;
    tracing::info!(
        "Tamper map '{}' is {}x{}, original is {}x{}",
        map.key,
        map.width(),
        map.height(),
        original.width(),
        original.height()
    );

    let normalized = map.normalize();
    let resized = raster::resize_nearest(&normalized, original.width(), original.height());
    let heatmap_img = raster::apply_jet(&resized);

    let heatmap = output_dir.join(format!("{}_heatmap.png", base_name));
    save_image(&heatmap_img, &heatmap)?;

    let overlay_img = raster::blend(&original, ORIGINAL_WEIGHT, &heatmap_img, HEATMAP_WEIGHT);
    let overlay = output_dir.join(format!("{}_overlay.png", base_name));
    save_image(&overlay_img, &overlay)?;

    let score = gray_mean(&resized) / 255.0;
    let (verdict, risk) = classify_score(score);
    tracing::info!("Image score {:.3}: {} ({} risk)", score, verdict, risk);

    Ok(ImageAnalysis {
        heatmap,
        overlay,
        score,
        verdict,
        risk,
        metrics: compute_image_metrics(&original),
        exif: extract_exif_anomalies(original_path),
    })
}
