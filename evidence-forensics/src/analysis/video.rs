//! Video authenticity scoring
//!
//! The analyzer reports texture statistics over the whole clip. Natural
//! footage keeps a high box-counting fractal dimension; smoothing, synthesis
//! and resampling lower it and add ringing around edges.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use super::forgery::{load_rgb, save_image};
use super::json::number_or_zero;
use super::raster::{self, round_to};
use super::{RiskLevel, VideoVerdict};
use crate::error::ForensicsResult;

pub const FRACTAL_DIM_KEY: &str = "fractal_dim_box_mean";
pub const RINGING_KEY: &str = "ringing_mean";
pub const BLOCKINESS_KEY: &str = "blockiness_mean";

/// Fractal dimension below which texture loss is severe
pub const FRACTAL_DIM_SEVERE: f64 = 1.25;
/// Fractal dimension below which texture loss is noticeable
pub const FRACTAL_DIM_MODERATE: f64 = 1.40;
pub const RINGING_SEVERE: f64 = 4.5;
pub const RINGING_MODERATE: f64 = 3.5;

/// Upper bound of a timeline risk value
pub const TIMELINE_MAX: f64 = 10.0;
/// Gain applied to |Laplacian| before colorizing frame heatmaps
const FRAME_HEATMAP_GAIN: f64 = 4.0;

/// Verdict with the reasons shown to the examiner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAssessment {
    pub verdict: VideoVerdict,
    pub risk: RiskLevel,
    pub reason: Vec<String>,
}

/// Risk value for one sampled frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub frame: usize,
    pub risk: f64,
}

/// Threshold the analyzer features into a three-level verdict.
///
/// Missing or `null` features count as 0.
pub fn assess_video(features: &Map<String, Value>) -> VideoAssessment {
    let fd = number_or_zero(features, FRACTAL_DIM_KEY);
    let ring = number_or_zero(features, RINGING_KEY);

    let severe = fd < FRACTAL_DIM_SEVERE && ring > RINGING_SEVERE;
    let (verdict, risk, reason): (_, _, &[&str]) = if severe {
        (
            VideoVerdict::LikelyManipulated,
            RiskLevel::High,
            &[
                "Significantly reduced fractal complexity indicates smoothing or synthesis",
                "Strong ringing artifacts suggest resampling or AI-based processing",
            ],
        )
    } else if fd < FRACTAL_DIM_MODERATE || ring > RINGING_MODERATE {
        (
            VideoVerdict::Suspicious,
            RiskLevel::Medium,
            &[
                "Moderate loss of natural texture complexity detected",
                "Artifacts consistent with compression or enhancement pipelines",
            ],
        )
    } else {
        (
            VideoVerdict::LikelyAuthentic,
            RiskLevel::Low,
            &[
                "Natural texture complexity preserved across frames",
                "No abnormal compression or resampling artifacts detected",
            ],
        )
    };

    VideoAssessment {
        verdict,
        risk,
        reason: reason.iter().map(|r| r.to_string()).collect(),
    }
}

/// Per-frame risk derived from clip-level blockiness and ringing.
///
/// The analyzer only reports clip-wide means, so every frame carries the same value.
pub fn risk_timeline(features: &Map<String, Value>, frames: usize) -> Vec<TimelinePoint> {
    let block = number_or_zero(features, BLOCKINESS_KEY);
    let ring = number_or_zero(features, RINGING_KEY);
    let risk = round_to(((block * 10.0 + ring) / 5.0).min(TIMELINE_MAX), 2);
    (0..frames).map(|frame| TimelinePoint { frame, risk }).collect()
}

/// Laplacian edge-energy heatmap blended 50/50 over the frame.
pub fn frame_heatmap(frame: &RgbImage) -> RgbImage {
    let gray = raster::to_gray(frame);
    let magnitude = raster::laplacian_magnitude(&gray, FRAME_HEATMAP_GAIN);
    let colored = raster::apply_jet(&magnitude);
    raster::blend(frame, 0.5, &colored, 0.5)
}

pub fn write_frame_heatmap(frame_path: &Path, out_path: &Path) -> ForensicsResult<()> {
    let frame = load_rgb(frame_path)?;
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    save_image(&frame_heatmap(&frame), out_path)
}

/// Heatmap file name for a frame file name (`frame_3.jpg` -> `heatmap_3.jpg`).
pub fn heatmap_name(frame_name: &str) -> String {
    frame_name.replace("frame", "heatmap")
}

/// Analyzer JSON plus the artifacts derived from it
#[derive(Debug, Clone, PartialEq)]
pub struct VideoAnalysisData {
    /// Sanitized analyzer output
    pub raw: Map<String, Value>,
    pub frames: Vec<String>,
    pub heatmaps: Vec<String>,
    pub timeline: Vec<TimelinePoint>,
}

impl VideoAnalysisData {
    /// The analyzer's `features` object, empty when absent
    pub fn features(&self) -> Map<String, Value> {
        match self.raw.get("features") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }

    /// Analyzer output with `frames`, `heatmaps` and `timeline` attached
    pub fn to_json(&self) -> ForensicsResult<Value> {
        let mut merged = self.raw.clone();
        merged.insert("frames".to_string(), serde_json::to_value(&self.frames)?);
        merged.insert("heatmaps".to_string(), serde_json::to_value(&self.heatmaps)?);
        merged.insert("timeline".to_string(), serde_json::to_value(&self.timeline)?);
        Ok(Value::Object(merged))
    }
}

/// What the examiner sees for a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoReport {
    pub verdict: VideoVerdict,
    pub risk: RiskLevel,
    pub reason: Vec<String>,
    pub features: Map<String, Value>,
    pub frames: Vec<String>,
    pub heatmaps: Vec<String>,
    pub timeline: Vec<TimelinePoint>,
}

impl VideoReport {
    pub fn from_data(data: &VideoAnalysisData) -> Self {
        let features = data.features();
        let assessment = assess_video(&features);
        Self {
            verdict: assessment.verdict,
            risk: assessment.risk,
            reason: assessment.reason,
            features,
            frames: data.frames.clone(),
            heatmaps: data.heatmaps.clone(),
            timeline: data.timeline.clone(),
        }
    }
}
