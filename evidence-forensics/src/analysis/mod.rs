//! Forensic scoring pipeline
//!
//! Turns raw tool output into bounded verdicts, risk tiers and visual
//! artifacts:
//! - Image tamper maps: heatmap, overlay, score and verdict
//! - Image statistics and EXIF anomalies
//! - Video texture statistics: verdict, frame heatmaps and risk timeline

pub mod forgery;
pub mod json;
pub mod metadata;
pub mod metrics;
pub mod raster;
pub mod tamper_map;
pub mod video;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use forgery::{analyze_tamper_map, classify_score, ImageAnalysis};
pub use metadata::extract_exif_anomalies;
pub use metrics::{compute_image_metrics, ImageMetrics};
pub use tamper_map::{load_tamper_map, TamperMap};
pub use video::{assess_video, VideoAssessment, VideoReport};

/// Risk tier attached to every verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// Outcome of the image forgery localizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageVerdict {
    Authentic,
    Suspicious,
    Tampered,
}

impl fmt::Display for ImageVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageVerdict::Authentic => write!(f, "Authentic"),
            ImageVerdict::Suspicious => write!(f, "Suspicious"),
            ImageVerdict::Tampered => write!(f, "Tampered"),
        }
    }
}

/// Outcome of the video authenticity analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoVerdict {
    #[serde(rename = "Likely Authentic")]
    LikelyAuthentic,
    Suspicious,
    #[serde(rename = "Likely Manipulated")]
    LikelyManipulated,
}

impl fmt::Display for VideoVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoVerdict::LikelyAuthentic => write!(f, "Likely Authentic"),
            VideoVerdict::Suspicious => write!(f, "Suspicious"),
            VideoVerdict::LikelyManipulated => write!(f, "Likely Manipulated"),
        }
    }
}
