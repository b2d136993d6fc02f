//! External forensic tools
//!
//! TruFor for images, FractalVideoGuard for videos, ffmpeg for frames.

pub mod ffmpeg;
pub mod process;
pub mod trufor;
pub mod videoguard;

pub use ffmpeg::{extract_samples, sample_indices, FrameGrabber};
pub use process::{ToolOutput, ToolRunner};
pub use trufor::{run_image_pipeline, TruFor};
pub use videoguard::{run_video_analysis, VideoGuard};
