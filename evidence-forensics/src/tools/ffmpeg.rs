//! Frame access through ffprobe/ffmpeg.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use super::process::ToolRunner;
use crate::config::ForensicsConfig;
use crate::error::{ForensicsError, ForensicsResult};

/// ffprobe + ffmpeg pair used to count and grab video frames
#[derive(Debug, Clone)]
pub struct FrameGrabber {
    ffprobe: ToolRunner,
    ffmpeg: ToolRunner,
}

impl FrameGrabber {
    pub fn new(ffprobe: impl AsRef<Path>, ffmpeg: impl AsRef<Path>) -> Self {
        Self {
            ffprobe: ToolRunner::new(ffprobe),
            ffmpeg: ToolRunner::new(ffmpeg),
        }
    }

    pub fn from_config(config: &ForensicsConfig) -> Self {
        Self {
            ffprobe: ToolRunner::new(&config.ffprobe).with_timeout(config.tool_timeout()),
            ffmpeg: ToolRunner::new(&config.ffmpeg).with_timeout(config.tool_timeout()),
        }
    }

    /// Number of frames in the first video stream, 0 when unknown.
    pub fn probe_frame_count(&self, video: &Path) -> ForensicsResult<u64> {
        let output = self.ffprobe.run_checked(
            "ffprobe",
            &[
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-select_streams"),
                OsStr::new("v:0"),
                OsStr::new("-count_packets"),
                OsStr::new("-show_entries"),
                OsStr::new("stream=nb_read_packets"),
                OsStr::new("-of"),
                OsStr::new("csv=p=0"),
                video.as_os_str(),
            ],
        )?;

        let count = output
            .stdout
            .iter()
            .map(|line| line.trim().trim_end_matches(','))
            .find(|line| !line.is_empty())
            .and_then(|line| line.parse::<u64>().ok())
            .unwrap_or(0);
        Ok(count)
    }

    /// Decode frame `index` and write it to `out` (format from extension).
    pub fn extract_frame(&self, video: &Path, index: u64, out: &Path) -> ForensicsResult<()> {
        let select = format!("select=eq(n\\,{})", index);
        self.ffmpeg.run_checked(
            "ffmpeg",
            &[
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-y"),
                OsStr::new("-i"),
                video.as_os_str(),
                OsStr::new("-vf"),
                OsStr::new(&select),
                OsStr::new("-vsync"),
                OsStr::new("0"),
                OsStr::new("-frames:v"),
                OsStr::new("1"),
                out.as_os_str(),
            ],
        )?;

        if !out.exists() {
            return Err(ForensicsError::invalid_output(
                "ffmpeg",
                format!("frame {} was not written to {:?}", index, out),
            ));
        }
        Ok(())
    }
}

/// `count` evenly spaced frame indices across `total`, truncated toward zero.
pub fn sample_indices(total: u64, count: usize) -> Vec<u64> {
    if total == 0 || count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![0];
    }
    let last = (total - 1) as f64;
    (0..count)
        .map(|i| (last * i as f64 / (count - 1) as f64) as u64)
        .collect()
}

/// Names used for the sampled frames: `frame_<i>.jpg`.
pub fn frame_file_name(position: usize) -> String {
    format!("frame_{}.jpg", position)
}

/// Collect extracted frames into `dir`, skipping frames that fail to decode.
///
/// A video whose frame count cannot be probed yields no frames.
pub fn extract_samples(
    grabber: &FrameGrabber,
    video: &Path,
    dir: &Path,
    count: usize,
) -> ForensicsResult<Vec<String>> {
    std::fs::create_dir_all(dir)?;
    let total = match grabber.probe_frame_count(video) {
        Ok(total) => total,
        Err(e) => {
            tracing::warn!("Cannot count frames of {:?}: {}", video, e);
            0
        }
    };
    if total == 0 {
        tracing::warn!("No frames reported for {:?}", video);
        return Ok(Vec::new());
    }

    let mut frames = Vec::new();
    for (position, index) in sample_indices(total, count).into_iter().enumerate() {
        let name = frame_file_name(position);
        let path: PathBuf = dir.join(&name);
        match grabber.extract_frame(video, index, &path) {
            Ok(()) => frames.push(name),
            Err(e) => tracing::warn!("Skipping frame {} of {:?}: {}", index, video, e),
        }
    }
    Ok(frames)
}
