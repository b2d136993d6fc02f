//! FractalVideoGuard video analyzer
//!
//! The analyzer prints one JSON document to stdout with clip-level
//! texture features. Frames and heatmaps are produced here, next to the
//! JSON report.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;

use super::ffmpeg::{extract_samples, FrameGrabber};
use super::process::ToolRunner;
use crate::analysis::json::parse_lenient;
use crate::analysis::video::{heatmap_name, risk_timeline, write_frame_heatmap, VideoAnalysisData};
use crate::config::ForensicsConfig;
use crate::error::{ForensicsError, ForensicsResult};

const TOOL_NAME: &str = "FractalVideoGuard";

pub const FRAMES_DIR: &str = "frames";
pub const HEATMAPS_DIR: &str = "heatmaps";

/// Invokes the FractalVideoGuard script
#[derive(Debug, Clone)]
pub struct VideoGuard {
    python: PathBuf,
    script: PathBuf,
    preset: String,
    timeout: Option<Duration>,
}

impl VideoGuard {
    pub fn new(python: impl AsRef<Path>, script: impl AsRef<Path>) -> Self {
        Self {
            python: python.as_ref().to_path_buf(),
            script: script.as_ref().to_path_buf(),
            preset: "fast".to_string(),
            timeout: None,
        }
    }

    pub fn from_config(config: &ForensicsConfig) -> Self {
        Self {
            python: config.fvg_python.clone(),
            script: config.fvg_script.clone(),
            preset: config.fvg_preset.clone(),
            timeout: config.tool_timeout(),
        }
    }

    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Run feature extraction and return the parsed analyzer JSON.
    ///
    /// `NaN` and `Infinity` in the output become `null`.
    pub fn extract(&self, video: &Path) -> ForensicsResult<Value> {
        if !self.python.exists() {
            return Err(ForensicsError::tool_not_found(
                "FractalVideoGuard Python interpreter",
                &self.python,
            ));
        }
        if !self.script.is_file() {
            return Err(ForensicsError::tool_not_found("FractalVideoGuard script", &self.script));
        }
        if !video.exists() {
            return Err(ForensicsError::EvidenceMissing(video.to_path_buf()));
        }

        let video_abs = std::path::absolute(video)?;
        let mut runner = ToolRunner::new(&self.python).with_timeout(self.timeout);
        if let Some(dir) = self.script.parent().filter(|d| !d.as_os_str().is_empty()) {
            runner = runner.with_working_dir(dir);
        }

        tracing::info!("Running {} ({} preset) on {:?}", TOOL_NAME, self.preset, video_abs);
        let args: [OsString; 5] = [
            self.script.clone().into_os_string(),
            "--preset".into(),
            self.preset.clone().into(),
            "--extract".into(),
            video_abs.into_os_string(),
        ];
        let output = runner.run_checked(TOOL_NAME, &args)?;

        let stdout = output.stdout_string();
        let value = parse_lenient(&stdout).map_err(|e| {
            ForensicsError::invalid_output(
                TOOL_NAME,
                format!("stdout is not JSON ({}):\n{}", e, stdout),
            )
        })?;
        if !value.is_object() {
            return Err(ForensicsError::invalid_output(
                TOOL_NAME,
                format!("expected a JSON object, got:\n{}", stdout),
            ));
        }
        Ok(value)
    }
}

/// Analyze a video and write the enriched JSON report to `output_json`.
///
/// Sampled frames go to `frames/` and their heatmaps to `heatmaps/`, both
/// beside `output_json`. A frame whose heatmap cannot be rendered is logged
/// and left without one.
pub fn run_video_analysis(
    guard: &VideoGuard,
    grabber: &FrameGrabber,
    video: &Path,
    output_json: &Path,
    frame_samples: usize,
) -> ForensicsResult<VideoAnalysisData> {
    let out_dir = output_json
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir)?;

    let raw = match guard.extract(video)? {
        Value::Object(map) => map,
        _ => return Err(ForensicsError::invalid_output(TOOL_NAME, "expected a JSON object")),
    };

    let frames_dir = out_dir.join(FRAMES_DIR);
    let heatmaps_dir = out_dir.join(HEATMAPS_DIR);
    std::fs::create_dir_all(&heatmaps_dir)?;

    let frames = extract_samples(grabber, video, &frames_dir, frame_samples)?;

    let mut heatmaps = Vec::with_capacity(frames.len());
    for frame in &frames {
        let name = heatmap_name(frame);
        match write_frame_heatmap(&frames_dir.join(frame), &heatmaps_dir.join(&name)) {
            Ok(()) => heatmaps.push(name),
            Err(e) => tracing::warn!("No heatmap for {}: {}", frame, e),
        }
    }

    let mut data = VideoAnalysisData {
        raw,
        frames,
        heatmaps,
        timeline: Vec::new(),
    };
    data.timeline = risk_timeline(&data.features(), data.frames.len());

    std::fs::write(output_json, serde_json::to_string_pretty(&data.to_json()?)?)?;
    tracing::info!(
        "Video analysis written to {:?} ({} frames)",
        output_json,
        data.frames.len()
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_interpreter() {
        let dir = tempdir().unwrap();
        let guard = VideoGuard::new(dir.path().join("python"), dir.path().join("fvg.py"));
        let err = guard.extract(&dir.path().join("clip.mp4")).unwrap_err();
        assert!(matches!(err, ForensicsError::ToolNotFound { .. }));
    }

    #[test]
    fn test_missing_video() {
        let dir = tempdir().unwrap();
        let python = dir.path().join("python");
        let script = dir.path().join("fvg.py");
        std::fs::write(&python, "").unwrap();
        std::fs::write(&script, "").unwrap();

        let guard = VideoGuard::new(&python, &script);
        let err = guard.extract(&dir.path().join("clip.mp4")).unwrap_err();
        assert!(matches!(err, ForensicsError::EvidenceMissing(_)));
    }

    #[test]
    fn test_from_config_preset() {
        let mut config = ForensicsConfig::for_tools_root("/tools");
        config.fvg_preset = "accurate".to_string();
        let guard = VideoGuard::from_config(&config);
        assert_eq!(guard.preset, "accurate");
        assert_eq!(guard.with_preset("fast").preset, "fast");
    }

    #[cfg(unix)]
    fn mock_python(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("python");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_parses_non_finite_output() {
        let dir = tempdir().unwrap();
        let python = mock_python(
            dir.path(),
            r#"echo '{"features": {"fractal_dim_box_mean": NaN, "ringing_mean": 2.0}}'"#,
        );
        let script = dir.path().join("fvg.py");
        let video = dir.path().join("clip.mp4");
        std::fs::write(&script, "").unwrap();
        std::fs::write(&video, b"not really a video").unwrap();

        let value = VideoGuard::new(&python, &script).extract(&video).unwrap();
        assert!(value["features"]["fractal_dim_box_mean"].is_null());
        assert_eq!(value["features"]["ringing_mean"], serde_json::json!(2.0));
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_rejects_garbage() {
        let dir = tempdir().unwrap();
        let python = mock_python(dir.path(), "echo 'loading model...'");
        let script = dir.path().join("fvg.py");
        let video = dir.path().join("clip.mp4");
        std::fs::write(&script, "").unwrap();
        std::fs::write(&video, b"x").unwrap();

        let err = VideoGuard::new(&python, &script).extract(&video).unwrap_err();
        assert!(matches!(err, ForensicsError::InvalidToolOutput { .. }));
        assert!(err.to_string().contains("loading model"));
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_reports_exit_status() {
        let dir = tempdir().unwrap();
        let python = mock_python(dir.path(), "echo 'CUDA error' 1>&2; exit 1");
        let script = dir.path().join("fvg.py");
        let video = dir.path().join("clip.mp4");
        std::fs::write(&script, "").unwrap();
        std::fs::write(&video, b"x").unwrap();

        let err = VideoGuard::new(&python, &script).extract(&video).unwrap_err();
        match err {
            ForensicsError::ToolFailed { status, stderr, .. } => {
                assert_eq!(status, 1);
                assert!(stderr.contains("CUDA error"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
