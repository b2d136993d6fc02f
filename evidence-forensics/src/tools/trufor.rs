//! TruFor image forgery localizer
//!
//! TruFor runs from its own Python environment. It reads one image and
//! writes `<output_dir>/<image file name>.npz` holding the tamper map.

use std::path::{Path, PathBuf};

use super::process::ToolRunner;
use crate::analysis::forgery::{analyze_tamper_map, ImageAnalysis};
use crate::config::ForensicsConfig;
use crate::error::{ForensicsError, ForensicsResult};

const TOOL_NAME: &str = "TruFor";

/// Invokes the TruFor test script
#[derive(Debug, Clone)]
pub struct TruFor {
    python: PathBuf,
    project_dir: PathBuf,
    gpu: i32,
    runner_timeout: Option<std::time::Duration>,
}

impl TruFor {
    pub fn new(python: impl AsRef<Path>, project_dir: impl AsRef<Path>) -> Self {
        Self {
            python: python.as_ref().to_path_buf(),
            project_dir: project_dir.as_ref().to_path_buf(),
            gpu: -1,
            runner_timeout: None,
        }
    }

    pub fn from_config(config: &ForensicsConfig) -> Self {
        Self {
            python: config.trufor_python.clone(),
            project_dir: config.trufor_dir.clone(),
            gpu: config.trufor_gpu,
            runner_timeout: config.tool_timeout(),
        }
    }

    pub fn with_gpu(mut self, gpu: i32) -> Self {
        self.gpu = gpu;
        self
    }

    fn script(&self) -> PathBuf {
        self.project_dir.join("src").join("trufor_test.py")
    }

    /// Run the model on one image and return the tamper map archive path.
    pub fn run(&self, image_path: &Path, output_dir: &Path) -> ForensicsResult<PathBuf> {
        if !self.python.exists() {
            return Err(ForensicsError::tool_not_found("TruFor Python interpreter", &self.python));
        }
        if !self.project_dir.is_dir() {
            return Err(ForensicsError::tool_not_found(
                "TruFor project directory",
                &self.project_dir,
            ));
        }
        if !image_path.exists() {
            return Err(ForensicsError::EvidenceMissing(image_path.to_path_buf()));
        }

        std::fs::create_dir_all(output_dir)?;
        let image_abs = std::path::absolute(image_path)?;
        let output_abs = std::path::absolute(output_dir)?;

        tracing::info!("Running TruFor on {:?}", image_abs);
        let runner = ToolRunner::new(&self.python)
            .with_working_dir(&self.project_dir)
            .with_timeout(self.runner_timeout);

        let gpu = self.gpu.to_string();
        let args = [
            self.script().into_os_string(),
            "-gpu".into(),
            gpu.into(),
            "-in".into(),
            image_abs.clone().into_os_string(),
            "-out".into(),
            output_abs.clone().into_os_string(),
        ];
        runner.run_checked(TOOL_NAME, &args)?;

        let file_name = image_abs
            .file_name()
            .ok_or_else(|| {
                ForensicsError::invalid_output(TOOL_NAME, "image path has no file name")
            })?;
        let mut npz_name = file_name.to_os_string();
        npz_name.push(".npz");
        let npz_path = output_abs.join(npz_name);

        if !npz_path.exists() {
            return Err(ForensicsError::invalid_output(
                TOOL_NAME,
                format!("expected tamper map at {:?}", npz_path),
            ));
        }
        Ok(npz_path)
    }
}

/// Run TruFor on an evidence image and score its tamper map.
///
/// Artifacts are named after the image file stem.
pub fn run_image_pipeline(
    trufor: &TruFor,
    image_path: &Path,
    output_dir: &Path,
) -> ForensicsResult<ImageAnalysis> {
    let npz_path = trufor.run(image_path, output_dir)?;
    let base_name = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "evidence".to_string());
    analyze_tamper_map(&npz_path, image_path, output_dir, &base_name)
}
