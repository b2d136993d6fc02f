//! Tool configuration
//!
//! Locations of the external forensic tools and their run parameters.
//! Values come from defaults relative to `tools_root`, an optional JSON
//! file, then `EVIDENCE_*` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_TOOLS_ROOT: &str = "EVIDENCE_TOOLS_ROOT";
pub const ENV_TRUFOR_PYTHON: &str = "EVIDENCE_TRUFOR_PYTHON";
pub const ENV_TRUFOR_DIR: &str = "EVIDENCE_TRUFOR_DIR";
pub const ENV_FVG_PYTHON: &str = "EVIDENCE_FVG_PYTHON";
pub const ENV_FVG_SCRIPT: &str = "EVIDENCE_FVG_SCRIPT";
pub const ENV_FFMPEG: &str = "EVIDENCE_FFMPEG";
pub const ENV_FFPROBE: &str = "EVIDENCE_FFPROBE";
pub const ENV_TOOL_TIMEOUT: &str = "EVIDENCE_TOOL_TIMEOUT";

/// External tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForensicsConfig {
    /// Directory holding the TruFor and FractalVideoGuard checkouts
    pub tools_root: PathBuf,
    /// Interpreter used for TruFor
    pub trufor_python: PathBuf,
    /// TruFor `test_docker` directory (contains `src/trufor_test.py`)
    pub trufor_dir: PathBuf,
    /// GPU index passed to TruFor, -1 for CPU
    pub trufor_gpu: i32,
    pub fvg_python: PathBuf,
    pub fvg_script: PathBuf,
    pub fvg_preset: String,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    /// Number of frames sampled from each video
    pub frame_samples: usize,
    pub tool_timeout_secs: Option<u64>,
}

impl Default for ForensicsConfig {
    fn default() -> Self {
        Self::for_tools_root(".")
    }
}

impl ForensicsConfig {
    /// Defaults laid out under a tools root directory
    pub fn for_tools_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let trufor_base = root.join("Trufor_main");
        let fvg_base = root.join("FractalVideoGuard_main");

        Self {
            trufor_python: venv_python(&root.join("venv")),
            trufor_dir: trufor_base.join("test_docker"),
            trufor_gpu: -1,
            fvg_python: venv_python(&fvg_base.join("venv_fg")),
            fvg_script: fvg_base.join("fractalvideoguard_v0_5_2.py"),
            fvg_preset: "fast".to_string(),
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            frame_samples: 6,
            tool_timeout_secs: None,
            tools_root: root,
        }
    }

    /// Load from a JSON file (missing fields use defaults), or defaults when no file is given.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {:?}", path))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse config {:?}", path))?
            }
            None => match std::env::var_os(ENV_TOOLS_ROOT) {
                Some(root) => Self::for_tools_root(root),
                None => Self::default(),
            },
        };
        base.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup (normally the process environment)
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path_var = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        if let Some(v) = path_var(ENV_TRUFOR_PYTHON) {
            self.trufor_python = v;
        }
        if let Some(v) = path_var(ENV_TRUFOR_DIR) {
            self.trufor_dir = v;
        }
        if let Some(v) = path_var(ENV_FVG_PYTHON) {
            self.fvg_python = v;
        }
        if let Some(v) = path_var(ENV_FVG_SCRIPT) {
            self.fvg_script = v;
        }
        if let Some(v) = path_var(ENV_FFMPEG) {
            self.ffmpeg = v;
        }
        if let Some(v) = path_var(ENV_FFPROBE) {
            self.ffprobe = v;
        }
        if let Some(v) = lookup(ENV_TOOL_TIMEOUT).filter(|v| !v.is_empty()) {
            let secs = v.trim().parse::<u64>().with_context(|| {
                format!("{} must be a number of seconds, got {:?}", ENV_TOOL_TIMEOUT, v)
            })?;
            self.tool_timeout_secs = Some(secs);
        }

        Ok(self)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }
}

fn venv_python(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join("python.exe")
    } else {
        venv.join("bin").join("python")
    }
}
