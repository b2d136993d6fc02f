//! Error types for the analysis pipeline and external tool runners.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while running forensic tools or scoring their output.
#[derive(Error, Debug)]
pub enum ForensicsError {
    /// A required executable, script or project directory is missing.
    #[error("{what} not found at {path:?}")]
    ToolNotFound { what: String, path: PathBuf },

    /// The evidence file handed to a tool does not exist.
    #[error("Evidence file not found: {0:?}")]
    EvidenceMissing(PathBuf),

    /// An external tool exited unsuccessfully.
    #[error("{tool} failed (exit status {status}):\n{stderr}")]
    ToolFailed {
        tool: String,
        status: i32,
        stderr: String,
    },

    /// An external tool was killed after exceeding its timeout.
    #[error("{tool} timed out after {seconds}s")]
    ToolTimedOut { tool: String, seconds: u64 },

    /// A tool ran but produced output we cannot use.
    #[error("Invalid output from {tool}: {message}")]
    InvalidToolOutput { tool: String, message: String },

    /// None of the known tamper map keys is present in the archive.
    #[error("No known heatmap key found. Keys present: {keys:?}")]
    MissingTamperMap { keys: Vec<String> },

    /// The tamper map is not a 2-D array after squeezing singleton axes.
    #[error("Unsupported tamper map shape {0:?}")]
    UnsupportedMapShape(Vec<usize>),

    /// An image could not be opened or decoded.
    #[error("Image not readable: {path:?}")]
    ImageUnreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// An image could not be encoded to disk.
    #[error("Failed to write image {path:?}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// NPZ archive could not be read.
    #[error("NPZ read error in {path:?}: {message}")]
    Npz { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ForensicsError {
    pub fn tool_not_found(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        ForensicsError::ToolNotFound {
            what: what.into(),
            path: path.into(),
        }
    }

    pub fn invalid_output(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ForensicsError::InvalidToolOutput {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn npz(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        ForensicsError::Npz {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for analysis operations.
pub type ForensicsResult<T> = Result<T, ForensicsError>;
