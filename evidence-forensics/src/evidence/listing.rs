//! Evidence file discovery

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    fn extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => IMAGE_EXTENSIONS,
            MediaKind::Video => VIDEO_EXTENSIONS,
        }
    }

    /// Classify by extension, case-insensitive
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        [MediaKind::Image, MediaKind::Video]
            .into_iter()
            .find(|kind| kind.extensions().contains(&ext.as_str()))
    }
}

/// Names of regular files in `dir` of the given kind, sorted.
///
/// A missing directory yields an empty list.
pub fn list_evidence_files(dir: &Path, kind: MediaKind) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if MediaKind::from_path(&path) == Some(kind) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
