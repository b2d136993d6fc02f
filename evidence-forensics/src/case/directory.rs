//! Case directory structure

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use super::Case;
use crate::forensics::CUSTODY_LOG_NAME;

/// Well-known locations inside one case folder
#[derive(Debug, Clone)]
pub struct CaseDirectories {
    pub base: PathBuf,
    /// Sealed copies of evidence files
    pub evidence: PathBuf,
    pub logs: PathBuf,
    pub trufor_output: PathBuf,
    pub video_output: PathBuf,
    pub report: PathBuf,
}

impl CaseDirectories {
    pub fn custody_log(&self) -> PathBuf {
        self.logs.join(CUSTODY_LOG_NAME)
    }

    /// Per-evidence output directory for video analysis
    pub fn video_dir(&self, seal_id: &str) -> PathBuf {
        self.video_output.join(seal_id)
    }
}

/// Lay out the case folder under `output_dir/<case name>`.
pub fn create_case_directories(case: &Case) -> Result<CaseDirectories> {
    let base = case.base_dir();
    let evidence = base.join("evidence");
    let logs = base.join("logs");
    let trufor_output = base.join("trufor_output");
    let video_output = base.join("video_output");
    let report = base.join("forensic_report.txt");

    for dir in [&evidence, &logs, &trufor_output, &video_output] {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }

    Ok(CaseDirectories {
        base,
        evidence,
        logs,
        trufor_output,
        video_output,
        report,
    })
}
