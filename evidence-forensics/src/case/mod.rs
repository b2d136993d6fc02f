//! Case management
//!
//! A case holds sealed evidence records and the analyses run on them. It
//! is persisted as `case.json` in the case directory.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::RiskLevel;
use crate::evidence::{EvidenceRecord, ForensicStatus};

pub mod directory;
pub mod report;
pub mod workspace;

pub use directory::{create_case_directories, CaseDirectories};
pub use workspace::CaseWorkspace;

/// File name of the persisted case
pub const CASE_FILE_NAME: &str = "case.json";

/// Case metadata and evidence register
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    /// Case/folder name
    pub name: String,
    pub output_dir: PathBuf,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub evidence: Vec<EvidenceRecord>,
    #[serde(default)]
    pub analyses: Vec<AnalysisRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisKind {
    Image,
    Video,
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisKind::Image => write!(f, "Image"),
            AnalysisKind::Video => write!(f, "Video"),
        }
    }
}

/// Outcome of one tool run against a sealed evidence file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub seal_id: String,
    pub kind: AnalysisKind,
    pub verdict: String,
    pub risk: RiskLevel,
    /// Mean tamper probability, images only
    pub score: Option<f64>,
    /// Files written by the analysis (heatmaps, overlays, JSON)
    #[serde(default)]
    pub artifacts: Vec<PathBuf>,
    pub analyzed_by: String,
    pub analyzed_at: DateTime<Utc>,
}

impl Case {
    /// Create a new case with the given name
    pub fn new(name: impl Into<String>, output_dir: PathBuf) -> Result<Self> {
        let name = name.into();
        let name = if name.trim().is_empty() {
            // Default name: case-YYYYMMDD-HHMMSS
            Utc::now().format("case-%Y%m%d-%H%M%S").to_string()
        } else {
            name
        };
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            bail!("Invalid case name: {:?}", name);
        }

        Ok(Self {
            name,
            output_dir,
            created_at: Utc::now(),
            evidence: Vec::new(),
            analyses: Vec::new(),
        })
    }

    /// Get the case identifier (folder name)
    pub fn case_id(&self) -> &str {
        &self.name
    }

    /// Directory holding everything for this case
    pub fn base_dir(&self) -> PathBuf {
        self.output_dir.join(&self.name)
    }

    pub fn case_file(&self) -> PathBuf {
        self.base_dir().join(CASE_FILE_NAME)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read case file {:?}", path))?;
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse case file {:?}", path))
    }

    /// Load `<output_dir>/<name>/case.json` if present, otherwise start a new case.
    pub fn open_or_create(name: impl Into<String>, output_dir: PathBuf) -> Result<Self> {
        let case = Self::new(name, output_dir)?;
        let path = case.case_file();
        if path.exists() {
            tracing::debug!("Loading existing case from {:?}", path);
            Self::load(path)
        } else {
            Ok(case)
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = self.case_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }

    /// Look up evidence by seal ID or stored file name.
    pub fn find_evidence(&self, key: &str) -> Option<&EvidenceRecord> {
        self.evidence
            .iter()
            .find(|e| e.seal_id == key || e.stored_filename == key)
    }

    pub fn find_evidence_mut(&mut self, key: &str) -> Option<&mut EvidenceRecord> {
        self.evidence
            .iter_mut()
            .find(|e| e.seal_id == key || e.stored_filename == key)
    }

    pub fn has_hash(&self, file_hash: &str) -> bool {
        self.evidence
            .iter()
            .any(|e| e.file_hash.eq_ignore_ascii_case(file_hash))
    }

    pub fn add_evidence(&mut self, record: EvidenceRecord) -> Result<()> {
        if self.has_hash(&record.file_hash) {
            bail!("Evidence with hash {} is already sealed in this case", record.file_hash);
        }
        if self.find_evidence(&record.seal_id).is_some() {
            bail!("Seal ID {} already exists", record.seal_id);
        }
        self.evidence.push(record);
        Ok(())
    }

    /// Store an analysis and mark its evidence as analyzed.
    pub fn record_analysis(&mut self, record: AnalysisRecord) -> Result<()> {
        let evidence = self
            .find_evidence_mut(&record.seal_id)
            .with_context(|| format!("Unknown evidence: {}", record.seal_id))?;
        evidence.forensic_status = ForensicStatus::Analyzed;
        self.analyses.push(record);
        Ok(())
    }

    pub fn analyses_for<'a>(
        &'a self,
        seal_id: &'a str,
    ) -> impl Iterator<Item = &'a AnalysisRecord> {
        self.analyses.iter().filter(move |a| a.seal_id == seal_id)
    }
}

/// Name of the most recently created case under `output_dir`, if any.
///
/// Folders without a readable `case.json` are skipped.
pub fn latest_case_name(output_dir: &Path) -> Result<Option<String>> {
    if !output_dir.is_dir() {
        return Ok(None);
    }
    let entries = std::fs::read_dir(output_dir)
        .with_context(|| format!("Failed to read case directory {:?}", output_dir))?;

    let mut latest: Option<(DateTime<Utc>, String)> = None;
    for entry in entries {
        let dir = entry?.path();
        let case_file = dir.join(CASE_FILE_NAME);
        if !case_file.is_file() {
            continue;
        }
        let case = match Case::load(&case_file) {
            Ok(case) => case,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {:#}", dir, e);
                continue;
            }
        };
        let Some(name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let candidate = (case.created_at, name);
        if latest.as_ref().map_or(true, |current| candidate > *current) {
            latest = Some(candidate);
        }
    }
    Ok(latest.map(|(_, name)| name))
}
