//! Open case with its directories and custody log

use anyhow::Result;
use std::path::PathBuf;

use super::{create_case_directories, AnalysisRecord, Case, CaseDirectories};
use crate::forensics::CustodyLog;

/// Everything needed to act on a case from the command line
#[derive(Debug)]
pub struct CaseWorkspace {
    pub case: Case,
    pub dirs: CaseDirectories,
    pub custody: CustodyLog,
}

impl CaseWorkspace {
    /// Load or create the case, lay out its directories and open the custody log.
    pub fn open(name: impl Into<String>, output_dir: PathBuf) -> Result<Self> {
        let case = Case::open_or_create(name, output_dir)?;
        let is_new = !case.case_file().exists();
        let dirs = create_case_directories(&case)?;
        let custody = CustodyLog::open(dirs.custody_log())?;

        let workspace = Self { case, dirs, custody };
        if is_new {
            workspace.save()?;
            tracing::info!(
                "Created case {} at {:?}",
                workspace.case.case_id(),
                workspace.dirs.base
            );
        }
        Ok(workspace)
    }

    pub fn save(&self) -> Result<()> {
        self.case.save()
    }

    /// Store an analysis result, log it and persist the case.
    pub fn record_analysis(&mut self, record: AnalysisRecord) -> Result<()> {
        let action = format!(
            "{} Analysis | SealID {} | Verdict {} | Risk {}{}",
            record.kind,
            record.seal_id,
            record.verdict,
            record.risk,
            record
                .score
                .map(|s| format!(" | Score {:.3}", s))
                .unwrap_or_default()
        );
        let actor = record.analyzed_by.clone();
        self.case.record_analysis(record)?;
        self.custody.record(&actor, action)?;
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::RiskLevel;
    use crate::case::AnalysisKind;
    use crate::evidence::test_record;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_layout() {
        let dir = tempdir().unwrap();
        let ws = CaseWorkspace::open("fir-1", dir.path().to_path_buf()).unwrap();
        assert!(ws.case.case_file().exists());
        assert!(ws.dirs.custody_log().exists());
        assert!(ws.custody.is_empty());
    }

    #[test]
    fn test_record_analysis_logs_and_persists() {
        let dir = tempdir().unwrap();
        let mut ws = CaseWorkspace::open("fir-2", dir.path().to_path_buf()).unwrap();
        ws.case.add_evidence(test_record("SEAL-20260101-00000001", "aa")).unwrap();

        ws.record_analysis(AnalysisRecord {
            seal_id: "SEAL-20260101-00000001".to_string(),
            kind: AnalysisKind::Image,
            verdict: "Tampered".to_string(),
            risk: RiskLevel::High,
            score: Some(0.71234),
            artifacts: vec![],
            analyzed_by: "analyst".to_string(),
            analyzed_at: Utc::now(),
        })
        .unwrap();

        assert_eq!(ws.custody.len(), 1);
        let log = std::fs::read_to_string(ws.dirs.custody_log()).unwrap();
        assert!(log.contains(
            "|analyst|Image Analysis | SealID SEAL-20260101-00000001 \
             | Verdict Tampered | Risk High | Score 0.712"
        ));

        let reopened = CaseWorkspace::open("fir-2", dir.path().to_path_buf()).unwrap();
        assert_eq!(reopened.case.analyses.len(), 1);
        assert_eq!(reopened.custody.final_hash(), ws.custody.final_hash());
    }
}
