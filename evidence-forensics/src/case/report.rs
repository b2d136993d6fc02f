//! Report generation

use anyhow::{Context, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use super::Case;
use crate::utils::format_bytes;

const INTEGRITY_MARKER: &str = "\n--- Report Integrity ---\n";

/// Who produced the report, and where
#[derive(Debug, Clone, Default)]
pub struct ReportMetadata {
    pub tool_version: String,
    pub examiner: Option<String>,
    pub workstation: Option<String>,
    /// `<os> <arch>`
    pub platform: Option<String>,
}

impl ReportMetadata {
    pub fn from_environment() -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            examiner: examiner_from_env(),
            workstation: workstation_from_env(),
            platform: Some(format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)),
        }
    }
}

/// First non-empty value among the given environment variables.
fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Login name of the person running the tool.
pub fn examiner_from_env() -> Option<String> {
    first_env(&["USER", "LOGNAME", "USERNAME"])
}

fn workstation_from_env() -> Option<String> {
    let from_file = if cfg!(unix) {
        fs::read_to_string("/etc/hostname")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    } else {
        None
    };
    from_file.or_else(|| first_env(&["HOSTNAME", "COMPUTERNAME"]))
}

fn body_hash(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}

/// Generate a report as plain text
pub fn generate_report(
    case: &Case,
    log_hash: Option<&str>,
    metadata: Option<&ReportMetadata>,
) -> String {
    let mut report = String::new();

    report.push_str("=== evidence-forensics Forensic Report ===\n\n");

    if let Some(meta) = metadata {
        report.push_str("--- Examination Environment ---\n");
        report.push_str(&format!("evidence-forensics version: {}\n", meta.tool_version));
        for (label, value) in [
            ("Examiner", &meta.examiner),
            ("Workstation", &meta.workstation),
            ("Platform", &meta.platform),
        ] {
            if let Some(value) = value {
                report.push_str(&format!("{}: {}\n", label, value));
            }
        }
        report.push('\n');
    }

    report.push_str("--- Case ---\n");
    report.push_str(&format!("Case: {}\n", case.case_id()));
    report.push_str(&format!("Created: {}\n", case.created_at));
    report.push_str(&format!("Evidence items: {}\n", case.evidence.len()));
    report.push_str(&format!("Analyses: {}\n\n", case.analyses.len()));

    report.push_str("--- Evidence ---\n");
    if case.evidence.is_empty() {
        report.push_str("No evidence sealed.\n\n");
    } else {
        for e in &case.evidence {
            report.push_str(&format!("- {} [FIR {}] {}\n", e.seal_id, e.fir_number, e.title));
            report.push_str(&format!(
                "  File: {} (stored as {}, {})\n",
                e.original_filename,
                e.stored_filename,
                format_bytes(e.file_size)
            ));
            report.push_str(&format!("  SHA-256: {}\n", e.file_hash));
            report.push_str(&format!(
                "  Type: {} | Sensitivity: {} | Status: {}\n",
                e.evidence_type, e.sensitivity, e.forensic_status
            ));
            report.push_str(&format!("  Location: {}\n", e.current_location()));
            report.push_str(&format!("  Sealed by {} at {}\n", e.uploaded_by, e.uploaded_at));
        }
        report.push('\n');
    }

    report.push_str("--- Analyses ---\n");
    if case.analyses.is_empty() {
        report.push_str("No analyses recorded.\n\n");
    } else {
        for a in &case.analyses {
            report.push_str(&format!(
                "- {} {}: {} ({} risk){}\n",
                a.seal_id,
                a.kind,
                a.verdict,
                a.risk,
                a.score.map(|s| format!(", score {:.3}", s)).unwrap_or_default()
            ));
            report.push_str(&format!("  By {} at {}\n", a.analyzed_by, a.analyzed_at));
            for artifact in &a.artifacts {
                report.push_str(&format!("  Artifact: {}\n", artifact.display()));
            }
        }
        report.push('\n');
    }

    let moved: Vec<_> = case.evidence.iter().filter(|e| !e.movements.is_empty()).collect();
    if !moved.is_empty() {
        report.push_str("--- Movement History ---\n");
        for e in moved {
            for m in &e.movements {
                report.push_str(&format!(
                    "- {} {}: {} -> {} ({}) by {}\n",
                    m.moved_at, e.seal_id, m.from_location, m.to_location, m.reason, m.moved_by
                ));
            }
        }
        report.push('\n');
    }

    if let Some(hash) = log_hash {
        report.push_str("--- Custody Log Integrity ---\n");
        report.push_str(&format!("Final Log Hash: {}\n\n", hash));
    }

    report.push_str(&format!("Report generated at {}\n", Utc::now()));

    report
}

/// Write the report followed by an integrity trailer holding the SHA-256 of
/// the body (trailing whitespace trimmed).
pub fn write_report(path: impl AsRef<Path>, contents: &str) -> Result<()> {
    let path = path.as_ref();
    let body = contents.trim_end();
    let signed = format!("{}{}SHA-256: {}\n", body, INTEGRITY_MARKER, body_hash(body));
    fs::write(path, signed).with_context(|| format!("Failed to write report to {:?}", path))
}

/// Recompute the body hash of a report written by [`write_report`].
/// A report without a trailer does not verify.
pub fn verify_report(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let verified = content
        .rsplit_once(INTEGRITY_MARKER)
        .and_then(|(body, trailer)| {
            let expected = trailer.trim().strip_prefix("SHA-256: ")?;
            Some(body_hash(body) == expected)
        })
        .unwrap_or(false);
    Ok(verified)
}

/// Write the forensic report as an Excel (.xlsx) workbook.
pub fn write_report_xlsx(
    path: impl AsRef<Path>,
    case: &Case,
    log_hash: Option<&str>,
    metadata: Option<&ReportMetadata>,
) -> Result<()> {
    use rust_xlsxwriter::Workbook;

    let path = path.as_ref();
    let mut workbook = Workbook::new();

    // --- Summary sheet ---
    let summary = workbook
        .add_worksheet()
        .set_name("Summary")
        .context("Failed to add Summary sheet")?;
    let mut row = 0u32;
    summary.write_string(row, 0, "evidence-forensics Forensic Report")?;
    row += 2;

    if let Some(meta) = metadata {
        let fields = [
            ("Tool Version", Some(meta.tool_version.as_str())),
            ("Examiner", meta.examiner.as_deref()),
            ("Workstation", meta.workstation.as_deref()),
            ("Platform", meta.platform.as_deref()),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                summary.write_string(row, 0, label)?;
                summary.write_string(row, 1, value)?;
                row += 1;
            }
        }
        row += 1;
    }

    summary.write_string(row, 0, "Case")?;
    summary.write_string(row, 1, case.case_id())?;
    row += 1;
    summary.write_string(row, 0, "Created")?;
    summary.write_string(row, 1, case.created_at.to_string())?;
    row += 1;
    summary.write_string(row, 0, "Evidence Items")?;
    summary.write_number(row, 1, case.evidence.len() as f64)?;
    row += 1;
    summary.write_string(row, 0, "Analyses")?;
    summary.write_number(row, 1, case.analyses.len() as f64)?;
    if let Some(hash) = log_hash {
        row += 1;
        summary.write_string(row, 0, "Custody Log Hash")?;
        summary.write_string(row, 1, hash)?;
    }

    // --- Evidence sheet ---
    if !case.evidence.is_empty() {
        let sheet = workbook
            .add_worksheet()
            .set_name("Evidence")
            .context("Failed to add Evidence sheet")?;
        let headers = [
            "Seal ID", "FIR", "Title", "Type", "File", "Stored As", "Size", "SHA-256", "Status",
            "Location", "Sealed By", "Sealed At",
        ];
        for (col, h) in headers.iter().enumerate() {
            sheet.write_string(0, col as u16, *h)?;
        }
        for (i, e) in case.evidence.iter().enumerate() {
            let r = (i + 1) as u32;
            sheet.write_string(r, 0, &e.seal_id)?;
            sheet.write_string(r, 1, &e.fir_number)?;
            sheet.write_string(r, 2, &e.title)?;
            sheet.write_string(r, 3, &e.evidence_type)?;
            sheet.write_string(r, 4, &e.original_filename)?;
            sheet.write_string(r, 5, &e.stored_filename)?;
            sheet.write_number(r, 6, e.file_size as f64)?;
            sheet.write_string(r, 7, &e.file_hash)?;
            sheet.write_string(r, 8, e.forensic_status.to_string())?;
            sheet.write_string(r, 9, e.current_location())?;
            sheet.write_string(r, 10, &e.uploaded_by)?;
            sheet.write_string(r, 11, e.uploaded_at.to_rfc3339())?;
        }
    }

    // --- Analyses sheet ---
    if !case.analyses.is_empty() {
        let sheet = workbook
            .add_worksheet()
            .set_name("Analyses")
            .context("Failed to add Analyses sheet")?;
        let headers = ["Seal ID", "Kind", "Verdict", "Risk", "Score", "Analyst", "Analyzed At"];
        for (col, h) in headers.iter().enumerate() {
            sheet.write_string(0, col as u16, *h)?;
        }
        for (i, a) in case.analyses.iter().enumerate() {
            let r = (i + 1) as u32;
            sheet.write_string(r, 0, &a.seal_id)?;
            sheet.write_string(r, 1, a.kind.to_string())?;
            sheet.write_string(r, 2, &a.verdict)?;
            sheet.write_string(r, 3, a.risk.to_string())?;
            if let Some(score) = a.score {
                sheet.write_number(r, 4, score)?;
            }
            sheet.write_string(r, 5, &a.analyzed_by)?;
            sheet.write_string(r, 6, a.analyzed_at.to_rfc3339())?;
        }
    }

    workbook.save(path).context("Failed to save XLSX report")?;
    Ok(())
}
