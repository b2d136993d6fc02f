//! CSV export of the evidence register

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use super::EvidenceRecord;

#[derive(Debug, Serialize)]
struct CsvEvidenceRow<'a> {
    seal_id: &'a str,
    fir_number: &'a str,
    title: &'a str,
    evidence_type: &'a str,
    original_filename: &'a str,
    stored_filename: &'a str,
    file_size: u64,
    mime_type: &'a str,
    sha256: &'a str,
    sensitivity: &'a str,
    location: String,
    forensic_status: String,
    uploaded_by: &'a str,
    uploaded_at: String,
    movements: usize,
}

impl<'a> From<&'a EvidenceRecord> for CsvEvidenceRow<'a> {
    fn from(record: &'a EvidenceRecord) -> Self {
        Self {
            seal_id: &record.seal_id,
            fir_number: &record.fir_number,
            title: &record.title,
            evidence_type: &record.evidence_type,
            original_filename: &record.original_filename,
            stored_filename: &record.stored_filename,
            file_size: record.file_size,
            mime_type: record.mime_type.as_deref().unwrap_or(""),
            sha256: &record.file_hash,
            sensitivity: &record.sensitivity,
            location: record.location(),
            forensic_status: record.forensic_status.to_string(),
            uploaded_by: &record.uploaded_by,
            uploaded_at: record.uploaded_at.to_rfc3339(),
            movements: record.movements.len(),
        }
    }
}

/// Export the register to CSV with UTF-8 BOM for Excel compatibility
pub fn export_register(records: &[EvidenceRecord], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
        .with_context(|| format!("Failed to create CSV: {:?}", path))?;

    file.write_all(&[0xEF, 0xBB, 0xBF])?;

    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
    for record in records {
        writer.serialize(CsvEvidenceRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}
