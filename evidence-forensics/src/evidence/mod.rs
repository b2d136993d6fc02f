//! Evidence intake and register
//!
//! Evidence enters a case as a local file. It is copied into the case's
//! evidence store under a sanitized, timestamped name, hashed, and given a
//! seal ID that the custody log and analyses refer to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod export;
pub mod hash;
pub mod listing;
pub mod seal;

pub use export::export_register;
pub use hash::{compute_file_hash, HashType};
pub use listing::{list_evidence_files, MediaKind};
pub use seal::{
    generate_seal_id, guess_mime_type, record_movement, seal_evidence, secure_filename,
    stored_filename, verify_evidence,
};

/// Where an evidence item is in forensic processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ForensicStatus {
    #[default]
    Pending,
    Analyzed,
}

impl std::fmt::Display for ForensicStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForensicStatus::Pending => write!(f, "Pending"),
            ForensicStatus::Analyzed => write!(f, "Analyzed"),
        }
    }
}

/// Descriptive fields supplied by the officer sealing the evidence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceIntake {
    /// First Information Report number, an opaque reference
    pub fir_number: String,
    pub title: String,
    pub evidence_type: String,
    pub description: String,
    pub facility_name: String,
    pub collection_room: String,
    pub storage_type: String,
    pub storage_unit: Option<String>,
    pub storage_slot: Option<String>,
    /// Defaults to `Normal`
    pub sensitivity: Option<String>,
}

/// A physical relocation of the evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceMovement {
    pub from_location: String,
    pub to_location: String,
    pub reason: String,
    pub moved_by: String,
    pub moved_at: DateTime<Utc>,
}

/// A sealed evidence file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub seal_id: String,
    pub fir_number: String,
    pub title: String,
    pub evidence_type: String,
    pub description: String,
    pub facility_name: String,
    pub collection_room: String,
    pub storage_type: String,
    pub storage_unit: Option<String>,
    pub storage_slot: Option<String>,
    pub sensitivity: String,
    pub original_filename: String,
    pub stored_filename: String,
    /// Path of the sealed copy
    pub file_path: PathBuf,
    pub file_size: u64,
    pub mime_type: Option<String>,
    /// SHA-256 of the sealed copy, lowercase hex
    pub file_hash: String,
    pub uploaded_by: String,
    #[serde(default)]
    pub forensic_status: ForensicStatus,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub movements: Vec<EvidenceMovement>,
}

impl EvidenceRecord {
    /// Current storage location as `facility / room / type[ / unit][ / slot]`
    pub fn location(&self) -> String {
        let mut parts = vec![
            self.facility_name.as_str(),
            self.collection_room.as_str(),
            self.storage_type.as_str(),
        ];
        parts.extend(self.storage_unit.as_deref());
        parts.extend(self.storage_slot.as_deref());
        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" / ")
    }

    /// Destination of the latest movement, or the intake location
    pub fn current_location(&self) -> String {
        self.movements
            .last()
            .map(|m| m.to_location.clone())
            .unwrap_or_else(|| self.location())
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        MediaKind::from_path(&self.file_path)
    }
}

#[cfg(test)]
pub(crate) fn test_record(seal_id: &str, file_hash: &str) -> EvidenceRecord {
    EvidenceRecord {
        seal_id: seal_id.to_string(),
        fir_number: "FIR-2026-0042".to_string(),
        title: "Scene photo".to_string(),
        evidence_type: "Image".to_string(),
        description: "Photo of the scene".to_string(),
        facility_name: "Central Lab".to_string(),
        collection_room: "Room 2".to_string(),
        storage_type: "Digital".to_string(),
        storage_unit: Some("NAS-1".to_string()),
        storage_slot: None,
        sensitivity: "Normal".to_string(),
        original_filename: "photo.jpg".to_string(),
        stored_filename: "1700000000_photo.jpg".to_string(),
        file_path: PathBuf::from("/tmp/evidence/1700000000_photo.jpg"),
        file_size: 10,
        mime_type: Some("image/jpeg".to_string()),
        file_hash: file_hash.to_string(),
        uploaded_by: "officer1".to_string(),
        forensic_status: ForensicStatus::Pending,
        uploaded_at: Utc::now(),
        movements: Vec::new(),
    }
}
