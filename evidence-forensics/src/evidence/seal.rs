//! Sealing, moving and verifying evidence

use anyhow::{bail, Context, Result};
use chrono::Utc;
use rand::rngs::OsRng;
use rand::Rng;
use std::path::Path;

use super::hash::{compute_file_hash, HashType};
use super::{EvidenceIntake, EvidenceMovement, EvidenceRecord, ForensicStatus};
use crate::case::CaseWorkspace;
use crate::utils::path::file_name_lossy;

pub use crate::utils::path::secure_filename;

const DEFAULT_SENSITIVITY: &str = "Normal";

/// `SEAL-<YYYYMMDD>-<8 uppercase hex>`, date in UTC
pub fn generate_seal_id() -> String {
    let suffix: u32 = OsRng.gen();
    format!("SEAL-{}-{:08X}", Utc::now().format("%Y%m%d"), suffix)
}

/// `<unix seconds>_<sanitized original name>`
pub fn stored_filename(original: &str, unix_seconds: i64) -> String {
    format!("{}_{}", unix_seconds, secure_filename(original))
}

/// MIME type from the file extension
pub fn guess_mime_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Copy `source` into the case evidence store and register it.
///
/// The SHA-256 of the stored copy must not already exist in the case; a
/// duplicate is removed again and rejected.
pub fn seal_evidence(
    ws: &mut CaseWorkspace,
    source: &Path,
    intake: EvidenceIntake,
    actor: &str,
) -> Result<EvidenceRecord> {
    if !source.is_file() {
        bail!("Evidence file not found: {:?}", source);
    }
    for (field, value) in [
        ("FIR number", &intake.fir_number),
        ("title", &intake.title),
        ("evidence type", &intake.evidence_type),
        ("facility", &intake.facility_name),
        ("collection room", &intake.collection_room),
        ("storage type", &intake.storage_type),
    ] {
        if value.trim().is_empty() {
            bail!("Missing required field: {}", field);
        }
    }

    let original_filename = file_name_lossy(source);
    let stored = stored_filename(&original_filename, Utc::now().timestamp());
    let file_path = ws.dirs.evidence.join(&stored);
    if file_path.exists() {
        bail!("Stored evidence file already exists: {:?}", file_path);
    }

    std::fs::copy(source, &file_path)
        .with_context(|| format!("Failed to copy {:?} to {:?}", source, file_path))?;

    let registered = register_copy(ws, &file_path, stored, original_filename, intake, actor);
    if registered.is_err() {
        // Best-effort removal of the unregistered copy
        let _ = std::fs::remove_file(&file_path);
    }
    let record = registered?;

    tracing::info!(
        "Sealed {} as {} ({} bytes, sha256 {})",
        record.original_filename,
        record.seal_id,
        record.file_size,
        record.file_hash
    );
    Ok(record)
}

/// Hash the stored copy and enter it in the register and custody log.
fn register_copy(
    ws: &mut CaseWorkspace,
    file_path: &Path,
    stored: String,
    original_filename: String,
    intake: EvidenceIntake,
    actor: &str,
) -> Result<EvidenceRecord> {
    let file_hash = compute_file_hash(file_path, HashType::Sha256)?;
    if ws.case.has_hash(&file_hash) {
        bail!("Evidence with SHA-256 {} is already sealed in this case", file_hash);
    }

    let record = EvidenceRecord {
        seal_id: generate_seal_id(),
        fir_number: intake.fir_number,
        title: intake.title,
        evidence_type: intake.evidence_type,
        description: intake.description,
        facility_name: intake.facility_name,
        collection_room: intake.collection_room,
        storage_type: intake.storage_type,
        storage_unit: non_empty(intake.storage_unit),
        storage_slot: non_empty(intake.storage_slot),
        sensitivity: non_empty(intake.sensitivity)
            .unwrap_or_else(|| DEFAULT_SENSITIVITY.to_string()),
        original_filename,
        stored_filename: stored,
        file_size: std::fs::metadata(file_path)?.len(),
        mime_type: guess_mime_type(file_path),
        file_path: file_path.to_path_buf(),
        file_hash,
        uploaded_by: actor.to_string(),
        forensic_status: ForensicStatus::Pending,
        uploaded_at: Utc::now(),
        movements: Vec::new(),
    };

    ws.case.add_evidence(record.clone())?;
    let logged = ws
        .custody
        .record(actor, format!("Evidence Uploaded | SealID {}", record.seal_id))
        .and_then(|_| ws.save());
    if let Err(e) = logged {
        ws.case.evidence.retain(|r| r.seal_id != record.seal_id);
        return Err(e);
    }
    Ok(record)
}

/// Log a physical movement. `from` defaults to the current location.
pub fn record_movement(
    ws: &mut CaseWorkspace,
    seal_id: &str,
    from: Option<&str>,
    to: &str,
    reason: &str,
    moved_by: &str,
) -> Result<EvidenceMovement> {
    if to.trim().is_empty() {
        bail!("Destination location is required");
    }
    let record = ws
        .case
        .find_evidence_mut(seal_id)
        .with_context(|| format!("Unknown evidence: {}", seal_id))?;

    let movement = EvidenceMovement {
        from_location: from
            .map(str::to_string)
            .unwrap_or_else(|| record.current_location()),
        to_location: to.to_string(),
        reason: reason.to_string(),
        moved_by: moved_by.to_string(),
        moved_at: Utc::now(),
    };
    record.movements.push(movement.clone());
    let seal = record.seal_id.clone();

    ws.custody.record(
        moved_by,
        format!(
            "Evidence Moved | SealID {} | {} -> {} | {}",
            seal, movement.from_location, movement.to_location, movement.reason
        ),
    )?;
    ws.save()?;
    Ok(movement)
}

/// Recompute the SHA-256 of the sealed copy and compare with the register.
pub fn verify_evidence(record: &EvidenceRecord) -> Result<bool> {
    let actual = compute_file_hash(&record.file_path, HashType::Sha256)
        .with_context(|| format!("Cannot verify {}", record.seal_id))?;
    Ok(actual.eq_ignore_ascii_case(&record.file_hash))
}
