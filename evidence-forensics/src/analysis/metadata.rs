//! EXIF metadata anomalies
//!
//! Camera originals normally carry capture time and device make/model.
//! Missing tags or an editing tool in `Software` are reported as anomalies.

use exif::{In, Reader, Tag};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const MISSING_EXIF: &str = "Missing EXIF metadata";
pub const EDITING_SOFTWARE: &str = "Editing software detected";
pub const MISSING_TIMESTAMP: &str = "Missing original capture timestamp";
pub const MISSING_CAMERA: &str = "Camera make/model missing";
pub const PARSE_FAILED: &str = "EXIF parsing failed";

/// Substrings of `Software` values that indicate editing or generation.
const EDITOR_MARKERS: &[&str] = &["photoshop", "gimp", "ai", "generator"];

/// Inspect EXIF tags and list anything suspicious. Never fails; read errors
/// are reported as an anomaly.
pub fn extract_exif_anomalies(path: impl AsRef<Path>) -> Vec<String> {
    let path = path.as_ref();
    match read_exif(path) {
        Ok(Some(exif)) => anomalies_for(&exif),
        Ok(None) => vec![MISSING_EXIF.to_string()],
        Err(e) => {
            tracing::debug!("EXIF read failed for {:?}: {}", path, e);
            vec![PARSE_FAILED.to_string()]
        }
    }
}

fn read_exif(path: &Path) -> Result<Option<exif::Exif>, exif::Error> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    match Reader::new().read_from_container(&mut reader) {
        Ok(exif) if exif.fields().next().is_none() => Ok(None),
        Ok(exif) => Ok(Some(exif)),
        Err(exif::Error::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn anomalies_for(exif: &exif::Exif) -> Vec<String> {
    let mut anomalies = Vec::new();
    let has = |tag: Tag| exif.get_field(tag, In::PRIMARY).is_some();

    if let Some(software) = exif.get_field(Tag::Software, In::PRIMARY) {
        let value = software.display_value().to_string().to_lowercase();
        if EDITOR_MARKERS.iter().any(|m| value.contains(m)) {
            anomalies.push(EDITING_SOFTWARE.to_string());
        }
    }

    if !has(Tag::DateTimeOriginal) {
        anomalies.push(MISSING_TIMESTAMP.to_string());
    }

    if !has(Tag::Make) || !has(Tag::Model) {
        anomalies.push(MISSING_CAMERA.to_string());
    }

    anomalies
}
