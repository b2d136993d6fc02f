//! File name safety helpers.
//!
//! Evidence file names come from whoever hands the file over. Before a name
//! is used inside the case directory it is reduced to a portable ASCII form
//! that cannot traverse directories or hit a Windows device name.

use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// Name used when nothing usable is left after sanitizing
pub const FALLBACK_NAME: &str = "unnamed";

pub(crate) fn is_windows_reserved_name(name: &str) -> bool {
    // Reserved case-insensitively, even with extensions (e.g. CON.txt).
    let upper = name.to_ascii_uppercase();
    matches!(
        upper.as_str(),
        "CON" | "PRN" | "AUX" | "NUL"
            | "COM1" | "COM2" | "COM3" | "COM4" | "COM5" | "COM6" | "COM7" | "COM8" | "COM9"
            | "LPT1" | "LPT2" | "LPT3" | "LPT4" | "LPT5" | "LPT6" | "LPT7" | "LPT8" | "LPT9"
    )
}

/// Reduce an untrusted file name to `[A-Za-z0-9_.-]`.
///
/// The name is NFKD-decomposed so accented letters keep their base letter,
/// then remaining non-ASCII characters are dropped. Path separators become
/// spaces, runs of whitespace become `_`, and leading/trailing `.` and `_`
/// are trimmed.
/// Windows device names get a `_` prefix. Returns [`FALLBACK_NAME`] when
/// nothing remains.
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name
        .nfkd()
        .filter(|c| c.is_ascii())
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let mut out = kept.trim_matches(['.', '_']).to_string();

    if out.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    let stem = out.split('.').next().unwrap_or(&out);
    if is_windows_reserved_name(stem) {
        out = format!("_{}", out);
    }
    out
}

/// Final component of a path as UTF-8 (lossy), empty when there is none.
pub fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
