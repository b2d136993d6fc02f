//! Formatting helpers.

const UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];

/// Human-readable size: exact bytes below 1 KiB, otherwise 2 decimals.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
