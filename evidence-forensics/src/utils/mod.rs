//! Utility helpers (formatting, file name safety).

pub mod format;
pub mod path;

pub use format::format_bytes;
pub use path::{file_name_lossy, secure_filename};
