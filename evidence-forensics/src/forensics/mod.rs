//! Forensics module
//!
//! Tamper-evident record keeping for evidence handling.

pub mod custody;

pub use custody::{verify_log_file, CustodyEntry, CustodyLog, CUSTODY_LOG_NAME, GENESIS_HASH};
