//! evidence-forensics library crate
//!
//! Exposes internal modules for integration tests and reuse by the binary.

pub mod analysis;
pub mod case;
pub mod config;
pub mod error;
pub mod evidence;
pub mod forensics;
pub mod tools;
pub mod utils;

pub use error::{ForensicsError, ForensicsResult};
