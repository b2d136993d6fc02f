//! Chain-of-custody log
//!
//! Every action on a piece of evidence is appended as one line:
//!
//! `timestamp|hash|prev_hash|actor|action`
//!
//! `hash` is the first 16 hex chars of SHA-256(prev_hash || timestamp ||
//! actor || action). Editing, removing or reordering any line breaks the
//! chain from that point on.

use anyhow::{Context, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Previous hash of the first entry
pub const GENESIS_HASH: &str = "0000000000000000";

/// Standard file name inside a case's `logs/` directory
pub const CUSTODY_LOG_NAME: &str = "custody.log";

/// Append-only, hash-chained custody log
#[derive(Debug)]
pub struct CustodyLog {
    path: PathBuf,
    file: File,
    last_hash: String,
    entries: usize,
}

/// One parsed log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustodyEntry {
    pub timestamp: String,
    pub hash: String,
    pub prev_hash: String,
    pub actor: String,
    pub action: String,
}

fn chain_hash(prev: &str, timestamp: &str, actor: &str, action: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev.as_bytes());
    hasher.update(timestamp.as_bytes());
    hasher.update(actor.as_bytes());
    hasher.update(action.as_bytes());
    hex::encode(hasher.finalize())[..16].to_string()
}

/// Newlines separate entries. The actor also may not contain `|`; the
/// action is the last field and may.
fn clean_field(value: &str, allow_pipe: bool) -> String {
    value
        .chars()
        .map(|c| match c {
            '|' if !allow_pipe => '/',
            '\r' | '\n' => ' ',
            other => other,
        })
        .collect()
}

fn parse_line(line: &str) -> Option<CustodyEntry> {
    let parts: Vec<&str> = line.splitn(5, '|').collect();
    if parts.len() != 5 {
        return None;
    }
    Some(CustodyEntry {
        timestamp: parts[0].to_string(),
        hash: parts[1].to_string(),
        prev_hash: parts[2].to_string(),
        actor: parts[3].to_string(),
        action: parts[4].to_string(),
    })
}

fn is_entry_line(line: &str) -> bool {
    !line.starts_with('#') && !line.trim().is_empty()
}

impl CustodyLog {
    /// Open the log, continuing the chain if the file already has entries.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {:?}", parent))?;
        }

        let existing = if path.exists() {
            read_entries(&path)?
        } else {
            Vec::new()
        };
        let is_new = !path.exists() || std::fs::metadata(&path)?.len() == 0;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open custody log: {:?}", path))?;

        let mut log = Self {
            path,
            file,
            last_hash: existing
                .last()
                .map(|e| e.hash.clone())
                .unwrap_or_else(|| GENESIS_HASH.to_string()),
            entries: existing.len(),
        };

        if is_new {
            log.write_header()?;
        }
        Ok(log)
    }

    fn write_header(&mut self) -> Result<()> {
        writeln!(self.file, "# evidence-forensics Chain of Custody Log")?;
        writeln!(self.file, "# Format: timestamp|hash|prev_hash|actor|action")?;
        writeln!(self.file, "#")?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Append an action performed by `actor` and return the new entry.
    pub fn record(&mut self, actor: &str, action: impl AsRef<str>) -> Result<CustodyEntry> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let actor = clean_field(actor, false);
        let action = clean_field(action.as_ref(), true);
        let hash = chain_hash(&self.last_hash, &timestamp, &actor, &action);

        let entry = CustodyEntry {
            timestamp,
            hash,
            prev_hash: self.last_hash.clone(),
            actor,
            action,
        };

        writeln!(
            self.file,
            "{}|{}|{}|{}|{}",
            entry.timestamp, entry.hash, entry.prev_hash, entry.actor, entry.action
        )
        .with_context(|| format!("Failed to append to {:?}", self.path))?;
        self.file.sync_all()?;

        self.last_hash = entry.hash.clone();
        self.entries += 1;
        Ok(entry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Hash of the newest entry, quoted in reports
    pub fn final_hash(&self) -> &str {
        &self.last_hash
    }

    pub fn verify(&self) -> Result<bool> {
        verify_log_file(&self.path)
    }
}

/// All entries of a log file. Malformed lines are an error.
pub fn read_entries(path: &Path) -> Result<Vec<CustodyEntry>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut entries = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if !is_entry_line(&line) {
            continue;
        }
        let entry = parse_line(&line)
            .with_context(|| format!("Malformed custody entry at line {}", number + 1))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Check every link and hash in a custody log.
///
/// Returns `Ok(false)` on a malformed line, broken link or hash mismatch.
pub fn verify_log_file(path: &Path) -> Result<bool> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut expected_prev = GENESIS_HASH.to_string();

    for line in BufReader::new(file).lines() {
        let line = line?;
        if !is_entry_line(&line) {
            continue;
        }
        let Some(entry) = parse_line(&line) else {
            return Ok(false);
        };
        if entry.prev_hash != expected_prev {
            return Ok(false);
        }
        let computed = chain_hash(&entry.prev_hash, &entry.timestamp, &entry.actor, &entry.action);
        if computed != entry.hash {
            return Ok(false);
        }
        expected_prev = entry.hash;
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_new_log_has_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join(CUSTODY_LOG_NAME);
        let log = CustodyLog::open(&path).unwrap();

        assert!(log.is_empty());
        assert_eq!(log.final_hash(), GENESIS_HASH);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# evidence-forensics Chain of Custody Log"));
    }

    #[test]
    fn test_chain_links() {
        let dir = tempdir().unwrap();
        let mut log = CustodyLog::open(dir.path().join("c.log")).unwrap();

        let first = log.record("officer|1", "Evidence Uploaded | SealID SEAL-1").unwrap();
        let second = log.record("analyst", "Image analysis: Authentic").unwrap();

        assert_eq!(first.prev_hash, GENESIS_HASH);
        assert_eq!(second.prev_hash, first.hash);
        assert_eq!(log.final_hash(), second.hash);
        assert_eq!(log.len(), 2);
        assert_eq!(first.actor, "officer/1");
        assert_eq!(first.action, "Evidence Uploaded | SealID SEAL-1");
        assert!(log.verify().unwrap());
    }

    #[test]
    fn test_reopen_continues_chain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.log");
        let last = {
            let mut log = CustodyLog::open(&path).unwrap();
            log.record("a", "one").unwrap();
            log.record("a", "two").unwrap().hash
        };

        let mut log = CustodyLog::open(&path).unwrap();
        assert_eq!(log.final_hash(), last);
        assert_eq!(log.len(), 2);
        log.record("b", "three").unwrap();

        assert!(verify_log_file(&path).unwrap());
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("# evidence-forensics").count(), 1);
        assert_eq!(read_entries(&path).unwrap().len(), 3);
    }

    #[test]
    fn test_detects_edited_action() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.log");
        {
            let mut log = CustodyLog::open(&path).unwrap();
            log.record("a", "moved to locker 4").unwrap();
            log.record("a", "analyzed").unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, content.replace("locker 4", "locker 9")).unwrap();
        assert!(!verify_log_file(&path).unwrap());
    }

    #[test]
    fn test_detects_removed_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.log");
        {
            let mut log = CustodyLog::open(&path).unwrap();
            log.record("a", "one").unwrap();
            log.record("a", "two").unwrap();
            log.record("a", "three").unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let kept: Vec<&str> = content.lines().filter(|l| !l.ends_with("|two")).collect();
        std::fs::write(&path, kept.join("\n")).unwrap();
        assert!(!verify_log_file(&path).unwrap());
    }

    #[test]
    fn test_detects_malformed_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.log");
        std::fs::write(&path, "# header\nnot-an-entry\n").unwrap();
        assert!(!verify_log_file(&path).unwrap());
        assert!(read_entries(&path).is_err());
    }
}
