//! File hashing

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashType {
    Sha256,
    Sha1,
    Md5,
}

impl FromStr for HashType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashType::Sha256),
            "sha1" | "sha-1" => Ok(HashType::Sha1),
            "md5" => Ok(HashType::Md5),
            _ => bail!("Unsupported hash type: {}", s),
        }
    }
}

impl std::fmt::Display for HashType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashType::Sha256 => write!(f, "sha256"),
            HashType::Sha1 => write!(f, "sha1"),
            HashType::Md5 => write!(f, "md5"),
        }
    }
}

fn read_chunks(path: &Path, mut consume: impl FnMut(&[u8])) -> Result<()> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            return Ok(());
        }
        consume(&buffer[..n]);
    }
}

/// Lowercase hex digest of a file
pub fn compute_file_hash(path: &Path, hash_type: HashType) -> Result<String> {
    match hash_type {
        HashType::Sha256 => {
            let mut hasher = Sha256::new();
            read_chunks(path, |chunk| hasher.update(chunk))?;
            Ok(hex::encode(hasher.finalize()))
        }
        HashType::Sha1 => {
            use sha1::{Digest as Sha1Digest, Sha1};
            let mut hasher = Sha1::new();
            read_chunks(path, |chunk| hasher.update(chunk))?;
            Ok(hex::encode(hasher.finalize()))
        }
        HashType::Md5 => {
            let mut context = md5::Context::new();
            read_chunks(path, |chunk| context.consume(chunk))?;
            Ok(format!("{:x}", context.compute()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_known_digests() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();

        assert_eq!(
            compute_file_hash(&path, HashType::Sha256).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            compute_file_hash(&path, HashType::Sha1).unwrap(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            compute_file_hash(&path, HashType::Md5).unwrap(),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_parse_hash_type() {
        assert_eq!("SHA256".parse::<HashType>().unwrap(), HashType::Sha256);
        assert_eq!("sha-1".parse::<HashType>().unwrap(), HashType::Sha1);
        assert!("crc32".parse::<HashType>().is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(compute_file_hash(&dir.path().join("none"), HashType::Md5).is_err());
    }
}
