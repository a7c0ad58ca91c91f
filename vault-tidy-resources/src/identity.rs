//! Content identity: SHA-256 fingerprints of resource files.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::errors::{TidyError, TidyResult};

/// Hex-encoded SHA-256 digest of a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn from_hex(hex: &str) -> Self {
        Self(hex.to_string())
    }

    /// First eight hex characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stream `path` through SHA-256 in `chunk_size` reads.
pub fn fingerprint(path: &Path, chunk_size: usize) -> TidyResult<Fingerprint> {
    let read_error = |source| TidyError::ResourceRead {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(read_error)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];
    loop {
        let read = file.read(&mut buffer).map_err(read_error)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(Fingerprint(hex::encode(hasher.finalize())))
}

/// `true` only when both files fingerprint and the digests match.
pub fn identical(a: &Path, b: &Path, chunk_size: usize) -> bool {
    match (fingerprint(a, chunk_size), fingerprint(b, chunk_size)) {
        (Ok(left), Ok(right)) => left == right,
        (Err(e), _) | (_, Err(e)) => {
            warn!("{}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK: usize = 4;

    #[test]
    fn fingerprint_is_sha256_hex() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();

        let digest = fingerprint(&path, CHUNK).unwrap();
        assert_eq!(
            digest.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(digest.short(), "e3b0c442");
    }

    #[test]
    fn chunk_size_does_not_change_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let bytes: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &bytes).unwrap();

        let small = fingerprint(&path, 3).unwrap();
        let large = fingerprint(&path, 1 << 20).unwrap();
        assert_eq!(small, large);
    }

    #[test]
    fn identical_is_reflexive_and_symmetric() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        let c = dir.path().join("c.png");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();
        std::fs::write(&c, b"other bytes").unwrap();

        assert!(identical(&a, &a, CHUNK));
        assert!(identical(&a, &b, CHUNK));
        assert!(identical(&b, &a, CHUNK));
        assert!(!identical(&a, &c, CHUNK));
        assert!(!identical(&c, &a, CHUNK));
    }

    #[test]
    fn unreadable_side_is_never_identical() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        std::fs::write(&a, b"bytes").unwrap();
        let missing = dir.path().join("missing.png");

        assert!(matches!(
            fingerprint(&missing, CHUNK),
            Err(TidyError::ResourceRead { .. })
        ));
        assert!(!identical(&a, &missing, CHUNK));
        assert!(!identical(&missing, &missing, CHUNK));
    }
}
