//! Streaming file checksums for content comparison.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest as Sha2Digest, Sha256};

/// Bytes read per chunk while hashing.
pub const CHUNK_SIZE: usize = 4096;

/// Content checksum of a file.
///
/// Used for change detection only; two files are equal iff their
/// checksums are equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileDigest([u8; 32]);

impl FileDigest {
    /// Hash everything `reader` yields, [`CHUNK_SIZE`] bytes at a time.
    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            let read = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&chunk[..read]);
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Ok(Self(bytes))
    }

    /// Hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileDigest({})", self.to_hex().chars().take(12).collect::<String>())
    }
}

/// Compute the checksum of the file at `path` without loading it whole.
pub fn digest(path: &Path) -> io::Result<FileDigest> {
    FileDigest::from_reader(File::open(path)?)
}

/// Whether two files have identical contents.
pub fn files_match(actual: &Path, expect: &Path) -> io::Result<bool> {
    Ok(digest(actual)? == digest(expect)?)
}
