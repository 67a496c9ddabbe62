// Digest computation module
// Streams byte content through CRC32/MD5 and renders lowercase hex

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::{Digest as Md5Digest, Md5};

use crate::error::RomCheckError;

/// Floor for streaming read sizes. Callers may ask for more, never less.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Digest algorithms the engine can compute.
/// Only CRC32 is matched against catalog data; MD5 is a file-level option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Crc32,
    Md5,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Crc32 => "crc32",
            Algorithm::Md5 => "md5",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for incremental digest state
trait Hasher {
    /// Fold new data into the running state
    fn update(&mut self, data: &[u8]);

    /// Finalize and render the digest as lowercase hex
    fn finalize(self: Box<Self>) -> String;
}

// CRC32 wrapper. crc32fast applies the standard final XOR itself; the
// rendered value keeps its natural hex width, no zero padding.
struct Crc32Hasher(crc32fast::Hasher);

impl Hasher for Crc32Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> String {
        format!("{:x}", self.0.finalize())
    }
}

// MD5 wrapper, fixed 32 hex characters
struct Md5Hasher(Md5);

impl Hasher for Md5Hasher {
    fn update(&mut self, data: &[u8]) {
        Md5Digest::update(&mut self.0, data);
    }

    fn finalize(self: Box<Self>) -> String {
        bytes_to_hex(&Md5Digest::finalize(self.0))
    }
}

fn hasher_for(algorithm: Algorithm) -> Box<dyn Hasher> {
    match algorithm {
        Algorithm::Crc32 => Box::new(Crc32Hasher(crc32fast::Hasher::new())),
        Algorithm::Md5 => Box::new(Md5Hasher(Md5Digest::new())),
    }
}

/// Digest computer with streaming I/O
#[derive(Debug, Clone)]
pub struct DigestComputer {
    chunk_size: usize,
}

impl DigestComputer {
    /// Create a new DigestComputer with the default chunk size
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Create a new DigestComputer with a custom chunk size.
    /// Requests below the floor are silently raised to the floor.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(DEFAULT_CHUNK_SIZE),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Compute the digest of a file's full byte stream
    pub fn digest_file(&self, path: &Path, algorithm: Algorithm) -> Result<String, RomCheckError> {
        let file = File::open(path)
            .map_err(|e| RomCheckError::from_io_error(e, "reading", Some(path.to_path_buf())))?;

        let digest = self
            .digest_reader(file, algorithm)
            .map_err(|e| RomCheckError::from_io_error(e, "reading", Some(path.to_path_buf())))?;

        tracing::debug!("{} {} of {}", algorithm, digest, path.display());
        Ok(digest)
    }

    /// Compute the digest of an arbitrary byte stream, chunk by chunk.
    /// Read errors propagate to the caller; nothing is retried.
    pub fn digest_reader<R: Read>(&self, mut reader: R, algorithm: Algorithm) -> io::Result<String> {
        let mut hasher = hasher_for(algorithm);
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hasher.finalize())
    }
}

impl Default for DigestComputer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert bytes to a lowercase hexadecimal string
fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
