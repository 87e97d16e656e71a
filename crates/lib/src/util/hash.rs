//! Hashing utilities for content-addressed change detection.
//!
//! This module provides:
//! - `ContentHash`: A full 64-character hash of some content
//! - `ContentHasher`: Streaming hasher fed chunk by chunk
//! - `hash_file()`: Single file hashing
//! - `hash_bytes()`: Arbitrary byte hashing

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A full 64-character SHA256 hash for content verification.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Incremental hasher for content that arrives in chunks.
///
/// Feeding the same byte sequence produces the same digest regardless of how
/// it was split into chunks.
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
  inner: Sha256,
}

impl ContentHasher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn update(&mut self, chunk: &[u8]) {
    self.inner.update(chunk);
  }

  pub fn finish(self) -> ContentHash {
    ContentHash(hex::encode(self.inner.finalize()))
  }
}

/// Hash a file's contents.
///
/// Returns the full 64-character SHA256 hash of the file.
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
  let mut file = fs::File::open(path)?;

  let mut hasher = ContentHasher::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(hasher.finish())
}

/// Hash arbitrary bytes.
///
/// Returns the full 64-character SHA256 hash.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = ContentHasher::new();
  hasher.update(data);
  hasher.finish()
}
