use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::CACHE_DB_VERSION;

/// A cached content hash.
///
/// Ids are namespaced: `public/<path>` for written outputs, `source/<path>`
/// for scanned source files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
  pub id: String,
  pub hash: String,
}

impl CacheRecord {
  pub fn new(id: impl Into<String>, hash: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      hash: hash.into(),
    }
  }
}

/// On-disk layout of the cache database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheDb {
  pub version: u32,
  pub records: Vec<CacheRecord>,
}

impl Default for CacheDb {
  fn default() -> Self {
    Self {
      version: CACHE_DB_VERSION,
      records: Vec::new(),
    }
  }
}

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("failed to read cache database {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse cache database {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to write cache database {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to serialize cache database: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("unsupported cache database version {0}")]
  UnsupportedVersion(u32),
}
