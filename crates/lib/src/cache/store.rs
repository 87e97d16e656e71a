//! JSON-backed cache store.
//!
//! Records live in memory behind a mutex; [`CacheStore::flush`] writes the
//! whole table to disk atomically (write to temp, then rename).

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::MetadataStore;
use super::types::{CacheDb, CacheError, CacheRecord};
use crate::consts::CACHE_DB_VERSION;

#[derive(Debug, Default)]
pub struct CacheStore {
  /// Database file, `None` for a purely in-memory store.
  path: Option<PathBuf>,
  records: Mutex<BTreeMap<String, CacheRecord>>,
  /// Serializes concurrent flushes so they never share a temp file.
  flush_lock: Mutex<()>,
}

impl CacheStore {
  /// Create a store that is never persisted.
  pub fn in_memory() -> Self {
    Self::default()
  }

  /// Open the database at `path`.
  ///
  /// Returns an empty store if the file doesn't exist yet.
  pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
    let path = path.into();

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "cache database not found, starting empty");
        return Ok(Self {
          path: Some(path),
          ..Self::default()
        });
      }
      Err(source) => return Err(CacheError::Read { path, source }),
    };

    let db: CacheDb = serde_json::from_str(&content).map_err(|source| CacheError::Parse {
      path: path.clone(),
      source,
    })?;

    if db.version != CACHE_DB_VERSION {
      return Err(CacheError::UnsupportedVersion(db.version));
    }

    let records = db.records.into_iter().map(|r| (r.id.clone(), r)).collect();
    debug!(path = %path.display(), "loaded cache database");

    Ok(Self {
      path: Some(path),
      records: Mutex::new(records),
      flush_lock: Mutex::new(()),
    })
  }

  pub fn path(&self) -> Option<&Path> {
    self.path.as_deref()
  }

  pub fn len(&self) -> usize {
    self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn snapshot(&self) -> CacheDb {
    let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
    CacheDb {
      version: CACHE_DB_VERSION,
      records: records.values().cloned().collect(),
    }
  }
}

impl MetadataStore for CacheStore {
  fn find_by_id(&self, id: &str) -> Option<CacheRecord> {
    let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
    records.get(id).cloned()
  }

  fn save(&self, record: CacheRecord) -> Result<(), CacheError> {
    let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
    records.insert(record.id.clone(), record);
    Ok(())
  }

  fn remove(&self, id: &str) -> Option<CacheRecord> {
    let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
    records.remove(id)
  }

  fn filter(&self, predicate: &dyn Fn(&CacheRecord) -> bool) -> Vec<CacheRecord> {
    let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
    records.values().filter(|r| predicate(r)).cloned().collect()
  }

  fn flush(&self) -> Result<(), CacheError> {
    let Some(path) = &self.path else {
      return Ok(());
    };

    let _guard = self.flush_lock.lock().unwrap_or_else(PoisonError::into_inner);
    let db = self.snapshot();

    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent).map_err(|source| CacheError::Write {
        path: path.clone(),
        source,
      })?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let content = serde_json::to_string_pretty(&db).map_err(CacheError::Serialize)?;
    fs::write(&temp_path, content).map_err(|source| CacheError::Write {
      path: temp_path.clone(),
      source,
    })?;
    fs::rename(&temp_path, path).map_err(|source| CacheError::Write {
      path: path.clone(),
      source,
    })?;

    debug!(path = %path.display(), records = db.records.len(), "flushed cache database");
    Ok(())
  }
}
