//! Source directory scanner.
//!
//! Publishes every file under the source directory as a route of the same
//! relative path. Whether a route counts as modified is decided by comparing
//! the file's hash with the `source/<path>` record in the cache, so the flag
//! survives process restarts. A new hash is only recorded once the generator
//! reports the route's output settled, so a failed build leaves the route
//! modified for the next run.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cache::{CacheError, CacheRecord, MetadataStore};
use crate::consts::SOURCE_CACHE_PREFIX;
use crate::generate::BuildObserver;
use crate::route::{RouteSource, Router};
use crate::util::hash::hash_file;

#[derive(Debug, Error)]
pub enum SourceError {
  #[error("failed to walk source directory: {message}")]
  Walk { message: String },

  #[error("failed to read source file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("cache error: {0}")]
  Cache(#[from] CacheError),
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ScanStats {
  pub scanned: usize,
  pub added: usize,
  pub modified: usize,
  pub removed: usize,
}

impl ScanStats {
  pub fn has_changes(&self) -> bool {
    self.added + self.modified + self.removed > 0
  }
}

/// Files and directories starting with `_` or `.` are not published.
fn is_ignored(name: &OsStr) -> bool {
  let name = name.to_string_lossy();
  name.starts_with('_') || name.starts_with('.')
}

fn source_id(path: &str) -> String {
  format!("{}{}", SOURCE_CACHE_PREFIX, path)
}

/// Route path of a file relative to the source root, always `/`-separated.
fn route_path(root: &Path, file: &Path) -> String {
  let rel = file.strip_prefix(root).unwrap_or(file);
  rel
    .components()
    .map(|c| c.as_os_str().to_string_lossy().into_owned())
    .collect::<Vec<_>>()
    .join("/")
}

pub struct SourceScanner {
  source_dir: PathBuf,
  router: Arc<Router>,
  cache: Arc<dyn MetadataStore>,
  /// Routes published by the last scan and the hash they were seen with.
  known: Mutex<BTreeMap<String, String>>,
}

impl SourceScanner {
  pub fn new(source_dir: impl Into<PathBuf>, router: Arc<Router>, cache: Arc<dyn MetadataStore>) -> Self {
    Self {
      source_dir: source_dir.into(),
      router,
      cache,
      known: Mutex::new(BTreeMap::new()),
    }
  }

  pub fn source_dir(&self) -> &Path {
    &self.source_dir
  }

  /// Walk the source directory and bring the router up to date.
  ///
  /// The router is only touched for new files, changed files, files whose
  /// modified flag must be cleared, and files that disappeared.
  pub fn scan(&self) -> Result<ScanStats, SourceError> {
    let mut stats = ScanStats::default();
    let previous = self.known.lock().unwrap_or_else(PoisonError::into_inner).clone();
    let mut seen = BTreeMap::new();

    if self.source_dir.is_dir() {
      let walker = WalkDir::new(&self.source_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored(e.file_name()));

      for entry in walker {
        let entry = entry.map_err(|e| SourceError::Walk { message: e.to_string() })?;
        if !entry.file_type().is_file() {
          continue;
        }

        let path = route_path(&self.source_dir, entry.path());
        let hash = self.scan_file(&path, entry.path(), previous.get(&path), &mut stats)?;
        seen.insert(path, hash);
      }
    } else {
      warn!(path = %self.source_dir.display(), "source directory not found");
    }

    for path in previous.keys().filter(|path| !seen.contains_key(*path)) {
      if self.router.remove(path) {
        debug!(path = %path, "source removed");
        stats.removed += 1;
      }
    }
    let mut known = self.known.lock().unwrap_or_else(PoisonError::into_inner);
    *known = seen;

    // Forget hashes of sources that no longer exist, including ones deleted
    // while no process was running.
    for record in self.cache.filter(&|r| r.id.starts_with(SOURCE_CACHE_PREFIX)) {
      let path = &record.id[SOURCE_CACHE_PREFIX.len()..];
      if !known.contains_key(path) {
        self.cache.remove(&record.id);
      }
    }

    if stats.has_changes() {
      info!(
        scanned = stats.scanned,
        added = stats.added,
        modified = stats.modified,
        removed = stats.removed,
        "source scan"
      );
    }

    Ok(stats)
  }

  /// Publish one file and return its hash.
  fn scan_file(
    &self,
    path: &str,
    file: &Path,
    previous: Option<&String>,
    stats: &mut ScanStats,
  ) -> Result<String, SourceError> {
    stats.scanned += 1;

    let hash = hash_file(file).map_err(|source| SourceError::Read {
      path: file.to_path_buf(),
      source,
    })?;

    let modified = self.cache.find_by_id(&source_id(path)).is_none_or(|record| record.hash != hash.0);
    let changed = previous.is_some_and(|seen| *seen != hash.0);

    match self.router.route(path) {
      None => {
        self.router.set(path, RouteSource::File(file.to_path_buf()), modified);
        stats.added += 1;
      }
      Some(route) if changed || route.modified != modified => {
        self.router.set(path, RouteSource::File(file.to_path_buf()), modified);
        if changed {
          stats.modified += 1;
        }
      }
      Some(_) => {}
    }

    Ok(hash.0)
  }
}

impl BuildObserver for SourceScanner {
  /// Record the hash the route was last scanned with.
  fn output_settled(&self, path: &str) {
    let Some(hash) = self.known.lock().unwrap_or_else(PoisonError::into_inner).get(path).cloned() else {
      return;
    };

    let id = source_id(path);
    if self.cache.find_by_id(&id).is_some_and(|record| record.hash == hash) {
      return;
    }
    if let Err(e) = self.cache.save(CacheRecord::new(id, hash)) {
      warn!(path = %path, error = %e, "failed to record source hash");
    }
  }
}
