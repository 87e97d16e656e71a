use std::path::{Path, PathBuf};
use std::{fs, io};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::SiteConfig;

#[derive(Debug, Error)]
pub enum CleanError {
  #[error("failed to delete {path}: {source}")]
  Delete {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

#[derive(Debug, Default, serde::Serialize)]
pub struct CleanStats {
  pub db_deleted: bool,
  pub public_deleted: bool,
  pub files_deleted: usize,
  pub bytes_freed: u64,
}

impl CleanStats {
  pub fn nothing_to_do(&self) -> bool {
    !self.db_deleted && !self.public_deleted
  }
}

#[derive(Debug, serde::Serialize)]
pub struct CleanResult {
  pub stats: CleanStats,
  pub deleted_paths: Vec<PathBuf>,
}

/// Number of files and total size below `path`.
fn tree_size(path: &Path) -> (usize, u64) {
  WalkDir::new(path)
    .into_iter()
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_file())
    .filter_map(|e| e.metadata().ok())
    .fold((0, 0), |(count, bytes), m| (count + 1, bytes + m.len()))
}

/// Remove the cache database and the public directory.
///
/// Items that do not exist are skipped.
pub fn clean(config: &SiteConfig, dry_run: bool) -> Result<CleanResult, CleanError> {
  let mut stats = CleanStats::default();
  let mut deleted_paths = Vec::new();

  let db = config.db_file();
  if db.is_file() {
    let (files, bytes) = tree_size(&db);
    debug!(path = %db.display(), "removing cache database");
    if !dry_run {
      remove(&db, fs::remove_file(&db))?;
    }
    stats.db_deleted = true;
    stats.files_deleted += files;
    stats.bytes_freed += bytes;
    deleted_paths.push(db);
  }

  let public = config.public_path();
  if public.exists() {
    let (files, bytes) = tree_size(&public);
    debug!(path = %public.display(), "removing public directory");
    if !dry_run {
      let result = if public.is_dir() {
        fs::remove_dir_all(&public)
      } else {
        fs::remove_file(&public)
      };
      remove(&public, result)?;
    }
    stats.public_deleted = true;
    stats.files_deleted += files;
    stats.bytes_freed += bytes;
    deleted_paths.push(public);
  }

  info!(
    files_deleted = stats.files_deleted,
    bytes_freed = stats.bytes_freed,
    dry_run,
    "clean complete"
  );

  Ok(CleanResult { stats, deleted_paths })
}

/// Removal that lost a race with another deleter still counts as done.
fn remove(path: &Path, result: io::Result<()>) -> Result<(), CleanError> {
  match result {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(source) => Err(CleanError::Delete {
      path: path.to_path_buf(),
      source,
    }),
  }
}
