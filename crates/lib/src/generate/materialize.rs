//! Single output file materialization.
//!
//! Drains a route's byte stream while hashing it, compares the digest with
//! the cache record for the path, and writes the file only when something
//! changed (or when forced). The cache record is updated before the write and
//! put back when the write fails.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info};

use super::lock::LockSet;
use super::types::{FileOutcome, GenerateError};
use crate::cache::{CacheRecord, MetadataStore};
use crate::consts::{PUBLIC_CACHE_PREFIX, STREAM_CHUNK_SIZE};
use crate::route::{ContentStream, RouteTable};
use crate::util::hash::{ContentHash, ContentHasher};

/// Cache id of the record for an output path.
pub fn cache_id(path: &str) -> String {
  format!("{}{}", PUBLIC_CACHE_PREFIX, path)
}

#[derive(Clone)]
pub struct Materializer {
  public_dir: PathBuf,
  routes: Arc<dyn RouteTable>,
  cache: Arc<dyn MetadataStore>,
  locks: LockSet,
  bail: bool,
}

impl Materializer {
  pub fn new(public_dir: impl Into<PathBuf>, routes: Arc<dyn RouteTable>, cache: Arc<dyn MetadataStore>, bail: bool) -> Self {
    Self {
      public_dir: public_dir.into(),
      routes,
      cache,
      locks: LockSet::new(),
      bail,
    }
  }

  pub fn public_dir(&self) -> &Path {
    &self.public_dir
  }

  pub fn routes(&self) -> &Arc<dyn RouteTable> {
    &self.routes
  }

  pub fn cache(&self) -> &Arc<dyn MetadataStore> {
    &self.cache
  }

  pub fn locks(&self) -> &LockSet {
    &self.locks
  }

  /// Destination of an output path inside the public directory.
  pub fn dest(&self, path: &str) -> PathBuf {
    self.public_dir.join(path)
  }

  /// Like [`Materializer::dest`], but refuses paths that would resolve
  /// outside the public directory.
  fn checked_dest(&self, path: &str) -> Result<PathBuf, GenerateError> {
    if Path::new(path).components().all(|c| matches!(c, Component::Normal(_))) {
      Ok(self.dest(path))
    } else {
      Err(GenerateError::OutsidePublicDir(path.to_string()))
    }
  }

  /// Produce or skip one output file.
  ///
  /// Returns [`FileOutcome::Busy`] without doing anything if the path is
  /// already being materialized or deleted.
  pub async fn materialize(&self, path: &str, force: bool) -> Result<FileOutcome, GenerateError> {
    let Some(_lock) = self.locks.try_acquire(path) else {
      debug!(path = %path, "already in flight, skipping");
      return Ok(FileOutcome::Busy);
    };

    self.write_file(path, force).await
  }

  /// Delete one output file. A file that is already gone is not an error.
  ///
  /// The cache record for the path is left in place.
  pub async fn remove(&self, path: &str) -> Result<FileOutcome, GenerateError> {
    let Some(_lock) = self.locks.try_acquire(path) else {
      debug!(path = %path, "already in flight, skipping");
      return Ok(FileOutcome::Busy);
    };

    let dest = self.checked_dest(path)?;
    match fs::remove_file(&dest).await {
      Ok(()) => {
        info!("Deleted: {}", path);
        Ok(FileOutcome::Deleted)
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path, "already deleted");
        Ok(FileOutcome::Absent)
      }
      Err(source) => Err(GenerateError::Delete { path: dest, source }),
    }
  }

  /// Hash-gated write. The caller must hold the lock for `path`.
  pub(crate) async fn write_file(&self, path: &str, force: bool) -> Result<FileOutcome, GenerateError> {
    let dest = self.checked_dest(path)?;
    let source = self.routes.get(path)?;

    let (content, hash) = match source.open().await {
      Ok(stream) => self.drain(path, stream).await?,
      Err(source) if self.bail => {
        return Err(GenerateError::Stream {
          path: path.to_string(),
          source,
        });
      }
      Err(e) => {
        error!(path = %path, error = %e, "failed to open content stream");
        (Vec::new(), ContentHasher::new().finish())
      }
    };

    let id = cache_id(path);
    let previous = self.cache.find_by_id(&id);
    if !force && previous.as_ref().is_some_and(|record| record.hash == hash.0) {
      debug!(path = %path, hash = %hash, "content unchanged");
      return Ok(FileOutcome::Unchanged);
    }

    self.cache.save(CacheRecord::new(id.as_str(), hash.0))?;

    if let Err(e) = write_output(dest, &content).await {
      match previous {
        Some(record) => self.cache.save(record)?,
        None => {
          self.cache.remove(&id);
        }
      }
      return Err(e);
    }

    info!("Generated: {}", path);
    Ok(FileOutcome::Written)
  }

  /// Read a stream to the end, buffering and hashing every chunk.
  ///
  /// In bail mode a read error aborts. Otherwise it is logged and the stream
  /// is treated as finished, keeping what was read so far.
  async fn drain(&self, path: &str, mut stream: ContentStream) -> Result<(Vec<u8>, ContentHash), GenerateError> {
    let mut content = Vec::new();
    let mut hasher = ContentHasher::new();
    let mut chunk = vec![0u8; STREAM_CHUNK_SIZE];

    loop {
      match stream.read(&mut chunk).await {
        Ok(0) => break,
        Ok(n) => {
          content.extend_from_slice(&chunk[..n]);
          hasher.update(&chunk[..n]);
        }
        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
        Err(source) if self.bail => {
          return Err(GenerateError::Stream {
            path: path.to_string(),
            source,
          });
        }
        Err(e) => {
          error!(path = %path, error = %e, "content stream failed, keeping partial content");
          break;
        }
      }
    }

    Ok((content, hasher.finish()))
  }
}

async fn write_output(dest: PathBuf, content: &[u8]) -> Result<(), GenerateError> {
  if let Some(parent) = dest.parent() {
    fs::create_dir_all(parent).await.map_err(|source| GenerateError::Write {
      path: parent.to_path_buf(),
      source,
    })?;
  }

  fs::write(&dest, content)
    .await
    .map_err(|source| GenerateError::Write { path: dest, source })
}
