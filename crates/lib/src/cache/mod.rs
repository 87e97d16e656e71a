//! Content-hash cache.
//!
//! A persistent key/value store used by the build engine to remember the hash
//! of every file it wrote, so unchanged outputs can be skipped on the next run.

mod store;
mod types;

pub use store::CacheStore;
pub use types::{CacheDb, CacheError, CacheRecord};

/// Contract of the metadata store consumed by the build engine.
///
/// `save` must be atomic with respect to concurrent `find_by_id` calls for the
/// same id.
pub trait MetadataStore: Send + Sync {
  fn find_by_id(&self, id: &str) -> Option<CacheRecord>;

  /// Insert or replace the record with the same id.
  fn save(&self, record: CacheRecord) -> Result<(), CacheError>;

  fn remove(&self, id: &str) -> Option<CacheRecord>;

  fn filter(&self, predicate: &dyn Fn(&CacheRecord) -> bool) -> Vec<CacheRecord>;

  /// Persist pending changes. Stores without a backing file do nothing.
  fn flush(&self) -> Result<(), CacheError> {
    Ok(())
  }
}
