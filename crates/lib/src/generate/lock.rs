//! Per-path mutual exclusion for output files.
//!
//! A path is held for the whole duration of one materialize or delete
//! operation. A second request for a held path does not wait: it gets `None`
//! and the caller treats the request as a no-op.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Default)]
pub struct LockSet {
  held: Arc<Mutex<HashSet<String>>>,
}

impl LockSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Try to take `path`. Returns `None` if it is already held.
  pub fn try_acquire(&self, path: &str) -> Option<PathLock> {
    let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
    if !held.insert(path.to_string()) {
      return None;
    }

    Some(PathLock {
      path: path.to_string(),
      held: Arc::clone(&self.held),
    })
  }

  pub fn is_held(&self, path: &str) -> bool {
    self.held.lock().unwrap_or_else(PoisonError::into_inner).contains(path)
  }

  pub fn len(&self) -> usize {
    self.held.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Guard for a held path. Released on drop, whether the operation succeeded,
/// failed or panicked.
#[derive(Debug)]
pub struct PathLock {
  path: String,
  held: Arc<Mutex<HashSet<String>>>,
}

impl PathLock {
  pub fn path(&self) -> &str {
    &self.path
  }
}

impl Drop for PathLock {
  fn drop(&mut self) {
    let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
    held.remove(&self.path);
  }
}
