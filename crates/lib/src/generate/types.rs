//! Types for output generation.
//!
//! This module defines the options, outcomes, summary and error types shared
//! by the materializer, the scheduler and the generator.

use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CacheError;
use crate::deploy::DeployError;
use crate::route::RouteError;

/// Ceiling on the number of tasks running at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConcurrencyRepr", into = "ConcurrencyRepr")]
pub enum Concurrency {
  #[default]
  Unbounded,
  Limited(NonZeroUsize),
}

impl Concurrency {
  pub fn limited(n: usize) -> Option<Self> {
    NonZeroUsize::new(n).map(Concurrency::Limited)
  }

  /// Number of permits, `None` when unbounded.
  pub fn permits(self) -> Option<usize> {
    match self {
      Concurrency::Unbounded => None,
      Concurrency::Limited(n) => Some(n.get()),
    }
  }
}

impl std::fmt::Display for Concurrency {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Concurrency::Unbounded => write!(f, "unbounded"),
      Concurrency::Limited(n) => write!(f, "{}", n),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid concurrency {0:?}: expected a positive integer or \"unbounded\"")]
pub struct ParseConcurrencyError(String);

impl FromStr for Concurrency {
  type Err = ParseConcurrencyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim();
    match trimmed.to_ascii_lowercase().as_str() {
      "unbounded" | "infinity" | "inf" => Ok(Concurrency::Unbounded),
      other => other
        .parse::<usize>()
        .ok()
        .and_then(Concurrency::limited)
        .ok_or_else(|| ParseConcurrencyError(s.to_string())),
    }
  }
}

/// Config file form of [`Concurrency`]: either a number or a keyword.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConcurrencyRepr {
  Number(usize),
  Text(String),
}

impl TryFrom<ConcurrencyRepr> for Concurrency {
  type Error = ParseConcurrencyError;

  fn try_from(repr: ConcurrencyRepr) -> Result<Self, Self::Error> {
    match repr {
      ConcurrencyRepr::Number(n) => Concurrency::limited(n).ok_or_else(|| ParseConcurrencyError(n.to_string())),
      ConcurrencyRepr::Text(s) => s.parse(),
    }
  }
}

impl From<Concurrency> for ConcurrencyRepr {
  fn from(value: Concurrency) -> Self {
    match value {
      Concurrency::Unbounded => ConcurrencyRepr::Text("unbounded".to_string()),
      Concurrency::Limited(n) => ConcurrencyRepr::Number(n.get()),
    }
  }
}

/// Flags controlling one generator instance. Fixed for its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerateOptions {
  /// Ignore the hash cache and rewrite every output.
  pub force: bool,
  /// Abort a path on stream errors instead of writing partial content, and
  /// fail the batch on the first task error.
  pub bail: bool,
  pub concurrency: Concurrency,
  /// Keep running and react to route changes after the first build.
  pub watch: bool,
  /// Invoke the deployer after a successful non-watch build.
  pub deploy: bool,
}

/// How the scheduler reacts to a failing task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
  /// Report failure as soon as the first error is observed.
  FailFast,
  /// Run everything and report every result.
  CollectAll,
}

impl ErrorPolicy {
  pub fn from_bail(bail: bool) -> Self {
    if bail { ErrorPolicy::FailFast } else { ErrorPolicy::CollectAll }
  }
}

/// What happened to a single output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
  /// Content was written to the public directory.
  Written,
  /// Content was hashed and matched the cache; nothing written.
  Unchanged,
  /// Output exists and the route is unmodified; not even hashed.
  Skipped,
  /// Output file was deleted.
  Deleted,
  /// Output file to delete was already gone.
  Absent,
  /// Another operation on the same path was in flight; nothing done.
  Busy,
}

/// Lifecycle of a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Idle,
  Preparing,
  Running,
  Reporting,
  Watching,
}

/// Result of one full build.
#[derive(Debug, Default)]
pub struct GenerateSummary {
  pub written: Vec<String>,
  pub unchanged: usize,
  pub skipped: usize,
  pub deleted: Vec<String>,
  pub busy: usize,
  /// Per-path failures collected when not bailing.
  pub failed: Vec<(String, GenerateError)>,
  pub elapsed: Duration,
}

impl GenerateSummary {
  /// Number of files actually written.
  pub fn generated(&self) -> usize {
    self.written.len()
  }

  pub fn is_success(&self) -> bool {
    self.failed.is_empty()
  }

  pub(crate) fn record(&mut self, path: String, outcome: FileOutcome) {
    match outcome {
      FileOutcome::Written => self.written.push(path),
      FileOutcome::Unchanged => self.unchanged += 1,
      FileOutcome::Skipped => self.skipped += 1,
      FileOutcome::Deleted => self.deleted.push(path),
      FileOutcome::Absent => {}
      FileOutcome::Busy => self.busy += 1,
    }
  }
}

#[derive(Debug, Error)]
pub enum GenerateError {
  #[error("{0} is not a directory")]
  NotADirectory(PathBuf),

  #[error("output path {0} leaves the public directory")]
  OutsidePublicDir(String),

  #[error("failed to prepare public directory {path}: {source}")]
  PublicDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Route(#[from] RouteError),

  #[error("failed to read content of {path}: {source}")]
  Stream {
    path: String,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to delete {path}: {source}")]
  Delete {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("cache error: {0}")]
  Cache(#[from] CacheError),

  #[error("deploy failed: {0}")]
  Deploy(#[from] DeployError),

  #[error("task panicked: {0}")]
  Join(#[from] tokio::task::JoinError),
}

impl GenerateError {
  /// Whether this error must abort the build regardless of bail mode.
  pub fn is_fatal(&self) -> bool {
    matches!(self, GenerateError::NotADirectory(_) | GenerateError::PublicDir { .. })
  }
}
