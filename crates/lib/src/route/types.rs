//! Types for the route table.
//!
//! A route maps an output path (relative to the public directory) to a
//! lazily-opened byte stream and a flag telling whether its source changed
//! since the previous build.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;

/// An async byte stream produced by a route.
pub type ContentStream = Box<dyn AsyncRead + Send + Unpin>;

/// Factory for custom route streams. Called once per materialization.
pub type StreamFactory = Arc<dyn Fn() -> io::Result<ContentStream> + Send + Sync>;

/// Receiving end of a route table subscription.
pub type RouteEvents = mpsc::UnboundedReceiver<RouteEvent>;

#[derive(Debug, Error)]
pub enum RouteError {
  #[error("route not found: {0}")]
  NotFound(String),
}

/// Where the content of a route comes from.
///
/// Nothing is read until [`RouteSource::open`] is called.
#[derive(Clone)]
pub enum RouteSource {
  /// Content already held in memory (rendered pages, generated feeds).
  Bytes(Arc<[u8]>),
  /// A file copied verbatim from disk.
  File(PathBuf),
  /// A custom stream, typically a renderer.
  Stream(StreamFactory),
}

impl RouteSource {
  pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
    RouteSource::Bytes(Arc::from(data.into()))
  }

  pub fn stream<F>(factory: F) -> Self
  where
    F: Fn() -> io::Result<ContentStream> + Send + Sync + 'static,
  {
    RouteSource::Stream(Arc::new(factory))
  }

  /// Open the byte stream for this source.
  pub async fn open(&self) -> io::Result<ContentStream> {
    match self {
      RouteSource::Bytes(data) => Ok(Box::new(io::Cursor::new(data.clone()))),
      RouteSource::File(path) => {
        let file = tokio::fs::File::open(path).await?;
        Ok(Box::new(file))
      }
      RouteSource::Stream(factory) => factory(),
    }
  }
}

impl std::fmt::Debug for RouteSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      RouteSource::Bytes(data) => f.debug_tuple("Bytes").field(&data.len()).finish(),
      RouteSource::File(path) => f.debug_tuple("File").field(path).finish(),
      RouteSource::Stream(_) => f.write_str("Stream(..)"),
    }
  }
}

/// A single entry of the route table.
#[derive(Debug, Clone)]
pub struct Route {
  pub source: RouteSource,
  /// Whether the source changed since the previous build.
  pub modified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteEventKind {
  Update,
  Remove,
}

/// Change notification emitted by a route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEvent {
  pub kind: RouteEventKind,
  pub path: String,
}

impl RouteEvent {
  pub fn update(path: impl Into<String>) -> Self {
    Self {
      kind: RouteEventKind::Update,
      path: path.into(),
    }
  }

  pub fn remove(path: impl Into<String>) -> Self {
    Self {
      kind: RouteEventKind::Remove,
      path: path.into(),
    }
  }
}

impl std::fmt::Display for RouteEvent {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.kind {
      RouteEventKind::Update => write!(f, "update:{}", self.path),
      RouteEventKind::Remove => write!(f, "remove:{}", self.path),
    }
  }
}
