//! Route table.
//!
//! The route table is the boundary between content production (generators,
//! renderers, the source scanner) and the build engine. The engine only reads
//! it through the [`RouteTable`] trait.

mod types;

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::debug;

pub use types::{ContentStream, Route, RouteError, RouteEvent, RouteEventKind, RouteEvents, RouteSource, StreamFactory};

/// Read-side contract of a route table.
pub trait RouteTable: Send + Sync {
  /// All producible output paths, in a deterministic order.
  fn list(&self) -> Vec<String>;

  /// The content provider for `path`.
  fn get(&self, path: &str) -> Result<RouteSource, RouteError>;

  /// Whether the source of `path` changed since the previous build.
  fn is_modified(&self, path: &str) -> bool;

  /// Subscribe to `update`/`remove` notifications.
  fn subscribe(&self) -> RouteEvents;
}

/// Normalize a route path.
///
/// Backslashes become `/`, empty, `.` and `..` segments are dropped, and
/// directory paths (empty or ending in `/`) resolve to their `index.html`.
/// The result never climbs out of the directory it is joined onto.
pub fn format_path(path: &str) -> String {
  let path = path.replace('\\', "/");
  let directory = matches!(path.rsplit('/').next(), None | Some("" | "." | ".."));

  let mut normalized = path
    .split('/')
    .filter(|segment| !matches!(*segment, "" | "." | ".."))
    .collect::<Vec<_>>()
    .join("/");

  if directory {
    if !normalized.is_empty() {
      normalized.push('/');
    }
    normalized.push_str("index.html");
  }

  normalized
}

/// In-memory route table.
#[derive(Default)]
pub struct Router {
  routes: RwLock<BTreeMap<String, Route>>,
  subscribers: Mutex<Vec<mpsc::UnboundedSender<RouteEvent>>>,
}

impl Router {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert or replace a route and notify subscribers.
  pub fn set(&self, path: &str, source: RouteSource, modified: bool) {
    let path = format_path(path);
    {
      let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
      routes.insert(path.clone(), Route { source, modified });
    }
    self.emit(RouteEvent::update(path));
  }

  /// Remove a route. Subscribers are only notified if it existed.
  pub fn remove(&self, path: &str) -> bool {
    let path = format_path(path);
    let existed = {
      let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
      routes.remove(&path).is_some()
    };

    if existed {
      self.emit(RouteEvent::remove(path));
    }

    existed
  }

  pub fn route(&self, path: &str) -> Option<Route> {
    let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
    routes.get(&format_path(path)).cloned()
  }

  pub fn contains(&self, path: &str) -> bool {
    let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
    routes.contains_key(&format_path(path))
  }

  pub fn len(&self) -> usize {
    self.routes.read().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn emit(&self, event: RouteEvent) {
    let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
    debug!(event = %event, subscribers = subscribers.len(), "route event");
    subscribers.retain(|tx| tx.send(event.clone()).is_ok());
  }
}

impl RouteTable for Router {
  fn list(&self) -> Vec<String> {
    let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
    routes.keys().cloned().collect()
  }

  fn get(&self, path: &str) -> Result<RouteSource, RouteError> {
    self
      .route(path)
      .map(|route| route.source)
      .ok_or_else(|| RouteError::NotFound(path.to_string()))
  }

  fn is_modified(&self, path: &str) -> bool {
    self.route(path).map(|route| route.modified).unwrap_or(false)
  }

  fn subscribe(&self) -> RouteEvents {
    let (tx, rx) = mpsc::unbounded_channel();
    self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).push(tx);
    rx
  }
}
