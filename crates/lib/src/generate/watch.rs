//! Watch loop.
//!
//! After the first build, route changes are applied one path at a time,
//! outside the scheduler. Each event spawns its handler and the loop moves on
//! without waiting; only the path lock keeps two operations on the same output
//! apart.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::{Generator, Phase};
use crate::route::{RouteEvent, RouteEventKind, RouteEvents};

impl Generator {
  /// Apply route events until the channel closes.
  pub async fn watch(self: &Arc<Self>, mut events: RouteEvents) {
    self.set_phase(Phase::Watching);
    info!("Watching for changes. Press Ctrl+C to exit.");

    while let Some(event) = events.recv().await {
      self.handle_event(event);
    }

    debug!("route event channel closed, leaving watch loop");
  }

  /// Dispatch one route event without waiting for it.
  ///
  /// Returns `None` when the event is ignored (an update whose route is not
  /// modified).
  pub fn handle_event(self: &Arc<Self>, event: RouteEvent) -> Option<JoinHandle<()>> {
    if event.kind == RouteEventKind::Update && !self.materializer.routes().is_modified(&event.path) {
      debug!(path = %event.path, "route updated but not modified, ignoring");
      return None;
    }

    let generator = Arc::clone(self);
    Some(tokio::spawn(async move {
      let result = match event.kind {
        RouteEventKind::Update => generator.generate_file(&event.path).await,
        RouteEventKind::Remove => generator.delete_file(&event.path).await,
      };

      match result {
        Ok(outcome) => debug!(event = %event, outcome = ?outcome, "handled route event"),
        Err(e) => error!(event = %event, error = %e, "failed to handle route event"),
      }

      if let Err(e) = generator.materializer.cache().flush() {
        error!(error = %e, "failed to save cache");
      }
    }))
  }
}
