//! Bounded-concurrency task runner.
//!
//! Every task is spawned onto the runtime up front and waits for a semaphore
//! permit before it starts, so at most `limit` tasks are active at once and a
//! finished task immediately makes room for the next pending one. Results are
//! reported in input order regardless of completion order.
//!
//! Under [`ErrorPolicy::FailFast`] the first error closes the semaphore and
//! the caller stops waiting. Tasks still queued for a permit never start;
//! tasks that already started keep running in the background.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

use super::types::{Concurrency, ErrorPolicy};

/// Run `tasks` with at most `limit` active at once.
///
/// Returns one result per task, in input order. Under
/// [`ErrorPolicy::FailFast`] the first observed error is returned instead.
pub async fn run_tasks<T, E, F>(tasks: Vec<F>, limit: Concurrency, policy: ErrorPolicy) -> Result<Vec<Result<T, E>>, E>
where
  F: Future<Output = Result<T, E>> + Send + 'static,
  T: Send + 'static,
  E: From<JoinError> + Send + 'static,
{
  let total = tasks.len();
  debug!(tasks = total, concurrency = %limit, "scheduling tasks");

  let semaphore = limit.permits().map(|n| Arc::new(Semaphore::new(n)));
  let fail_fast = policy == ErrorPolicy::FailFast;
  let (tx, mut rx) = mpsc::unbounded_channel();
  let mut handles: Vec<Option<JoinHandle<Option<Result<T, E>>>>> = Vec::with_capacity(total);

  for (index, task) in tasks.into_iter().enumerate() {
    let tx = tx.clone();
    let semaphore = semaphore.clone();

    handles.push(Some(tokio::spawn(async move {
      let _permit = match &semaphore {
        Some(semaphore) => match Arc::clone(semaphore).acquire_owned().await {
          Ok(permit) => Some(permit),
          // Closed by a failed task, the batch is over
          Err(_) => return None,
        },
        None => None,
      };

      let result = task.await;
      if fail_fast
        && result.is_err()
        && let Some(semaphore) = &semaphore
      {
        // Close before the permit is released
        semaphore.close();
      }

      // The receiver is gone when the caller bailed out early
      let _ = tx.send(index);
      Some(result)
    })));
  }
  drop(tx);

  let mut slots: Vec<Option<Result<T, E>>> = (0..total).map(|_| None).collect();

  while let Some(index) = rx.recv().await {
    let Some(handle) = handles[index].take() else {
      continue;
    };
    let Some(result) = joined(handle.await) else {
      continue;
    };

    if fail_fast && let Err(e) = result {
      debug!(task = index, "task failed, not waiting for remaining tasks");
      stop(&semaphore);
      return Err(e);
    }
    slots[index] = Some(result);
  }

  // Every sender is gone, so handles still held belong to tasks that panicked
  let mut results = Vec::with_capacity(total);
  for (slot, handle) in slots.into_iter().zip(handles) {
    let result = match (slot, handle) {
      (Some(result), _) => result,
      (None, Some(handle)) => match joined(handle.await) {
        Some(result) => result,
        None => continue,
      },
      (None, None) => continue,
    };

    if fail_fast && let Err(e) = result {
      stop(&semaphore);
      return Err(e);
    }
    results.push(result);
  }

  Ok(results)
}

/// Flatten a joined task. `None` means the task never started.
fn joined<T, E>(joined: Result<Option<Result<T, E>>, JoinError>) -> Option<Result<T, E>>
where
  E: From<JoinError>,
{
  match joined {
    Ok(result) => result,
    Err(join_error) => Some(Err(E::from(join_error))),
  }
}

/// Keep queued tasks from starting.
fn stop(semaphore: &Option<Arc<Semaphore>>) {
  if let Some(semaphore) = semaphore {
    semaphore.close();
  }
}
