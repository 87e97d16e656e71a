//! Incremental output generation.
//!
//! This module provides the main entry points for turning the route table into
//! files in the public directory. It handles:
//! - Stale output cleanup (cached outputs that no route produces anymore)
//! - Hash-gated writes, skipping outputs whose content did not change
//! - Bounded parallel execution with fail-fast or best-effort error handling
//! - A watch loop that regenerates single files on route changes

pub mod lock;
pub mod materialize;
pub mod scheduler;
pub mod types;
mod watch;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::fs;
use tracing::{debug, error, info};

use crate::cache::MetadataStore;
use crate::consts::PUBLIC_CACHE_PREFIX;
use crate::deploy::{DeployError, Deployer};
use crate::route::RouteTable;

pub use lock::{LockSet, PathLock};
pub use materialize::{Materializer, cache_id};
pub use scheduler::run_tasks;
pub use types::{
  Concurrency, ErrorPolicy, FileOutcome, GenerateError, GenerateOptions, GenerateSummary, ParseConcurrencyError, Phase,
};

/// One unit of work in a build round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
  Generate(String),
  Delete(String),
}

impl Task {
  pub fn path(&self) -> &str {
    match self {
      Task::Generate(path) | Task::Delete(path) => path,
    }
  }
}

/// Told about every output that ends up matching its route.
pub trait BuildObserver: Send + Sync {
  /// `path` was written, found unchanged, or skipped as up to date.
  fn output_settled(&self, path: &str);
}

/// Drives builds for one set of options.
pub struct Generator {
  options: GenerateOptions,
  materializer: Materializer,
  deployer: Option<Arc<dyn Deployer>>,
  observer: Option<Arc<dyn BuildObserver>>,
  start: Mutex<Instant>,
  phase: Mutex<Phase>,
}

impl Generator {
  pub fn new(
    public_dir: impl Into<PathBuf>,
    routes: Arc<dyn RouteTable>,
    cache: Arc<dyn MetadataStore>,
    options: GenerateOptions,
  ) -> Self {
    let materializer = Materializer::new(public_dir, routes, cache, options.bail);
    Self {
      options,
      materializer,
      deployer: None,
      observer: None,
      start: Mutex::new(Instant::now()),
      phase: Mutex::new(Phase::Idle),
    }
  }

  pub fn with_deployer(mut self, deployer: Arc<dyn Deployer>) -> Self {
    self.deployer = Some(deployer);
    self
  }

  pub fn with_observer(mut self, observer: Arc<dyn BuildObserver>) -> Self {
    self.observer = Some(observer);
    self
  }

  pub fn options(&self) -> &GenerateOptions {
    &self.options
  }

  pub fn materializer(&self) -> &Materializer {
    &self.materializer
  }

  pub fn phase(&self) -> Phase {
    *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn set_phase(&self, phase: Phase) {
    debug!(phase = ?phase, "generator phase");
    *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
  }

  /// Restart the build timer and return the time since it last started.
  fn restart_timer(&self) -> std::time::Duration {
    let mut start = self.start.lock().unwrap_or_else(PoisonError::into_inner);
    let elapsed = start.elapsed();
    *start = Instant::now();
    elapsed
  }

  /// Run one build, then either watch for changes or deploy.
  ///
  /// In watch mode this only returns once the route table stops sending
  /// events.
  pub async fn run(self: &Arc<Self>) -> Result<GenerateSummary, GenerateError> {
    let summary = self.first_generate().await?;

    if self.options.watch {
      let events = self.materializer.routes().subscribe();
      self.watch(events).await;
      self.set_phase(Phase::Idle);
      return Ok(summary);
    }

    if self.options.deploy {
      self.deploy().await?;
    }

    Ok(summary)
  }

  /// Hand off to the configured deployer.
  pub async fn deploy(&self) -> Result<(), GenerateError> {
    let deployer = self.deployer.as_ref().ok_or(DeployError::NotConfigured)?;
    deployer.deploy(&self.options).await?;
    Ok(())
  }

  /// Generate every route and delete stale outputs.
  pub async fn first_generate(self: &Arc<Self>) -> Result<GenerateSummary, GenerateError> {
    info!("Files loaded in {:.2?}", self.restart_timer());

    self.set_phase(Phase::Preparing);
    if let Err(e) = self.prepare_public_dir().await {
      self.set_phase(Phase::Idle);
      return Err(e);
    }

    let tasks = self.plan_tasks();
    let paths: Vec<String> = tasks.iter().map(|task| task.path().to_string()).collect();

    self.set_phase(Phase::Running);
    let futures: Vec<_> = tasks
      .into_iter()
      .map(|task| {
        let generator = Arc::clone(self);
        async move { generator.run_task(task).await }
      })
      .collect();

    let results = match run_tasks(futures, self.options.concurrency, ErrorPolicy::from_bail(self.options.bail)).await {
      Ok(results) => results,
      Err(e) => {
        error!(error = %e, "generation aborted");
        // Keep hashes of whatever was written before the failure
        if let Err(flush_error) = self.materializer.cache().flush() {
          error!(error = %flush_error, "failed to save cache");
        }
        self.set_phase(Phase::Idle);
        return Err(e);
      }
    };

    self.set_phase(Phase::Reporting);
    let mut summary = GenerateSummary::default();
    for (path, result) in paths.into_iter().zip(results) {
      match result {
        Ok(outcome) => summary.record(path, outcome),
        Err(e) => {
          error!(path = %path, error = %e, "failed to generate");
          summary.failed.push((path, e));
        }
      }
    }

    self.materializer.cache().flush()?;

    summary.elapsed = self.restart_timer();
    info!("{} files generated in {:.2?}", summary.generated(), summary.elapsed);
    debug!(
      unchanged = summary.unchanged,
      skipped = summary.skipped,
      deleted = summary.deleted.len(),
      failed = summary.failed.len(),
      "generation complete"
    );

    self.set_phase(Phase::Idle);
    Ok(summary)
  }

  /// Make sure the public directory exists and is a directory.
  async fn prepare_public_dir(&self) -> Result<(), GenerateError> {
    let public_dir = self.materializer.public_dir();

    match fs::metadata(public_dir).await {
      Ok(meta) if meta.is_dir() => Ok(()),
      Ok(_) => Err(GenerateError::NotADirectory(public_dir.to_path_buf())),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!(path = %public_dir.display(), "creating public directory");
        fs::create_dir_all(public_dir)
          .await
          .map_err(|source| GenerateError::PublicDir {
            path: public_dir.to_path_buf(),
            source,
          })
      }
      Err(source) => Err(GenerateError::PublicDir {
        path: public_dir.to_path_buf(),
        source,
      }),
    }
  }

  /// Deletions for stale cached outputs followed by one generation per route.
  pub fn plan_tasks(&self) -> Vec<Task> {
    let route_list = self.materializer.routes().list();
    let live: HashSet<&str> = route_list.iter().map(String::as_str).collect();

    let stale: Vec<String> = self
      .materializer
      .cache()
      .filter(&|record| record.id.starts_with(PUBLIC_CACHE_PREFIX))
      .into_iter()
      .filter_map(|record| record.id.strip_prefix(PUBLIC_CACHE_PREFIX).map(str::to_string))
      .filter(|path| !live.contains(path.as_str()))
      .collect();

    debug!(routes = route_list.len(), stale = stale.len(), "planned tasks");

    stale
      .into_iter()
      .map(Task::Delete)
      .chain(route_list.iter().cloned().map(Task::Generate))
      .collect()
  }

  async fn run_task(&self, task: Task) -> Result<FileOutcome, GenerateError> {
    match task {
      Task::Generate(path) => self.generate_file(&path).await,
      Task::Delete(path) => self.delete_file(&path).await,
    }
  }

  /// Decide whether `path` needs writing and write it if so.
  ///
  /// Without `force`, a missing output is always written, an existing output
  /// is only re-hashed when its route reports a modified source, and is
  /// skipped otherwise. The observer hears about the path unless it failed
  /// or was busy.
  pub async fn generate_file(&self, path: &str) -> Result<FileOutcome, GenerateError> {
    let outcome = self.build_file(path).await?;

    if outcome != FileOutcome::Busy
      && let Some(observer) = &self.observer
    {
      observer.output_settled(path);
    }
    Ok(outcome)
  }

  async fn build_file(&self, path: &str) -> Result<FileOutcome, GenerateError> {
    let Some(_lock) = self.materializer.locks().try_acquire(path) else {
      debug!(path = %path, "already in flight, skipping");
      return Ok(FileOutcome::Busy);
    };

    if self.options.force {
      return self.materializer.write_file(path, true).await;
    }

    let dest = self.materializer.dest(path);
    if !fs::try_exists(&dest).await.unwrap_or(false) {
      return self.materializer.write_file(path, true).await;
    }

    if self.materializer.routes().is_modified(path) {
      return self.materializer.write_file(path, false).await;
    }

    debug!(path = %path, "output exists and source unmodified");
    Ok(FileOutcome::Skipped)
  }

  /// Delete the output for `path`.
  pub async fn delete_file(&self, path: &str) -> Result<FileOutcome, GenerateError> {
    self.materializer.remove(path).await
  }
}
