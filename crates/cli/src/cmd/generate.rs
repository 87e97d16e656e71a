//! Implementation of the `sitegen generate` command.
//!
//! Scans the source directory into a route table and builds the public
//! directory from it. In watch mode the source directory is rescanned on an
//! interval and changed routes are regenerated until Ctrl+C.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{info, warn};

use sitegen_lib::cache::{CacheStore, MetadataStore};
use sitegen_lib::config::SiteConfig;
use sitegen_lib::consts::CONFIG_FILENAME;
use sitegen_lib::deploy::CommandDeployer;
use sitegen_lib::generate::{Concurrency, GenerateError, GenerateOptions, GenerateSummary, Generator};
use sitegen_lib::route::{RouteTable, Router};
use sitegen_lib::source::SourceScanner;

use crate::output::{OutputFormat, format_elapsed, print_done, print_failure, print_json, print_row};

/// Command line overrides for the `[generate]` config table.
#[derive(Debug, Default)]
pub struct GenerateArgs {
  pub force: bool,
  pub bail: bool,
  pub concurrency: Option<Concurrency>,
  pub watch: bool,
  pub deploy: bool,
}

impl GenerateArgs {
  fn apply_to(&self, mut options: GenerateOptions) -> GenerateOptions {
    options.force |= self.force;
    options.bail |= self.bail;
    if let Some(concurrency) = self.concurrency {
      options.concurrency = concurrency;
    }
    options.watch = self.watch;
    options.deploy = self.deploy;
    options
  }
}

pub fn cmd_generate(root: &Path, args: GenerateArgs, output: OutputFormat) -> Result<()> {
  let config = SiteConfig::load(root).context("Failed to load site config")?;
  let options = args.apply_to(config.generate_options());

  if options.deploy && config.deploy.command.is_none() {
    bail!("--deploy needs a [deploy] command in {}", CONFIG_FILENAME);
  }

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(generate(config, options, output))
}

async fn generate(config: SiteConfig, options: GenerateOptions, output: OutputFormat) -> Result<()> {
  let cache = Arc::new(CacheStore::open(config.db_file()).context("Failed to open cache database")?);
  let router = Arc::new(Router::new());
  let scanner = Arc::new(SourceScanner::new(
    config.source_path(),
    router.clone(),
    cache.clone(),
  ));

  scanner.scan().context("Failed to scan source directory")?;

  let mut generator = Generator::new(config.public_path(), router.clone(), cache.clone(), options.clone())
    .with_observer(scanner.clone());
  if let Some(command) = &config.deploy.command {
    generator = generator.with_deployer(Arc::new(CommandDeployer::new(
      command.as_str(),
      &config.root,
      config.public_path(),
    )));
  }
  let generator = Arc::new(generator);

  if !options.watch {
    let summary = generator.run().await.map_err(build_error)?;
    report(&summary, output)?;
    if !summary.is_success() {
      bail!("{} file(s) failed to generate", summary.failed.len());
    }
    return Ok(());
  }

  let summary = generator.first_generate().await.map_err(build_error)?;
  report(&summary, output)?;

  let events = router.subscribe();
  let rescan = tokio::spawn(rescan_loop(scanner, config.watch_interval()));

  tokio::select! {
    _ = generator.watch(events) => {}
    signal = tokio::signal::ctrl_c() => {
      signal.context("Failed to listen for Ctrl+C")?;
      info!("stopping watch");
    }
  }

  rescan.abort();
  cache.flush().context("Failed to save cache database")?;
  Ok(())
}

/// A misconfigured public directory is reported on its own.
fn build_error(e: GenerateError) -> anyhow::Error {
  if e.is_fatal() {
    anyhow!(e)
  } else {
    anyhow!(e).context("Generate failed")
  }
}

/// Rescan the source directory forever, feeding changes to the router.
async fn rescan_loop(scanner: Arc<SourceScanner>, interval: Duration) {
  let mut ticker = tokio::time::interval(interval);
  ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
  // The first tick completes immediately and the initial scan already ran
  ticker.tick().await;

  loop {
    ticker.tick().await;
    let scanner = scanner.clone();
    match tokio::task::spawn_blocking(move || scanner.scan()).await {
      Ok(Ok(_)) => {}
      Ok(Err(e)) => warn!(error = %e, "source rescan failed"),
      Err(e) => warn!(error = %e, "source rescan task failed"),
    }
  }
}

fn report(summary: &GenerateSummary, output: OutputFormat) -> Result<()> {
  if output.is_json() {
    let failed: Vec<_> = summary
      .failed
      .iter()
      .map(|(path, err)| serde_json::json!({ "path": path, "error": err.to_string() }))
      .collect();
    let json_output = serde_json::json!({
      "written": summary.written,
      "unchanged": summary.unchanged,
      "skipped": summary.skipped,
      "deleted": summary.deleted,
      "busy": summary.busy,
      "failed": failed,
      "elapsed_ms": summary.elapsed.as_millis() as u64,
    });
    return print_json(&json_output);
  }

  println!();
  if summary.is_success() {
    print_done(&format!("{} files generated", summary.generated()));
  } else {
    for (path, err) in &summary.failed {
      print_failure(&format!("{}: {}", path, err));
    }
  }
  print_row("Written", &summary.generated().to_string());
  print_row("Unchanged", &summary.unchanged.to_string());
  print_row("Skipped", &summary.skipped.to_string());
  print_row("Deleted", &summary.deleted.len().to_string());
  if !summary.failed.is_empty() {
    print_row("Failed", &summary.failed.len().to_string());
  }
  print_row("Duration", &format_elapsed(summary.elapsed));

  Ok(())
}
