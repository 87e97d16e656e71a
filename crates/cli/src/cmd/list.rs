//! Implementation of the `sitegen list` command.
//!
//! Scans the source directory and prints the resulting route table without
//! generating anything. Routes whose source hash is new or changed since the
//! last build are flagged as modified.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use sitegen_lib::cache::CacheStore;
use sitegen_lib::config::SiteConfig;
use sitegen_lib::route::{RouteTable, Router};
use sitegen_lib::source::SourceScanner;

use crate::output::{OutputFormat, print_json, print_note, print_route, print_row};

pub fn cmd_list(root: &Path, verbose: bool, output: OutputFormat) -> Result<()> {
  let config = SiteConfig::load(root).context("Failed to load site config")?;

  // Scanning never writes source hashes and the cache is not flushed, so
  // listing leaves the next build's view of modified routes alone
  let cache = Arc::new(CacheStore::open(config.db_file()).context("Failed to open cache database")?);

  let router = Arc::new(Router::new());
  let scanner = SourceScanner::new(config.source_path(), router.clone(), cache);
  let stats = scanner.scan().context("Failed to scan source directory")?;

  let routes: Vec<(String, bool)> = router
    .list()
    .into_iter()
    .map(|path| {
      let modified = router.is_modified(&path);
      (path, modified)
    })
    .collect();

  if output.is_json() {
    let items: Vec<_> = routes
      .iter()
      .map(|(path, modified)| serde_json::json!({ "path": path, "modified": modified }))
      .collect();
    print_json(&serde_json::json!({ "count": routes.len(), "routes": items }))?;
    return Ok(());
  }

  if routes.is_empty() {
    print_note(&format!("No routes found in {}", config.source_path().display()));
    return Ok(());
  }

  print_note(&format!("{} routes", routes.len()));
  for (path, modified) in &routes {
    print_route(path, *modified);
  }

  if verbose {
    println!();
    print_row("Source", &config.source_path().display().to_string());
    print_row("Modified", &routes.iter().filter(|(_, modified)| *modified).count().to_string());
    print_row("Files scanned", &stats.scanned.to_string());
  }

  Ok(())
}
