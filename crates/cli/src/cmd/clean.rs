use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};

use sitegen_lib::clean::clean;
use sitegen_lib::config::SiteConfig;

use crate::output::{
  OutputFormat, format_elapsed, format_size, print_done, print_json, print_note, print_row,
};

pub fn cmd_clean(root: &Path, dry_run: bool, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let config = SiteConfig::load(root).context("Failed to load site config")?;
  let result = clean(&config, dry_run).context("Clean failed")?;

  if output.is_json() {
    print_json(&result)?;
  } else {
    println!();
    if dry_run {
      print_note("Dry run - no changes made");
    } else if result.stats.nothing_to_do() {
      print_note("Nothing to clean");
    } else {
      print_done("Clean complete!");
    }
    for path in &result.deleted_paths {
      print_row("Removed", &path.display().to_string());
    }
    print_row("Files removed", &result.stats.files_deleted.to_string());
    print_row("Space freed", &format_size(result.stats.bytes_freed));
    print_row("Duration", &format_elapsed(start.elapsed()));
  }

  Ok(())
}
