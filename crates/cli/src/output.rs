//! Terminal and JSON output for `generate`, `clean` and `list`.
//!
//! Text output is one status line followed by aligned `label: value` rows.
//! Colors are only applied when the stream supports them.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

const DONE: &str = "✓";
const FAILED: &str = "✗";
const NOTE: &str = "•";
const MODIFIED: &str = "~";

/// Fits the longest row label, "Files removed:".
const LABEL_WIDTH: usize = 14;

/// Size of the files a clean removed.
pub fn format_size(bytes: u64) -> String {
  const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

  let mut value = bytes as f64;
  let mut unit = 0;
  while value >= 1024.0 && unit < UNITS.len() - 1 {
    value /= 1024.0;
    unit += 1;
  }

  if unit == 0 {
    format!("{} B", bytes)
  } else {
    format!("{:.1} {}", value, UNITS[unit])
  }
}

/// Build and clean timings, in the same form the engine logs them.
pub fn format_elapsed(elapsed: Duration) -> String {
  format!("{:.2?}", elapsed)
}

pub fn print_done(message: &str) {
  println!("{} {}", DONE.if_supports_color(Stream::Stdout, |s| s.green()), message);
}

pub fn print_failure(message: &str) {
  eprintln!(
    "{} {}",
    FAILED.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_note(message: &str) {
  println!("{} {}", NOTE.if_supports_color(Stream::Stdout, |s| s.blue()), message);
}

pub fn print_row(label: &str, value: &str) {
  let label = format!("{:<width$}", format!("{}:", label), width = LABEL_WIDTH);
  println!("  {} {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

/// One route line; routes with unbuilt source changes are flagged.
pub fn print_route(path: &str, modified: bool) {
  if modified {
    println!("  {} {}", MODIFIED.if_supports_color(Stream::Stdout, |s| s.yellow()), path);
  } else {
    println!("    {}", path);
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
