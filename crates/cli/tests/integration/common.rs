//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Isolated site root.
///
/// Each test gets its own temporary directory holding the config, the source
/// tree, the public directory and the cache database.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Create an empty site.
  pub fn empty() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Create a site with the given source files.
  pub fn with_sources(files: &[(&str, &str)]) -> Self {
    let env = Self::empty();
    for (path, content) in files {
      env.write_source(path, content);
    }
    env
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  /// Write a file relative to the site root.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.root().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn write_source(&self, relative_path: &str, content: &str) {
    self.write_file(&format!("source/{}", relative_path), content);
  }

  pub fn write_config(&self, content: &str) {
    self.write_file("_config.toml", content);
  }

  pub fn public_path(&self, relative_path: &str) -> PathBuf {
    self.root().join("public").join(relative_path)
  }

  /// Content of a generated file, `None` when it does not exist.
  pub fn read_public(&self, relative_path: &str) -> Option<String> {
    std::fs::read_to_string(self.public_path(relative_path)).ok()
  }

  /// Get a pre-configured Command for the sitegen binary rooted at this site.
  pub fn sitegen_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("sitegen");
    cmd.arg("--root").arg(self.root());
    cmd.env_remove("RUST_LOG");
    cmd
  }
}
