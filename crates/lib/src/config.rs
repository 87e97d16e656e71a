//! Site configuration.
//!
//! Loaded from `_config.toml` in the site root. Every key is optional; a
//! missing file yields the defaults.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::CONFIG_FILENAME;
use crate::generate::{Concurrency, GenerateOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid config value for {key}: {message}")]
  Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
  pub concurrency: Concurrency,
  pub bail: bool,
  pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
  /// How often the source directory is rescanned in watch mode.
  pub interval_ms: u64,
}

impl Default for WatchConfig {
  fn default() -> Self {
    Self { interval_ms: 500 }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
  /// Shell command run from the site root after a build.
  pub command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
  /// Site root every relative path is resolved against.
  #[serde(skip)]
  pub root: PathBuf,
  pub source_dir: PathBuf,
  pub public_dir: PathBuf,
  pub db_path: PathBuf,
  pub generate: GenerateConfig,
  pub watch: WatchConfig,
  pub deploy: DeployConfig,
}

impl Default for SiteConfig {
  fn default() -> Self {
    Self {
      root: PathBuf::from("."),
      source_dir: PathBuf::from("source"),
      public_dir: PathBuf::from("public"),
      db_path: PathBuf::from("db.json"),
      generate: GenerateConfig::default(),
      watch: WatchConfig::default(),
      deploy: DeployConfig::default(),
    }
  }
}

impl SiteConfig {
  /// Load `<root>/_config.toml`, falling back to defaults when it is absent.
  pub fn load(root: &Path) -> Result<Self, ConfigError> {
    let path = root.join(CONFIG_FILENAME);

    let content = match std::fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Self {
          root: root.to_path_buf(),
          ..Self::default()
        });
      }
      Err(source) => return Err(ConfigError::Read { path, source }),
    };

    Self::parse(root, &content).map_err(|e| match e {
      ConfigError::Parse { source, .. } => ConfigError::Parse { path, source },
      other => other,
    })
  }

  /// Parse config text for a site rooted at `root`.
  pub fn parse(root: &Path, content: &str) -> Result<Self, ConfigError> {
    let mut config: SiteConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
      path: PathBuf::from(CONFIG_FILENAME),
      source,
    })?;
    config.root = root.to_path_buf();
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if self.watch.interval_ms == 0 {
      return Err(ConfigError::Invalid {
        key: "watch.interval_ms",
        message: "must be greater than zero".to_string(),
      });
    }
    if self.deploy.command.as_deref().is_some_and(|c| c.trim().is_empty()) {
      return Err(ConfigError::Invalid {
        key: "deploy.command",
        message: "must not be empty".to_string(),
      });
    }
    Ok(())
  }

  pub fn source_path(&self) -> PathBuf {
    self.root.join(&self.source_dir)
  }

  pub fn public_path(&self) -> PathBuf {
    self.root.join(&self.public_dir)
  }

  pub fn db_file(&self) -> PathBuf {
    self.root.join(&self.db_path)
  }

  pub fn watch_interval(&self) -> Duration {
    Duration::from_millis(self.watch.interval_ms)
  }

  /// Generation options from the `[generate]` table. Callers layer command
  /// line flags on top.
  pub fn generate_options(&self) -> GenerateOptions {
    GenerateOptions {
      force: self.generate.force,
      bail: self.generate.bail,
      concurrency: self.generate.concurrency,
      ..GenerateOptions::default()
    }
  }
}
