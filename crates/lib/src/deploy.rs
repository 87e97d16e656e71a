//! Deployment after a successful build.
//!
//! The build engine treats deployment as an opaque step: it hands the
//! generation options to a [`Deployer`] and reports whatever error comes
//! back.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::generate::GenerateOptions;

pub type DeployFuture<'a> = Pin<Box<dyn Future<Output = Result<(), DeployError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum DeployError {
  #[error("no deploy command configured")]
  NotConfigured,

  #[error("failed to run deploy command {command:?}: {source}")]
  Spawn {
    command: String,
    #[source]
    source: io::Error,
  },

  #[error("deploy command {command:?} failed with exit code {code:?}")]
  Failed { command: String, code: Option<i32> },
}

pub trait Deployer: Send + Sync {
  fn deploy<'a>(&'a self, options: &'a GenerateOptions) -> DeployFuture<'a>;
}

/// Deploys by running a shell command from the site root.
///
/// The command sees `SITEGEN_PUBLIC_DIR` pointing at the generated files.
#[derive(Debug, Clone)]
pub struct CommandDeployer {
  command: String,
  cwd: PathBuf,
  public_dir: PathBuf,
}

impl CommandDeployer {
  pub fn new(command: impl Into<String>, cwd: impl Into<PathBuf>, public_dir: impl Into<PathBuf>) -> Self {
    Self {
      command: command.into(),
      cwd: cwd.into(),
      public_dir: public_dir.into(),
    }
  }

  pub fn command(&self) -> &str {
    &self.command
  }

  async fn run(&self, options: &GenerateOptions) -> Result<(), DeployError> {
    info!(command = %self.command, force = options.force, "deploying");

    let (shell, shell_args) = shell();
    let output = Command::new(shell)
      .args(shell_args)
      .arg(&self.command)
      .current_dir(&self.cwd)
      .env("SITEGEN_PUBLIC_DIR", &self.public_dir)
      .output()
      .await
      .map_err(|source| DeployError::Spawn {
        command: self.command.clone(),
        source,
      })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
      debug!(stdout = %stdout.trim(), "deploy output");
    }

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if !stderr.trim().is_empty() {
        debug!(stderr = %stderr.trim(), "deploy stderr");
      }
      return Err(DeployError::Failed {
        command: self.command.clone(),
        code: output.status.code(),
      });
    }

    info!("Deploy done");
    Ok(())
  }
}

impl Deployer for CommandDeployer {
  fn deploy<'a>(&'a self, options: &'a GenerateOptions) -> DeployFuture<'a> {
    Box::pin(self.run(options))
  }
}

#[cfg(unix)]
fn shell() -> (&'static str, &'static [&'static str]) {
  ("/bin/sh", &["-c"])
}

#[cfg(windows)]
fn shell() -> (&'static str, &'static [&'static str]) {
  ("cmd.exe", &["/C"])
}
