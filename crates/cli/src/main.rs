mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sitegen_lib::generate::Concurrency;
use tracing_subscriber::EnvFilter;

use crate::cmd::{GenerateArgs, cmd_clean, cmd_generate, cmd_list};
use crate::output::{OutputFormat, print_failure};

/// sitegen - incremental static site generator
#[derive(Parser)]
#[command(name = "sitegen")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Site root containing _config.toml
  #[arg(long, global = true, default_value = ".")]
  root: PathBuf,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Generate the public directory from the source directory
  #[command(visible_alias = "g")]
  Generate {
    /// Rewrite every output, ignoring cached hashes
    #[arg(short, long)]
    force: bool,

    /// Stop at the first error instead of writing partial content
    #[arg(short, long)]
    bail: bool,

    /// Maximum files processed at once (a number or "unbounded")
    #[arg(short, long)]
    concurrency: Option<Concurrency>,

    /// Keep running and regenerate files as sources change
    #[arg(short, long, conflicts_with = "deploy")]
    watch: bool,

    /// Run the configured deploy command after generating
    #[arg(short, long)]
    deploy: bool,
  },

  /// Remove the cache database and the public directory
  Clean {
    /// Show what would be removed without deleting anything
    #[arg(long)]
    dry_run: bool,
  },

  /// List the routes found in the source directory
  List,
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let result = match cli.command {
    Commands::Generate {
      force,
      bail,
      concurrency,
      watch,
      deploy,
    } => cmd_generate(
      &cli.root,
      GenerateArgs {
        force,
        bail,
        concurrency,
        watch,
        deploy,
      },
      cli.output,
    ),
    Commands::Clean { dry_run } => cmd_clean(&cli.root, dry_run, cli.output),
    Commands::List => cmd_list(&cli.root, cli.verbose, cli.output),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_failure(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
