//! Command line crawler and subject resolver for the `pyq` library.
//!
//! The CLI walks a directory listing server, classifies every PDF it finds and writes the flat
//! collection and the aggregated tree as JSON. Files whose subject cannot be matched are queued
//! for later, or resolved on the spot with `--interactive`.
//!
//! # Usage
//!
//! ```bash
//! # Crawl everything below the configured root and save the results
//! pyq --base-url http://papers.example.edu/
//!
//! # Crawl a small subtree without saving anything
//! pyq --test --test-dir /FE/2016/
//!
//! # Same, but save the results and keep a log file
//! pyq --test --debug
//!
//! # Resolve unmatched files as they are found
//! pyq --interactive
//!
//! # Only enumerate the remote tree
//! pyq --list-only
//!
//! # Work through the unclassified queue without crawling
//! pyq resolve
//! ```
//!
//! Configuration is read from the platform config directory (`pyq/config.toml`) unless
//! `--config` points elsewhere; `--base-url`, `--data-dir` and `--output` override the file.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::path::PathBuf;

use clap::{builder::ArgAction, Parser, Subcommand};
use pyq::{prelude::*, Config};
use tracing::{debug, trace};

pub mod commands;
pub mod error;
pub mod interaction;
pub mod logging;

use crate::{commands::*, error::*, interaction::*};

/// Command line interface configuration and argument parsing
#[derive(Parser)]
#[command(author, version, about = "Crawl a directory listing server of exam papers and classify them")]
pub struct Cli {
  /// Crawl only the test subtree, and skip saving unless --debug is also given
  #[arg(short, long, global = true)]
  test: bool,

  /// Write a log file and allow saving results in test mode
  #[arg(short, long, global = true)]
  debug: bool,

  /// Verbose mode (-v, -vv) for per-decision logging
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Subtree crawled in test mode, overriding the configured one
  #[arg(long, global = true)]
  test_dir: Option<String>,

  /// Ask for a decision on every file whose subject cannot be matched
  #[arg(short, long, global = true)]
  interactive: bool,

  /// Enumerate the remote tree without classifying or saving anything
  #[arg(short, long)]
  list_only: bool,

  /// Configuration file to read instead of the default one
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Root URL of the listing server
  #[arg(long, global = true)]
  base_url: Option<String>,

  /// Directory holding the knowledge store
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Directory the results are written to
  #[arg(long, global = true)]
  output: Option<PathBuf>,

  /// The subcommand to execute; crawls when omitted
  #[command(subcommand)]
  command: Option<Commands>,

  /// Skip all prompts and accept defaults (mostly for testing)
  #[arg(long, hide = true, global = true)]
  accept_defaults: bool,
}

impl Cli {
  /// Loads the configuration file and applies the command line overrides.
  fn config(&self) -> Result<Config> {
    let path = self.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&path)?;
    trace!("Configuration from {}: {config:?}", path.display());

    if let Some(base_url) = &self.base_url {
      config = config.with_base_url(base_url);
    }
    if let Some(data_dir) = &self.data_dir {
      let output = config.output_dir.strip_prefix(&config.data_dir).ok().map(|rest| data_dir.join(rest));
      let logs = config.log_dir.strip_prefix(&config.data_dir).ok().map(|rest| data_dir.join(rest));
      config = config.with_data_dir(data_dir);
      if let Some(output) = output {
        config = config.with_output_dir(&output);
      }
      if let Some(logs) = logs {
        config.log_dir = logs;
      }
    }
    if let Some(output) = &self.output {
      config = config.with_output_dir(output);
    }
    if let Some(test_dir) = &self.test_dir {
      config = config.with_test_dir(test_dir);
    }
    Ok(config)
  }

  /// Where a crawl starts: the test subtree in test mode, the root otherwise.
  ///
  /// Warns when test mode has no subtree to restrict the crawl to.
  fn start<'a>(&self, config: &'a Config) -> &'a str {
    if !self.test {
      return &config.root_path;
    }
    if !config.has_test_subtree() {
      reply(ResponseContent::Warning(&format!(
        "No test subtree configured, so --test crawls everything below {}. Set test_dir or pass \
         --test-dir.",
        config.root_path
      )));
    }
    &config.test_dir
  }

  /// Results are saved on full runs, and on test runs only with `--debug`.
  fn persists(&self) -> bool { !self.test || self.debug }
}

/// Entry point for the pyq CLI application
///
/// # Errors
///
/// Exits non-zero when the configuration is unusable, the results cannot be saved, or the user
/// quits the interactive workflow. Network failures and unmatched files are not errors.
#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let config = cli.config()?;
  let _guard = logging::setup(cli.verbose, cli.debug.then_some(config.log_dir.as_path()))?;
  debug!("Using data directory {}", config.data_dir.display());

  match cli.command.clone().unwrap_or(Commands::Crawl) {
    Commands::Crawl if cli.list_only => list(&cli, &config).await,
    Commands::Crawl => crawl(&cli, &config).await,
    Commands::Resolve => resolve(&cli, &config),
  }
}
