//! Logging setup.
//!
//! Human-facing output goes to stdout; log records go to stderr and, with `--debug`, to a log
//! file as well.

use std::path::Path;

use chrono::Utc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::*;

/// Installs the global subscriber.
///
/// The verbosity levels are:
/// - 0: info (default)
/// - 1: debug
/// - 2+: trace
///
/// `RUST_LOG` takes precedence when set. When `log_dir` is given a log file named after the
/// current time is created there; the returned guard flushes it and must be held until exit.
pub fn setup(verbosity: u8, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
  // The binary is also named `pyq`, so one directive covers the library and the CLI.
  let filter = match verbosity {
    0 => "warn,pyq=info",
    1 => "warn,pyq=debug",
    _ => "info,pyq=trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  let terminal = fmt::layer().with_writer(std::io::stderr).with_target(verbosity > 0);

  let (file, guard) = match log_dir {
    Some(dir) => {
      std::fs::create_dir_all(dir)?;
      let name = format!("pyq-{}.log", Utc::now().format("%Y%m%d-%H%M%S"));
      let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
      let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true);
      (Some(layer), Some(guard))
    },
    None => (None, None),
  };

  tracing_subscriber::registry().with(filter).with(terminal).with(file).init();
  if let Some(dir) = log_dir {
    trace!("Logging to {}", dir.display());
  }
  Ok(guard)
}
