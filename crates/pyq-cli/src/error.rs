//! Error types for the pyq CLI.
//!
//! Wraps library errors together with the terminal and file system errors raised by the CLI
//! itself.

use dialoguer::Error as DialoguerError;
use thiserror::Error;

use super::*;

/// Errors that can occur while running the pyq CLI.
#[derive(Error, Debug)]
pub enum PyqCliError {
  /// Errors from the core library: configuration, persistence and an interactive quit
  #[error(transparent)]
  Pyq(#[from] PyqError),

  /// Errors from terminal prompts
  #[error(transparent)]
  Dialoguer(#[from] DialoguerError),

  /// Errors from file system operations
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

/// Type alias for Result with [`PyqCliError`] as the error type.
pub type Result<T> = core::result::Result<T, PyqCliError>;
