//! Error types for the pyq library.
//!
//! Most failure modes of a crawl are deliberately *not* errors: an unreachable listing yields no
//! entries, an unmatched filename is routed to the unclassified queue, and a knowledge store that
//! cannot be read starts out empty. What remains here are the conditions a caller has to act on:
//!
//! - Persistence failures, which make the crawl worthless
//! - Configuration that is missing or malformed
//! - Knowledge store writes, which callers may downgrade to warnings
//! - The interactive quit command
//!
//! # Examples
//!
//! ```
//! use pyq::{error::PyqError, Config};
//!
//! let result = Config::default().validate();
//! match result {
//!   Err(PyqError::Config(message)) => println!("Fix the configuration: {message}"),
//!   Err(e) => println!("Other error: {e}"),
//!   Ok(()) => println!("Ready to crawl"),
//! }
//! ```

use thiserror::Error;

/// Error type alias used for the [`pyq`](crate) crate.
pub type Result<T> = core::result::Result<T, PyqError>;

/// Errors that can occur while crawling, classifying or persisting papers.
#[derive(Error, Debug)]
pub enum PyqError {
  /// A network request failed.
  ///
  /// The fetcher swallows these and logs them; they only surface from client construction.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// A file system operation failed.
  ///
  /// This occurs when:
  /// - Rewriting a knowledge store document fails
  /// - Writing the persisted collection or tree fails
  /// - Reading a configuration or table file fails
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// JSON encoding or decoding failed.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// A TOML configuration or pattern table could not be parsed.
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),

  /// A pattern from a table failed to compile.
  #[error(transparent)]
  Regex(#[from] regex::Error),

  /// Required configuration is missing or invalid.
  #[error("{0}")]
  Config(String),

  /// A variation was pointed at a subject key that the store does not know.
  ///
  /// Every variation must resolve to an existing subject entry.
  #[error("No subject is registered under the key \"{0}\"")]
  UnknownSubject(String),

  /// The persistence sink could not accept the crawl results.
  #[error("Persistence failed: {0}")]
  Persistence(String),

  /// The user quit the interactive resolution workflow.
  #[error("Crawl aborted by user")]
  Aborted,
}
