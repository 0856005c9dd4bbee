//! Exam paper discovery and classification over plain HTTP directory listings.
//!
//! `pyq` walks an Apache-style autoindex server, infers structured metadata for every PDF it
//! finds from unreliable filenames and path fragments, and builds two synchronized views of the
//! result:
//!
//! - a flat [`PaperCollection`](collection::PaperCollection) with deduplicated facet arrays, and
//! - a hierarchical [`DirectoryTree`](tree::DirectoryTree) whose every node aggregates the stats
//!   and facets of its subtree.
//!
//! # Features
//!
//! - **Tolerant fetching**: anchors are scraped permissively and URL encoding quirks are retried
//!   with fallbacks, so a single odd listing never aborts a crawl.
//! - **Table-driven extraction**: year, branch, semester and exam type are inferred by ordered
//!   rule lists loaded from TOML pattern tables.
//! - **Learning classifier**: subjects are matched against a persisted dictionary of variations
//!   which grows every time a human resolves an unknown file.
//! - **Serializable tree**: parent links live only inside the build arena and are stripped by
//!   [`DirectoryTree::clean`](tree::DirectoryTree::clean).
//!
//! # Getting Started
//!
//! ```no_run
//! use pyq::{
//!   classifier::Classifier, crawl::Crawler, extract::Extractor, fetcher::Fetcher,
//!   knowledge::KnowledgeStore, persist::JsonSink, prelude::*, Config,
//! };
//!
//! # async fn example() -> Result<(), PyqError> {
//! let config = Config::default().with_base_url("http://papers.example.edu/");
//! let fetcher = Fetcher::new(&config)?;
//! let store = KnowledgeStore::load(&config.data_dir);
//! let extractor = Extractor::from_config(&config)?;
//! let classifier = Classifier::from_config(&config)?;
//!
//! let mut crawler = Crawler::new(fetcher, extractor, classifier, store);
//! let report = crawler.crawl(&config.root_path).await?;
//! println!("{} papers in {} directories", report.files, report.directories);
//!
//! let (collection, tree) = crawler.finish();
//! JsonSink::new(&config.output_dir).save(&collection, &tree).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`fetcher`]: HTTP listing retrieval and anchor parsing
//! - [`extract`]: year, branch, semester and exam type heuristics
//! - [`classifier`]: subject matching and the interactive resolution state machine
//! - [`knowledge`]: the persisted subject dictionaries
//! - [`tree`]: the aggregated directory tree
//! - [`crawl`]: recursive traversal tying everything together
//! - [`persist`]: the replace-all persistence contract

#![warn(missing_docs)]

use std::{
  collections::{BTreeMap, BTreeSet, HashSet},
  path::{Path, PathBuf},
  str::FromStr,
  time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};
#[cfg(test)]
use {tempfile::tempdir, tracing_test::traced_test};

pub mod classifier;
pub mod collection;
pub mod config;
pub mod crawl;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod knowledge;
pub mod paper;
pub mod persist;
pub mod tree;

pub use config::Config;

use crate::{error::*, paper::*};

/// Common traits and types for ergonomic imports.
///
/// ```no_run
/// use pyq::prelude::*;
///
/// fn example() -> Result<(), PyqError> { Ok(()) }
/// ```
pub mod prelude {
  pub use crate::{
    classifier::Prompt, error::PyqError, fetcher::Listing, paper::UNKNOWN, persist::Sink,
  };
}
