use super::*;

pub mod crawl;
pub mod list;
pub mod resolve;

pub use crawl::crawl;
pub use list::list;
pub use resolve::resolve;

/// Available commands for the CLI
#[derive(Subcommand, Clone)]
pub enum Commands {
  /// Crawl the listing server and save papers and tree (default when no command specified)
  Crawl,

  /// Work through the files queued as unclassified by earlier crawls
  Resolve,
}
