//! Module for the crawl, the default command.

use pyq::{
  classifier::{Classifier, Policy},
  crawl::Crawler,
  extract::Extractor,
  fetcher::Fetcher,
  knowledge::KnowledgeStore,
  persist::JsonSink,
};

use super::*;

/// Function for the [`Commands::Crawl`] in the CLI.
///
/// Whatever was accumulated is saved even when the user quits the interactive workflow; the quit
/// is then returned as [`PyqError::Aborted`] so the process exits non-zero.
pub async fn crawl(cli: &Cli, config: &Config) -> Result<()> {
  let fetcher = Fetcher::new(config)?;
  let extractor = Extractor::from_config(config)?;
  let classifier = Classifier::from_config(config)?;
  let store = KnowledgeStore::load(&config.data_dir);

  let policy = if cli.interactive && !cli.accept_defaults {
    Policy::Interactive(Box::new(TerminalPrompt))
  } else {
    Policy::Queue
  };
  debug!("Unmatched files: {policy:?}");

  let start = cli.start(config);
  reply(ResponseContent::Info(&format!("Crawling {start} on {}", fetcher.base_url())));
  let mut crawler = Crawler::new(fetcher, extractor, classifier, store).with_policy(policy);
  let report = crawler.crawl(start).await?;
  reply(ResponseContent::Report(&report));
  if report.aborted {
    crawler.store().flush()?;
  }

  let (collection, tree) = crawler.finish();
  if cli.persists() {
    let sink = JsonSink::new(&config.output_dir);
    sink.save(&collection, &tree).await?;
    reply(ResponseContent::Success(&format!(
      "Saved {} papers to {}",
      collection.len(),
      sink.dir().display()
    )));
  } else {
    reply(ResponseContent::Info("Test mode: results not saved (add --debug to save them)"));
  }

  if report.unclassified > 0 {
    reply(ResponseContent::Warning(&format!(
      "{} files have no subject yet; run `pyq resolve` to classify them",
      report.unclassified
    )));
  }
  if report.aborted {
    return Err(PyqError::Aborted.into());
  }
  Ok(())
}
