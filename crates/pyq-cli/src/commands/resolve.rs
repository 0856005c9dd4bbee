//! Module for resolving the unclassified queue outside of a crawl.

use pyq::{
  classifier::{resolution::Outcome, Classifier, Request},
  knowledge::KnowledgeStore,
};

use super::*;

/// Function for the [`Commands::Resolve`] in the CLI.
///
/// Each queued path is first matched again, since variations learned after it was queued may
/// cover it now. The rest go through the interactive workflow one by one; every decision is
/// written to the store immediately, so quitting keeps the decisions made so far.
pub fn resolve(cli: &Cli, config: &Config) -> Result<()> {
  let mut store = KnowledgeStore::load(&config.data_dir);
  let classifier = Classifier::from_config(config)?;
  let queue = store.unclassified().to_vec();

  if queue.is_empty() {
    reply(ResponseContent::Info("Nothing to resolve"));
    return Ok(());
  }
  reply(ResponseContent::Info(&format!("{} files are waiting for a subject", queue.len())));

  let mut rematched = 0;
  let mut pending = Vec::new();
  for path in queue {
    let file_name = path.rsplit('/').next().unwrap_or(&path).to_string();
    match classifier.classify(&store, &file_name).first() {
      Some(best) => {
        debug!("{path} now matches {} via {:?}", best.subject_key, best.variation);
        store.remove_unclassified(&path)?;
        rematched += 1;
      },
      None => pending.push((path, file_name)),
    }
  }
  if rematched > 0 {
    reply(ResponseContent::Success(&format!("{rematched} files match known subjects now")));
  }

  if pending.is_empty() || cli.accept_defaults {
    return Ok(());
  }
  if !confirm(&format!("Resolve {} files now?", pending.len()))? {
    return Ok(());
  }

  let mut prompt = TerminalPrompt;
  let mut resolved = 0;
  for (path, file_name) in pending {
    let request = Request::new(&classifier, &store, &path, &file_name);
    let outcome = pyq::classifier::resolution::resolve(&mut prompt, &request)?;
    if outcome == Outcome::Aborted {
      reply(ResponseContent::Warning(&format!("Stopped after resolving {resolved} files")));
      return Err(PyqError::Aborted.into());
    }
    outcome.apply(&mut store, &path)?;
    if outcome != Outcome::Skipped {
      resolved += 1;
    }
  }
  reply(ResponseContent::Success(&format!(
    "Resolved {resolved} files, {} still queued",
    store.unclassified().len()
  )));
  Ok(())
}
