//! Recursive traversal tying fetching, extraction, classification and tree building together.
//!
//! Each directory level goes through `list → partition → recurse(directories) → files`:
//!
//! - a directory is counted, inserted into the tree as a directory record and crawled depth
//!   first;
//! - a file is skipped outright when its path is excluded; otherwise every extractor runs, the
//!   classifier looks for a subject, and unmatched files are handed to the configured [`Policy`].
//!   The resulting [`Paper`] goes into both the flat collection and the tree.
//!
//! Traversal is strictly sequential: one request in flight and one prompt at a time. Failures are
//! isolated per item and logged with the path and file name; only an interactive quit stops the
//! crawl, and even then everything accumulated so far stays available through
//! [`Crawler::finish`].

use futures::future::{BoxFuture, FutureExt};

use super::*;
use crate::{
  classifier::{resolution::Outcome, Classifier, Policy, Request},
  collection::PaperCollection,
  extract::Extractor,
  fetcher::{DirectoryEntry, Listing},
  knowledge::KnowledgeStore,
  tree::DirectoryTree,
};

/// Listings nested deeper than this are not followed.
pub const MAX_DEPTH: usize = 32;

/// What a crawl did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlReport {
  /// Papers added to the collection
  pub files:        usize,
  /// Directories crawled
  pub directories:  usize,
  /// Files and directories skipped because they are excluded
  pub excluded:     usize,
  /// Papers without a subject, queued for resolution
  pub unclassified: usize,
  /// Files whose processing failed
  pub failed:       usize,
  /// Whether the crawl was stopped by the user
  pub aborted:      bool,
}

/// One line of a `--list-only` inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
  /// Path relative to the base URL, percent-decoded
  pub path:         String,
  /// Entry name
  pub name:         String,
  /// Whether the entry is a directory
  pub is_directory: bool,
  /// Nesting level below the start directory, starting at 0
  pub depth:        usize,
}

/// Crawls a [`Listing`] and accumulates a [`PaperCollection`] and a [`DirectoryTree`].
pub struct Crawler<L: Listing> {
  listing:    L,
  extractor:  Extractor,
  classifier: Classifier,
  store:      KnowledgeStore,
  policy:     Policy,
  collection: PaperCollection,
  tree:       DirectoryTree,
  visited:    HashSet<String>,
  report:     CrawlReport,
}

impl<L: Listing> Crawler<L> {
  /// A crawler queueing unmatched files as unclassified.
  pub fn new(
    listing: L,
    extractor: Extractor,
    classifier: Classifier,
    store: KnowledgeStore,
  ) -> Self {
    let tree = DirectoryTree::new(listing.base_url());
    Self {
      listing,
      extractor,
      classifier,
      store,
      policy: Policy::default(),
      collection: PaperCollection::new(),
      tree,
      visited: HashSet::new(),
      report: CrawlReport::default(),
    }
  }

  /// Sets what happens to files the classifier cannot match.
  pub fn with_policy(mut self, policy: Policy) -> Self {
    self.policy = policy;
    self
  }

  /// The knowledge store, as updated so far.
  pub fn store(&self) -> &KnowledgeStore { &self.store }

  /// The collection accumulated so far.
  pub fn collection(&self) -> &PaperCollection { &self.collection }

  /// The tree accumulated so far.
  pub fn tree(&self) -> &DirectoryTree { &self.tree }

  /// Totals accumulated so far.
  pub fn report(&self) -> &CrawlReport { &self.report }

  /// Hands over the collection and the tree.
  pub fn finish(self) -> (PaperCollection, DirectoryTree) { (self.collection, self.tree) }

  /// Crawls everything below `start` (absolute, or relative to the base URL).
  ///
  /// Returns the totals so far; an interactive quit is reported through
  /// [`CrawlReport::aborted`] rather than as an error.
  pub async fn crawl(&mut self, start: &str) -> Result<CrawlReport> {
    let url = absolute(self.listing.base_url(), start);
    info!("Crawling {url}");
    match self.visit(url, 0).await {
      Ok(()) => info!(
        "Crawl finished: {} papers, {} directories, {} excluded, {} unclassified, {} failed",
        self.report.files,
        self.report.directories,
        self.report.excluded,
        self.report.unclassified,
        self.report.failed
      ),
      Err(PyqError::Aborted) => {
        warn!("Crawl aborted after {} papers", self.report.files);
        self.report.aborted = true;
      },
      Err(e) => return Err(e),
    }
    Ok(self.report.clone())
  }

  fn visit(&mut self, url: String, depth: usize) -> BoxFuture<'_, Result<()>> {
    async move {
      if depth > MAX_DEPTH {
        warn!("Not following {url}: nested deeper than {MAX_DEPTH} levels");
        return Ok(());
      }
      if !self.visited.insert(url.clone()) {
        debug!("Already crawled {url}");
        return Ok(());
      }

      let entries = self.listing.list(&url).await;
      let (directories, files): (Vec<_>, Vec<_>) =
        entries.into_iter().partition(|entry| entry.is_directory);
      debug!("{url}: {} directories, {} files", directories.len(), files.len());

      for directory in directories {
        let path = relative(self.listing.base_url(), &directory.path);
        if self.store.is_excluded(&path) {
          debug!("Skipping excluded directory {path}");
          self.report.excluded += 1;
          continue;
        }
        self.enter(&directory);
        self.visit(directory.path.clone(), depth + 1).await?;
      }

      for file in files {
        match self.process(&file) {
          Ok(()) => {},
          Err(PyqError::Aborted) => return Err(PyqError::Aborted),
          Err(e) => {
            self.report.failed += 1;
            error!(directory = %url, file = %file.name, "Failed to process file: {e:?}");
          },
        }
      }
      Ok(())
    }
    .boxed()
  }

  /// Counts a directory and inserts its record into the tree.
  fn enter(&mut self, directory: &DirectoryEntry) {
    self.collection.add_directory();
    self.report.directories += 1;
    let record = Paper::new(directory.name.clone(), directory.path.clone());
    self.tree.insert(&record, true);
  }

  /// Classifies one file and adds it to the collection and the tree.
  fn process(&mut self, file: &DirectoryEntry) -> Result<()> {
    let path = relative(self.listing.base_url(), &file.path);
    if self.store.is_excluded(&path) {
      debug!("Skipping excluded {path}");
      self.report.excluded += 1;
      return Ok(());
    }

    let directory = path.rsplit_once('/').map_or("", |(directory, _)| directory);
    let fields = self.extractor.extract(directory, &file.name);

    let (subject, standard_subject) = match self.classifier.classify(&self.store, &file.name).first()
    {
      Some(best) => {
        debug!("{} is {} via {:?}", file.name, best.subject_key, best.variation);
        if self.store.is_unclassified(&path) {
          warn_on_store_error(self.store.remove_unclassified(&path).map(|_| ()), &path);
        }
        (best.variation.clone(), best.standard.clone())
      },
      None => match self.resolve(&path, &file.name)? {
        Some(subject) => subject,
        None => return Ok(()),
      },
    };

    let paper = Paper {
      file_name: file.name.clone(),
      url: file.path.clone(),
      year: fields.year,
      branch: fields.branch,
      semester: fields.semester,
      exam_type: fields.exam_type,
      subject,
      standard_subject,
    };
    trace!("{paper:?}");
    self.tree.insert(&paper, false);
    self.collection.add(paper);
    self.report.files += 1;
    Ok(())
  }

  /// Applies the policy to an unmatched file.
  ///
  /// Returns the subject and canonical subject for the paper, or `None` when the file is now
  /// excluded and must not become a paper.
  fn resolve(&mut self, path: &str, file_name: &str) -> Result<Option<(String, String)>> {
    let request = Request::new(&self.classifier, &self.store, path, file_name);
    let outcome = match self.policy.decide(&request) {
      Ok(outcome) => outcome,
      Err(PyqError::Aborted) => Outcome::Aborted,
      Err(e) => {
        warn!("Resolution of {path} failed, queueing it: {e}");
        Outcome::Skipped
      },
    };

    if outcome == Outcome::Aborted {
      return Err(PyqError::Aborted);
    }
    let standard = match outcome.apply(&mut self.store, path) {
      Ok(standard) => standard,
      Err(e) => {
        warn!("Knowledge store update for {path} failed: {e}");
        None
      },
    };

    Ok(match outcome {
      Outcome::Excluded => {
        self.report.excluded += 1;
        None
      },
      Outcome::Committed(mapping) | Outcome::Guessed(mapping) => {
        let standard = standard.unwrap_or(mapping.standard);
        Some((mapping.variation, standard))
      },
      _ => {
        self.report.unclassified += 1;
        Some((UNKNOWN.to_string(), UNKNOWN.to_string()))
      },
    })
  }
}

fn warn_on_store_error(result: Result<()>, path: &str) {
  if let Err(e) = result {
    warn!("Knowledge store update for {path} failed: {e}");
  }
}

/// Enumerates everything below `start` without classifying or storing anything.
pub async fn inventory<L: Listing + ?Sized>(listing: &L, start: &str) -> Vec<InventoryEntry> {
  let base = listing.base_url();
  let mut entries = Vec::new();
  let mut visited = HashSet::new();
  let mut pending = vec![(absolute(base, start), 0usize)];

  while let Some((url, depth)) = pending.pop() {
    if depth > MAX_DEPTH || !visited.insert(url.clone()) {
      continue;
    }
    let listed = listing.list(&url).await;
    let mut directories = Vec::new();
    for entry in listed {
      if entry.is_directory {
        directories.push(entry.path.clone());
      }
      entries.push(InventoryEntry {
        path: relative(base, &entry.path),
        name: entry.name,
        is_directory: entry.is_directory,
        depth,
      });
    }
    pending.extend(directories.into_iter().rev().map(|path| (path, depth + 1)));
  }
  info!("Inventory: {} entries", entries.len());
  entries
}

/// `target` as an absolute URL under `base`.
fn absolute(base: &str, target: &str) -> String {
  if target.starts_with("http://") || target.starts_with("https://") {
    target.to_string()
  } else {
    format!("{base}{}", target.trim_start_matches('/'))
  }
}

/// `url` relative to `base`, percent-decoded; the form stored in the knowledge store.
pub fn relative(base: &str, url: &str) -> String {
  let rest = url.strip_prefix(base).unwrap_or(url);
  urlencoding::decode(rest).map(|d| d.into_owned()).unwrap_or_else(|_| rest.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::classifier::resolution::ScriptedPrompt;

  const BASE: &str = "http://host/papers/";

  /// A listing served from memory: directory URL to its entries.
  struct MemoryListing {
    pages: BTreeMap<String, Vec<DirectoryEntry>>,
  }

  impl MemoryListing {
    fn new(files: &[&str]) -> Self {
      let mut pages: BTreeMap<String, Vec<DirectoryEntry>> = BTreeMap::new();
      for file in files {
        let mut parent = BASE.to_string();
        let segments: Vec<&str> = file.split('/').collect();
        for (i, segment) in segments.iter().enumerate() {
          let is_directory = i + 1 < segments.len();
          let suffix = if is_directory { "/" } else { "" };
          let path = format!("{parent}{}{suffix}", segment.replace(' ', "%20"));
          let entry = DirectoryEntry { name: segment.to_string(), is_directory, path: path.clone() };
          let page = pages.entry(parent.clone()).or_default();
          if !page.contains(&entry) {
            page.push(entry);
          }
          parent = path;
        }
      }
      Self { pages }
    }
  }

  #[async_trait]
  impl Listing for MemoryListing {
    async fn list(&self, url: &str) -> Vec<DirectoryEntry> {
      self.pages.get(url).cloned().unwrap_or_default()
    }

    fn base_url(&self) -> &str { BASE }
  }

  const FILES: &[&str] = &[
    "FE/2016/FE-BTECH_PHYSICS_SEM I_DEC 2016.pdf",
    "FE/2016/FE_CHEMISTRY_SEM II.pdf",
    "FE/2016/scan0001.pdf",
    "TE/COMPS/2019/COMPS_DBMS_END SEM_MAY 2019.pdf",
  ];

  fn crawler(dir: &Path) -> Crawler<MemoryListing> {
    let mut store = KnowledgeStore::load(dir);
    store.add_subject("PHY", "Engineering Physics").unwrap();
    store.add_variation("PHYSICS", "PHY").unwrap();
    store.add_subject("DBMS", "Database Management Systems").unwrap();
    store.add_variation("DBMS", "DBMS").unwrap();
    store.add_exclusion("FE/2016/scan0001.pdf").unwrap();
    Crawler::new(
      MemoryListing::new(FILES),
      Extractor::builtin(2000, 2025).unwrap(),
      Classifier::builtin().unwrap(),
      store,
    )
  }

  #[traced_test]
  #[tokio::test]
  async fn test_crawl_builds_collection_and_tree() {
    let dir = tempdir().unwrap();
    let mut crawler = crawler(dir.path());
    let report = crawler.crawl("/").await.unwrap();

    assert_eq!(report, CrawlReport {
      files:        3,
      directories:  5,
      excluded:     1,
      unclassified: 1,
      failed:       0,
      aborted:      false,
    });

    let physics = &crawler.collection().papers[0];
    assert_eq!(physics.year, "2016");
    assert_eq!(physics.branch, "COMMON");
    assert_eq!(physics.semester, "1");
    assert_eq!(physics.standard_subject, "Engineering Physics");

    let dbms = crawler.collection().papers.iter().find(|p| p.subject == "DBMS").unwrap();
    assert_eq!(dbms.branch, "COMPS");
    assert_eq!(dbms.exam_type, "End Semester");
    assert_eq!(dbms.year, "2019");

    assert_eq!(crawler.store().unclassified(), ["FE/2016/FE_CHEMISTRY_SEM II.pdf".to_string()]);
    assert_eq!(crawler.tree().stats().total_files, 3);
    assert_eq!(crawler.tree().stats().total_directories, 5);
    assert!(logs_contain("Skipping excluded"));
  }

  #[tokio::test]
  async fn test_every_file_is_a_paper_or_excluded() {
    let dir = tempdir().unwrap();
    let mut crawler = crawler(dir.path());
    crawler.crawl("/").await.unwrap();

    for file in FILES {
      let url = format!("{BASE}{}", file.replace(' ', "%20"));
      let has_paper = crawler.collection().contains_url(&url);
      let excluded = crawler.store().is_excluded(file);
      assert!(has_paper ^ excluded, "{file}: paper {has_paper}, excluded {excluded}");
    }
  }

  #[tokio::test]
  async fn test_interactive_commit_teaches_the_store() {
    let dir = tempdir().unwrap();
    let prompt = ScriptedPrompt::new(["n", "Engineering Chemistry", "CHEM"]);
    let mut crawler = crawler(dir.path()).with_policy(Policy::Interactive(Box::new(prompt)));
    let report = crawler.crawl("/FE/").await.unwrap();

    assert_eq!(report.files, 2);
    assert_eq!(report.unclassified, 0);
    let chemistry = crawler.collection().papers.iter().find(|p| p.file_name.contains("CHEM")).unwrap();
    assert_eq!(chemistry.standard_subject, "Engineering Chemistry");
    assert_eq!(crawler.store().variations().get("CHEMISTRY").map(String::as_str), Some("CHEM"));

    let reloaded = KnowledgeStore::load(dir.path());
    assert_eq!(reloaded.standard("CHEM"), Some("Engineering Chemistry"));
  }

  #[tokio::test]
  async fn test_interactive_exclusion_removes_paper() {
    let dir = tempdir().unwrap();
    let prompt = ScriptedPrompt::new(["e"]);
    let mut crawler = crawler(dir.path()).with_policy(Policy::Interactive(Box::new(prompt)));
    let report = crawler.crawl("/").await.unwrap();

    assert_eq!(report.excluded, 2);
    assert_eq!(report.files, 2);
    assert!(crawler.store().is_excluded("FE/2016/FE_CHEMISTRY_SEM II.pdf"));
    assert!(crawler.store().unclassified().is_empty());
  }

  #[tokio::test]
  async fn test_quit_keeps_partial_results() {
    let dir = tempdir().unwrap();
    let prompt = ScriptedPrompt::new(["q"]);
    let mut crawler = crawler(dir.path()).with_policy(Policy::Interactive(Box::new(prompt)));
    let report = crawler.crawl("/").await.unwrap();

    assert!(report.aborted);
    assert_eq!(report.files, 1);
    let (collection, tree) = crawler.finish();
    assert_eq!(collection.len(), 1);
    assert_eq!(tree.stats().total_files, 1);
  }

  #[tokio::test]
  async fn test_best_guess_does_not_teach() {
    let dir = tempdir().unwrap();
    let mut crawler = crawler(dir.path()).with_policy(Policy::BestGuess);
    crawler.listing = MemoryListing::new(&["SE/ENGINEERING DRAWING.pdf"]);
    let report = crawler.crawl("/").await.unwrap();

    assert_eq!(report.unclassified, 0);
    let paper = &crawler.collection().papers[0];
    assert_eq!(paper.subject, "ENGINEERING DRAWING");
    assert_eq!(paper.standard_subject, "Engineering Physics");
    assert!(!crawler.store().variations().contains_key("ENGINEERING DRAWING"));
    assert!(crawler.store().unclassified().is_empty());
  }

  #[traced_test]
  #[tokio::test]
  async fn test_excluded_directory_is_not_crawled() {
    let dir = tempdir().unwrap();
    let mut crawler = crawler(dir.path());
    crawler.store.add_exclusion("FE/").unwrap();
    let report = crawler.crawl("/").await.unwrap();

    assert_eq!(report.excluded, 1);
    assert_eq!(report.files, 1);
    assert_eq!(report.unclassified, 0);
    assert_eq!(report.directories, 3);
    assert!(crawler.store().unclassified().is_empty());
    assert!(crawler.tree().find("FE").is_none());
    assert!(crawler.collection().papers.iter().all(|p| !p.url.contains("/FE/")));
    assert!(logs_contain("Skipping excluded directory FE/"));
  }

  #[tokio::test]
  async fn test_empty_listing_is_not_an_error() {
    let dir = tempdir().unwrap();
    let mut crawler = crawler(dir.path());
    let report = crawler.crawl("/missing/").await.unwrap();
    assert_eq!(report, CrawlReport::default());
    assert!(crawler.tree().is_empty());
  }

  #[tokio::test]
  async fn test_inventory() {
    let listing = MemoryListing::new(FILES);
    let entries = inventory(&listing, "/").await;
    assert_eq!(entries.len(), 9);
    assert_eq!(entries[0], InventoryEntry {
      path:         "FE/".into(),
      name:         "FE".into(),
      is_directory: true,
      depth:        0,
    });
    let dbms = entries.iter().find(|e| e.name.contains("DBMS")).unwrap();
    assert_eq!(dbms.depth, 3);
    assert_eq!(dbms.path, "TE/COMPS/2019/COMPS_DBMS_END SEM_MAY 2019.pdf");
  }

  #[test]
  fn test_relative() {
    assert_eq!(relative(BASE, "http://host/papers/FE/a%20b.pdf"), "FE/a b.pdf");
    assert_eq!(relative(BASE, "http://elsewhere/a.pdf"), "http://elsewhere/a.pdf");
  }
}
