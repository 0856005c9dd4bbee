//! The flat paper collection with its deduplicated facet arrays.

use super::*;

/// Counts and freshness of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
  /// Papers in the collection
  pub total_files:       usize,
  /// Directories crawled to find them
  pub total_directories: usize,
  /// Last time a paper or directory was added
  pub last_updated:      DateTime<Utc>,
}

impl Default for CollectionStats {
  fn default() -> Self { Self { total_files: 0, total_directories: 0, last_updated: Utc::now() } }
}

/// Every paper of a crawl, plus the facets needed to build search filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperCollection {
  /// Papers in discovery order
  pub papers: Vec<Paper>,
  /// Distinct values of every facet
  pub meta:   Facets,
  /// Counts
  pub stats:  CollectionStats,
}

impl PaperCollection {
  /// An empty collection.
  pub fn new() -> Self { Self::default() }

  /// Appends `paper` and folds its facets into [`PaperCollection::meta`].
  pub fn add(&mut self, paper: Paper) {
    self.meta.absorb(&paper);
    self.papers.push(paper);
    self.stats.total_files = self.papers.len();
    self.stats.last_updated = Utc::now();
  }

  /// Counts one crawled directory.
  pub fn add_directory(&mut self) {
    self.stats.total_directories += 1;
    self.stats.last_updated = Utc::now();
  }

  /// Number of papers.
  pub fn len(&self) -> usize { self.papers.len() }

  /// Whether there are no papers.
  pub fn is_empty(&self) -> bool { self.papers.is_empty() }

  /// Whether a paper with this URL is present.
  pub fn contains_url(&self, url: &str) -> bool { self.papers.iter().any(|p| p.url == url) }

  /// A copy whose paper URLs have the prefix `from` replaced by `to`.
  pub fn rebase_urls(&self, from: &str, to: &str) -> Self {
    Self {
      papers: self.papers.iter().map(|p| p.rebased(from, to)).collect(),
      meta:   self.meta.clone(),
      stats:  self.stats.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn paper(name: &str, branch: &str) -> Paper {
    let mut paper = Paper::new(name, format!("http://host/papers/{name}"));
    paper.branch = branch.into();
    paper
  }

  #[test]
  fn test_add_updates_meta_and_stats() {
    let mut collection = PaperCollection::new();
    collection.add(paper("a.pdf", "COMPS"));
    collection.add(paper("b.pdf", "COMPS"));
    collection.add(paper("c.pdf", "IT"));
    collection.add_directory();

    assert_eq!(collection.len(), 3);
    assert_eq!(collection.stats.total_files, 3);
    assert_eq!(collection.stats.total_directories, 1);
    assert_eq!(collection.meta.branches.len(), 2);
    assert!(collection.meta.years.contains(UNKNOWN));
  }

  #[test]
  fn test_rebase_urls_leaves_original() {
    let mut collection = PaperCollection::new();
    collection.add(paper("a.pdf", "COMPS"));
    collection.add(Paper::new("x.pdf", "http://elsewhere/x.pdf"));

    let rebased = collection.rebase_urls("http://host/papers/", "/api/download?path=");
    assert_eq!(rebased.papers[0].url, "/api/download?path=a.pdf");
    assert_eq!(rebased.papers[1].url, "http://elsewhere/x.pdf");
    assert_eq!(collection.papers[0].url, "http://host/papers/a.pdf");
  }

  #[test]
  fn test_json_shape() {
    let mut collection = PaperCollection::new();
    collection.add(paper("a.pdf", "COMPS"));
    let json = serde_json::to_value(&collection).unwrap();
    assert_eq!(json["papers"][0]["fileName"], "a.pdf");
    assert_eq!(json["meta"]["examTypes"], serde_json::json!([UNKNOWN]));
    assert_eq!(json["stats"]["totalFiles"], 1);
    assert!(json["stats"]["lastUpdated"].is_string());
  }
}
