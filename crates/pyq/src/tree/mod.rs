//! The aggregated directory tree.
//!
//! Nodes live in an arena and refer to their parent by [`NodeId`]. The parent link is a
//! non-owning relation used only while building: every insertion walks it upwards to add the new
//! node's contribution to all ancestors, so each node's [`NodeStats`] and [`NodeMeta`] always
//! describe its whole subtree. The persisted form, [`CleanNode`], has no parent links at all.
//!
//! ```
//! use pyq::{paper::Paper, tree::DirectoryTree};
//!
//! let mut tree = DirectoryTree::new("http://host/papers/");
//! let mut paper = Paper::new("PHYSICS.pdf", "http://host/papers/FE/2016/PHYSICS.pdf");
//! paper.year = "2016".into();
//! tree.insert(&paper, false);
//!
//! assert_eq!(tree.stats().total_files, 1);
//! assert_eq!(tree.stats().total_directories, 2);
//! assert!(tree.meta().facets.years.contains("2016"));
//! ```

use super::*;

mod clean;

pub use clean::{CleanNode, TreeDocument};

/// Index of a node in the arena.
pub type NodeId = usize;

/// The root is always the first node.
pub const ROOT: NodeId = 0;

/// Whether a node is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
  /// A PDF
  File,
  /// A listing page
  Directory,
}

/// File and directory counts of a subtree, the node itself included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStats {
  /// File nodes in the subtree
  pub total_files:       usize,
  /// Directory nodes in the subtree
  pub total_directories: usize,
}

/// Facets of every paper in a subtree, plus their URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMeta {
  /// URLs of the papers in the subtree
  pub papers: BTreeSet<String>,
  /// Facet values of the papers in the subtree
  #[serde(flatten)]
  pub facets: Facets,
}

impl NodeMeta {
  fn absorb(&mut self, paper: &Paper) {
    self.papers.insert(paper.url.clone());
    self.facets.absorb(paper);
  }
}

/// A node under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
  /// Segment name as listed (percent-decoded)
  pub name:     String,
  /// Path from the root, `/`-separated
  pub path:     String,
  /// File or directory
  pub kind:     NodeKind,
  /// Children by sanitized key
  pub children: BTreeMap<String, NodeId>,
  /// Subtree counts
  pub stats:    NodeStats,
  /// The paper, on file nodes
  pub metadata: Option<Paper>,
  /// Subtree facets
  pub meta:     NodeMeta,
  /// Build-time back reference; `None` only on the root
  pub parent:   Option<NodeId>,
}

impl Node {
  fn new(name: &str, path: &str, kind: NodeKind, parent: Option<NodeId>) -> Self {
    Self {
      name: name.to_string(),
      path: path.to_string(),
      kind,
      children: BTreeMap::new(),
      stats: NodeStats::default(),
      metadata: None,
      meta: NodeMeta::default(),
      parent,
    }
  }
}

/// Arena-backed tree of everything a crawl discovered.
#[derive(Debug, Clone)]
pub struct DirectoryTree {
  base:  String,
  nodes: Vec<Node>,
}

/// Replaces the characters the persistence layer cannot take in map keys.
pub fn sanitize_key(segment: &str) -> String { segment.replace(['.', '$'], "_") }

impl DirectoryTree {
  /// An empty tree; paper URLs are made relative to `base` before being split.
  pub fn new(base: &str) -> Self {
    Self {
      base:  base.to_string(),
      nodes: vec![Node::new("", "/", NodeKind::Directory, None)],
    }
  }

  /// The URL prefix stripped from paper URLs.
  pub fn base(&self) -> &str { &self.base }

  /// Number of nodes, the root included.
  pub fn len(&self) -> usize { self.nodes.len() }

  /// Whether the tree holds only its root.
  pub fn is_empty(&self) -> bool { self.nodes.len() == 1 }

  /// The node with id `id`.
  pub fn node(&self, id: NodeId) -> &Node { &self.nodes[id] }

  /// Every node, in creation order.
  pub fn nodes(&self) -> &[Node] { &self.nodes }

  /// Counts of the whole tree.
  pub fn stats(&self) -> NodeStats { self.nodes[ROOT].stats }

  /// Facets of the whole tree.
  pub fn meta(&self) -> &NodeMeta { &self.nodes[ROOT].meta }

  /// The node at `/`-separated `path`, if any.
  pub fn find(&self, path: &str) -> Option<NodeId> {
    path
      .split('/')
      .filter(|s| !s.is_empty())
      .try_fold(ROOT, |current, segment| self.child(current, segment).1)
  }

  /// The key `segment` lives under in `parent`, and the node already there.
  ///
  /// Distinct names can sanitize to the same key (`A.B` and `A_B`); the later one gets a numbered
  /// key so it never lands on the node of the other.
  fn child(&self, parent: NodeId, segment: &str) -> (String, Option<NodeId>) {
    let children = &self.nodes[parent].children;
    let base = sanitize_key(segment);
    let mut key = base.clone();
    for n in 2.. {
      match children.get(&key) {
        Some(&id) if self.nodes[id].name == segment => return (key, Some(id)),
        Some(_) => key = format!("{base}_{n}"),
        None => break,
      }
    }
    (key, None)
  }

  /// `id` followed by each of its ancestors up to the root.
  pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(Some(id), move |&current| self.nodes[current].parent)
  }

  /// Path segments of `url` relative to the base, percent-decoded.
  fn segments(&self, url: &str) -> Vec<String> {
    let relative = match url.strip_prefix(self.base.as_str()) {
      Some(rest) => rest.to_string(),
      None => Url::parse(url).map(|u| u.path().to_string()).unwrap_or_else(|_| url.to_string()),
    };
    relative
      .split('/')
      .filter(|s| !s.is_empty())
      .map(|s| urlencoding::decode(s).map(|d| d.into_owned()).unwrap_or_else(|_| s.to_string()))
      .collect()
  }

  /// Inserts a file paper, or a directory record when `is_directory` is set.
  ///
  /// Missing nodes along the path are created as directories, except the final node of a file,
  /// and each created node adds one file or directory to itself and every ancestor. A file paper
  /// is attached to its node and its facets and URL are added from that node up to the root.
  pub fn insert(&mut self, paper: &Paper, is_directory: bool) -> Option<NodeId> {
    let segments = self.segments(&paper.url);
    if segments.is_empty() {
      warn!("Not inserting {:?}: its URL has no path below {}", paper.url, self.base);
      return None;
    }

    let mut current = ROOT;
    let mut path = String::new();
    for (i, segment) in segments.iter().enumerate() {
      path.push('/');
      path.push_str(segment);
      let (key, existing) = self.child(current, segment);
      if let Some(child) = existing {
        current = child;
        continue;
      }

      let is_last = i + 1 == segments.len();
      let kind = if is_last && !is_directory { NodeKind::File } else { NodeKind::Directory };
      let display_path = if kind == NodeKind::Directory { format!("{path}/") } else { path.clone() };
      let id = self.nodes.len();
      self.nodes.push(Node::new(segment, &display_path, kind, Some(current)));
      self.nodes[current].children.insert(key, id);
      self.count(id, kind);
      current = id;
    }

    if !is_directory {
      self.nodes[current].metadata = Some(paper.clone());
      self.spread(current, paper);
    }
    Some(current)
  }

  /// Adds one `kind` to `id` and all its ancestors.
  fn count(&mut self, id: NodeId, kind: NodeKind) {
    let mut next = Some(id);
    while let Some(current) = next {
      let stats = &mut self.nodes[current].stats;
      match kind {
        NodeKind::File => stats.total_files += 1,
        NodeKind::Directory => stats.total_directories += 1,
      }
      next = self.nodes[current].parent;
    }
  }

  /// Adds `paper` to the meta of `id` and all its ancestors.
  fn spread(&mut self, id: NodeId, paper: &Paper) {
    let mut next = Some(id);
    while let Some(current) = next {
      self.nodes[current].meta.absorb(paper);
      next = self.nodes[current].parent;
    }
  }

  /// Recomputes every node's stats and meta from the nodes and attached papers alone.
  ///
  /// After a reload this reproduces what incremental insertion built.
  pub fn recount(&mut self) {
    for node in &mut self.nodes {
      node.stats = NodeStats::default();
      node.meta = NodeMeta::default();
    }
    for id in 1..self.nodes.len() {
      let kind = self.nodes[id].kind;
      self.count(id, kind);
      if kind == NodeKind::File {
        if let Some(paper) = self.nodes[id].metadata.clone() {
          self.spread(id, &paper);
        }
      }
    }
  }
}
