//! The serializable form of the tree.

use super::*;

/// A tree node without its parent link, owning its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanNode {
  /// See [`Node::name`]
  pub name:     String,
  /// See [`Node::path`]
  pub path:     String,
  /// File or directory
  #[serde(rename = "type")]
  pub kind:     NodeKind,
  /// Children by sanitized key
  #[serde(default)]
  pub children: BTreeMap<String, CleanNode>,
  /// Subtree counts
  #[serde(default)]
  pub stats:    NodeStats,
  /// The paper, on file nodes
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<Paper>,
  /// Subtree facets
  #[serde(default)]
  pub meta:     NodeMeta,
}

/// The tree document handed to persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDocument {
  /// The root node
  pub structure:    CleanNode,
  /// Facets of the whole tree
  pub meta:         NodeMeta,
  /// Counts of the whole tree
  pub stats:        NodeStats,
  /// When the document was produced
  pub last_updated: DateTime<Utc>,
}

impl DirectoryTree {
  /// A copy of the tree without parent links, ready to serialize.
  pub fn clean(&self) -> CleanNode { self.clean_node(ROOT) }

  fn clean_node(&self, id: NodeId) -> CleanNode {
    let node = &self.nodes[id];
    CleanNode {
      name:     node.name.clone(),
      path:     node.path.clone(),
      kind:     node.kind,
      children: node
        .children
        .iter()
        .map(|(key, &child)| (key.clone(), self.clean_node(child)))
        .collect(),
      stats:    node.stats,
      metadata: node.metadata.clone(),
      meta:     node.meta.clone(),
    }
  }

  /// The persisted document, stamped with the current time.
  pub fn document(&self) -> TreeDocument {
    TreeDocument {
      structure:    self.clean(),
      meta:         self.meta().clone(),
      stats:        self.stats(),
      last_updated: Utc::now(),
    }
  }

  /// Rebuilds an arena from a clean tree, reattaching parent links in one top-down pass.
  ///
  /// Stored stats and meta are kept as they are; call [`DirectoryTree::recount`] to recompute
  /// them.
  pub fn from_clean(base: &str, root: CleanNode) -> Self {
    let mut tree = Self { base: base.to_string(), nodes: Vec::new() };
    let mut pending = vec![(root, None::<(NodeId, String)>)];
    while let Some((clean, parent)) = pending.pop() {
      let id = tree.nodes.len();
      tree.nodes.push(Node {
        name:     clean.name,
        path:     clean.path,
        kind:     clean.kind,
        children: BTreeMap::new(),
        stats:    clean.stats,
        metadata: clean.metadata,
        meta:     clean.meta,
        parent:   parent.as_ref().map(|(parent, _)| *parent),
      });
      if let Some((parent, key)) = parent {
        tree.nodes[parent].children.insert(key, id);
      }
      for (key, child) in clean.children {
        pending.push((child, Some((id, key))));
      }
    }
    tree
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const BASE: &str = "http://host/";

  fn tree() -> DirectoryTree {
    let mut tree = DirectoryTree::new(BASE);
    for (path, year) in [("FE/2016/PHYSICS.pdf", "2016"), ("FE/2017/MATHS.pdf", "2017")] {
      let mut paper = Paper::new(path.rsplit('/').next().unwrap(), format!("{BASE}{path}"));
      paper.year = year.into();
      tree.insert(&paper, false);
    }
    tree
  }

  #[test]
  fn test_clean_json_shape() {
    let json = serde_json::to_value(tree().clean()).unwrap();
    assert_eq!(json["type"], "directory");
    assert!(json.get("parent").is_none());
    assert!(json.get("metadata").is_none());
    assert_eq!(json["stats"]["totalFiles"], 2);

    let file = &json["children"]["FE"]["children"]["2016"]["children"]["PHYSICS_pdf"];
    assert_eq!(file["type"], "file");
    assert_eq!(file["metadata"]["year"], "2016");
    assert_eq!(file["meta"]["years"], serde_json::json!(["2016"]));
    assert_eq!(file["meta"]["papers"], serde_json::json!(["http://host/FE/2016/PHYSICS.pdf"]));
  }

  #[test]
  fn test_round_trip_through_json() {
    let original = tree();
    let json = serde_json::to_string(&original.clean()).unwrap();
    let reloaded = DirectoryTree::from_clean(BASE, serde_json::from_str(&json).unwrap());
    assert_eq!(reloaded.clean(), original.clean());
    assert_eq!(reloaded.len(), original.len());

    let file = reloaded.find("FE/2017/MATHS.pdf").unwrap();
    let names: Vec<&str> = reloaded.ancestors(file).map(|id| reloaded.node(id).name.as_str()).collect();
    assert_eq!(names, vec!["MATHS.pdf", "2017", "FE", ""]);
  }

  #[test]
  fn test_recount_after_reload_matches_build() {
    let original = tree();
    let mut stripped = original.clean();
    fn wipe(node: &mut CleanNode) {
      node.stats = NodeStats::default();
      node.meta = NodeMeta::default();
      node.children.values_mut().for_each(wipe);
    }
    wipe(&mut stripped);

    let mut reloaded = DirectoryTree::from_clean(BASE, stripped);
    reloaded.recount();
    assert_eq!(reloaded.clean(), original.clean());
  }

  #[test]
  fn test_document() {
    let document = tree().document();
    assert_eq!(document.stats.total_files, 2);
    assert_eq!(document.meta.facets.years.len(), 2);
    let json = serde_json::to_value(&document).unwrap();
    assert!(json.get("lastUpdated").is_some());
    assert!(json.get("structure").is_some());
  }
}
