//! The persistence contract for crawl results.
//!
//! A sink receives two documents per crawl, the flat [`PaperCollection`] and the cleaned
//! [`TreeDocument`], and replaces whatever it held before. There is no incremental upsert: every
//! full crawl rebuilds both documents from scratch.

use super::*;
use crate::{
  collection::PaperCollection,
  tree::{DirectoryTree, TreeDocument},
};

/// File name of the collection document written by [`JsonSink`].
pub const PAPERS_FILE: &str = "papers.json";
/// File name of the tree document written by [`JsonSink`].
pub const TREE_FILE: &str = "tree.json";

/// Replace-all storage of crawl results.
#[async_trait]
pub trait Sink: Send + Sync {
  /// Replaces the stored collection.
  async fn save_collection(&self, collection: &PaperCollection) -> Result<()>;

  /// Replaces the stored tree.
  async fn save_tree(&self, tree: &TreeDocument) -> Result<()>;

  /// Replaces both documents.
  async fn save(&self, collection: &PaperCollection, tree: &DirectoryTree) -> Result<()> {
    self.save_collection(collection).await?;
    self.save_tree(&tree.document()).await
  }
}

/// A [`Sink`] writing pretty-printed JSON files into a directory.
///
/// Each document is written to a temporary file and renamed over the previous one, so readers
/// never see a half-written document.
#[derive(Debug, Clone)]
pub struct JsonSink {
  dir: PathBuf,
}

impl JsonSink {
  /// A sink writing into `dir`, created on first save.
  pub fn new(dir: impl AsRef<Path>) -> Self { Self { dir: dir.as_ref().to_path_buf() } }

  /// Directory the documents are written to.
  pub fn dir(&self) -> &Path { &self.dir }

  /// Reads back a saved collection.
  pub async fn load_collection(&self) -> Result<PaperCollection> {
    let content = tokio::fs::read_to_string(self.dir.join(PAPERS_FILE)).await?;
    Ok(serde_json::from_str(&content)?)
  }

  /// Reads back a saved tree document.
  pub async fn load_tree(&self) -> Result<TreeDocument> {
    let content = tokio::fs::read_to_string(self.dir.join(TREE_FILE)).await?;
    Ok(serde_json::from_str(&content)?)
  }

  /// Writes any serializable document under `file_name` with replace semantics.
  pub async fn write<T: Serialize + Sync>(&self, file_name: &str, document: &T) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(document)?;
    let target = self.dir.join(file_name);
    let temporary = self.dir.join(format!(".{file_name}.tmp"));

    let replace = async {
      tokio::fs::create_dir_all(&self.dir).await?;
      tokio::fs::write(&temporary, json).await?;
      tokio::fs::rename(&temporary, &target).await
    };
    replace.await.map_err(|e| {
      PyqError::Persistence(format!("Cannot write {}: {e}", target.display()))
    })?;
    debug!("Replaced {}", target.display());
    Ok(target)
  }
}

#[async_trait]
impl Sink for JsonSink {
  async fn save_collection(&self, collection: &PaperCollection) -> Result<()> {
    let path = self.write(PAPERS_FILE, collection).await?;
    info!("Saved {} papers to {}", collection.len(), path.display());
    Ok(())
  }

  async fn save_tree(&self, tree: &TreeDocument) -> Result<()> {
    let path = self.write(TREE_FILE, tree).await?;
    info!("Saved tree of {} files to {}", tree.stats.total_files, path.display());
    Ok(())
  }
}
