//! The persisted, incrementally learned classification dictionaries.
//!
//! Four JSON documents live in the data directory:
//!
//! | file                | shape                                  |
//! |---------------------|----------------------------------------|
//! | `subjects.json`     | `{ "<key>": { "standard": "<name>" } }` |
//! | `variations.json`   | `{ "<VARIATION TEXT>": "<key>" }`      |
//! | `exclusions.json`   | `["<path>", ...]`                      |
//! | `unclassified.json` | `["<path>", ...]`                      |
//!
//! Loading is best-effort: a missing or corrupt document starts out empty with a warning.
//! Every mutation updates memory and then rewrites the owning document in full; the store is
//! small and has a single writer, so there is no journal.
//!
//! Invariants kept by every mutation:
//! - a path is in at most one of exclusions and unclassified,
//! - every variation points at an existing subject key.

use super::*;

/// File name of the subject catalog.
pub const SUBJECTS_FILE: &str = "subjects.json";
/// File name of the variation dictionary.
pub const VARIATIONS_FILE: &str = "variations.json";
/// File name of the exclusion set.
pub const EXCLUSIONS_FILE: &str = "exclusions.json";
/// File name of the unclassified queue.
pub const UNCLASSIFIED_FILE: &str = "unclassified.json";

/// A canonical subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  /// Canonical display name
  pub standard: String,
}

/// Handle on the knowledge store documents.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
  /// Directory the documents live in
  dir:          PathBuf,
  /// Subject key to canonical subject
  subjects:     BTreeMap<String, Subject>,
  /// Upper-cased variation text to subject key
  variations:   BTreeMap<String, String>,
  /// Paths skipped on every crawl
  exclusions:   BTreeSet<String>,
  /// Paths waiting for a human decision, in arrival order
  unclassified: Vec<String>,
}

impl KnowledgeStore {
  /// Loads the store from `dir`, creating the directory if needed.
  ///
  /// Never fails: unreadable documents are replaced by empty ones and a warning is logged.
  pub fn load(dir: impl AsRef<Path>) -> Self {
    let dir = dir.as_ref().to_path_buf();
    if let Err(e) = std::fs::create_dir_all(&dir) {
      warn!("Cannot create knowledge store directory {}: {e}", dir.display());
    }

    let mut store = Self {
      subjects: read_or_default(&dir.join(SUBJECTS_FILE)),
      variations: read_or_default(&dir.join(VARIATIONS_FILE)),
      exclusions: read_or_default(&dir.join(EXCLUSIONS_FILE)),
      unclassified: read_or_default(&dir.join(UNCLASSIFIED_FILE)),
      dir,
    };
    store.repair();
    info!(
      "Knowledge store: {} subjects, {} variations, {} exclusions, {} unclassified",
      store.subjects.len(),
      store.variations.len(),
      store.exclusions.len(),
      store.unclassified.len()
    );
    store
  }

  /// Restores the invariants on freshly loaded data.
  fn repair(&mut self) {
    let dangling: Vec<String> = self
      .variations
      .iter()
      .filter(|(_, key)| !self.subjects.contains_key(*key))
      .map(|(text, _)| text.clone())
      .collect();
    for text in dangling {
      warn!("Dropping variation {text:?}: its subject key is not in {SUBJECTS_FILE}");
      self.variations.remove(&text);
    }

    let upper: BTreeMap<String, String> =
      std::mem::take(&mut self.variations).into_iter().map(|(k, v)| (k.to_uppercase(), v)).collect();
    self.variations = upper;

    let exclusions = &self.exclusions;
    self.unclassified.retain(|path| !exclusions.iter().any(|e| covers(e, path)));
    let mut seen = HashSet::new();
    self.unclassified.retain(|path| seen.insert(path.clone()));
  }

  /// Directory holding the documents.
  pub fn dir(&self) -> &Path { &self.dir }

  /// The subject catalog.
  pub fn subjects(&self) -> &BTreeMap<String, Subject> { &self.subjects }

  /// The variation dictionary.
  pub fn variations(&self) -> &BTreeMap<String, String> { &self.variations }

  /// The exclusion set.
  pub fn exclusions(&self) -> &BTreeSet<String> { &self.exclusions }

  /// The unclassified queue.
  pub fn unclassified(&self) -> &[String] { &self.unclassified }

  /// Canonical name for a subject key.
  pub fn standard(&self, key: &str) -> Option<&str> {
    self.subjects.get(key).map(|s| s.standard.as_str())
  }

  /// Whether `path` is excluded.
  ///
  /// Separators are normalized and a stored entry also matches when either path is a
  /// segment-aligned suffix of the other, which tolerates absolute and relative spellings of the
  /// same file across runs. An excluded directory excludes everything below it.
  pub fn is_excluded(&self, path: &str) -> bool {
    self.exclusions.iter().any(|excluded| covers(excluded, path))
  }

  /// Whether `path` waits in the unclassified queue.
  pub fn is_unclassified(&self, path: &str) -> bool {
    self.unclassified.iter().any(|queued| paths_match(queued, path))
  }

  /// Registers a subject. Returns `false` (and writes nothing) if the key already exists.
  pub fn add_subject(&mut self, key: &str, standard: &str) -> Result<bool> {
    if self.subjects.contains_key(key) {
      return Ok(false);
    }
    self.subjects.insert(key.to_string(), Subject { standard: standard.to_string() });
    self.write_subjects()?;
    Ok(true)
  }

  /// Maps a variation (stored upper-cased) to an existing subject key.
  pub fn add_variation(&mut self, text: &str, key: &str) -> Result<()> {
    if !self.subjects.contains_key(key) {
      return Err(PyqError::UnknownSubject(key.to_string()));
    }
    let text = text.trim().to_uppercase();
    if text.is_empty() {
      return Err(PyqError::Config("Refusing to store an empty variation".into()));
    }
    self.variations.insert(text, key.to_string());
    self.write_variations()
  }

  /// Excludes `path` permanently, removing it (and, for a directory, everything queued below it)
  /// from the unclassified queue.
  pub fn add_exclusion(&mut self, path: &str) -> Result<()> {
    let path = normalize_path(path);
    self.exclusions.insert(path.clone());
    self.write_exclusions()?;
    let before = self.unclassified.len();
    self.unclassified.retain(|queued| !covers(&path, queued));
    if before != self.unclassified.len() {
      self.write_unclassified()?;
    }
    Ok(())
  }

  /// Queues `path` for a human decision unless it is excluded or already queued.
  pub fn add_unclassified(&mut self, path: &str) -> Result<()> {
    let path = normalize_path(path);
    if self.is_excluded(&path) || self.is_unclassified(&path) {
      return Ok(());
    }
    self.unclassified.push(path);
    self.write_unclassified()
  }

  /// Records a resolved classification: the subject (if new), the variation, and the removal of
  /// `path` from the unclassified queue.
  pub fn add_mapping(&mut self, path: &str, variation: &str, key: &str, standard: &str) -> Result<()> {
    self.add_subject(key, standard)?;
    self.add_variation(variation, key)?;
    if self.remove_queued(path) {
      self.write_unclassified()?;
    }
    Ok(())
  }

  /// Drops `path` from the unclassified queue. Returns whether it was queued.
  pub fn remove_unclassified(&mut self, path: &str) -> Result<bool> {
    let removed = self.remove_queued(path);
    if removed {
      self.write_unclassified()?;
    }
    Ok(removed)
  }

  /// Rewrites all four documents.
  pub fn flush(&self) -> Result<()> {
    self.write_subjects()?;
    self.write_variations()?;
    self.write_exclusions()?;
    self.write_unclassified()
  }

  fn remove_queued(&mut self, path: &str) -> bool {
    let before = self.unclassified.len();
    self.unclassified.retain(|queued| !paths_match(queued, path));
    before != self.unclassified.len()
  }

  fn write_subjects(&self) -> Result<()> { write_json(&self.dir.join(SUBJECTS_FILE), &self.subjects) }

  fn write_variations(&self) -> Result<()> {
    write_json(&self.dir.join(VARIATIONS_FILE), &self.variations)
  }

  fn write_exclusions(&self) -> Result<()> {
    write_json(&self.dir.join(EXCLUSIONS_FILE), &self.exclusions)
  }

  fn write_unclassified(&self) -> Result<()> {
    write_json(&self.dir.join(UNCLASSIFIED_FILE), &self.unclassified)
  }
}

/// Reads a JSON document, falling back to the default value with a warning.
fn read_or_default<T: serde::de::DeserializeOwned + Default>(path: &Path) -> T {
  match std::fs::read_to_string(path) {
    Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
      warn!("Ignoring corrupt {}: {e}", path.display());
      T::default()
    }),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      debug!("{} does not exist yet", path.display());
      T::default()
    },
    Err(e) => {
      warn!("Cannot read {}: {e}", path.display());
      T::default()
    },
  }
}

/// Rewrites `path` with the pretty-printed JSON of `value`.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
  let json = serde_json::to_string_pretty(value)?;
  std::fs::write(path, json)?;
  trace!("Rewrote {}", path.display());
  Ok(())
}

/// Decodes percent escapes, turns `\` into `/` and collapses repeated separators.
pub fn normalize_path(path: &str) -> String {
  let decoded = urlencoding::decode(path).map(|d| d.into_owned()).unwrap_or_else(|_| path.into());
  let unified = decoded.replace('\\', "/");
  let mut normalized = String::with_capacity(unified.len());
  let mut previous = None;
  for c in unified.chars() {
    if c == '/' && previous == Some('/') && !normalized.ends_with(":/") {
      continue;
    }
    normalized.push(c);
    previous = Some(c);
  }
  normalized.trim_end_matches('/').to_string()
}

/// Equality after normalization, or a segment-aligned suffix match in either direction.
pub fn paths_match(a: &str, b: &str) -> bool {
  let a = normalize_path(a);
  let b = normalize_path(b);
  let a = a.trim_start_matches('/');
  let b = b.trim_start_matches('/');
  if a.is_empty() || b.is_empty() {
    return false;
  }
  a == b || a.ends_with(&format!("/{b}")) || b.ends_with(&format!("/{a}"))
}

/// Whether the exclusion entry `excluded` applies to `path`: [`paths_match`], or `path` lies below
/// `excluded` on a segment boundary.
pub fn covers(excluded: &str, path: &str) -> bool {
  if paths_match(excluded, path) {
    return true;
  }
  let excluded = normalize_path(excluded);
  let path = normalize_path(path);
  let excluded = excluded.trim_start_matches('/');
  let path = path.trim_start_matches('/');
  !excluded.is_empty()
    && (path.starts_with(&format!("{excluded}/")) || path.contains(&format!("/{excluded}/")))
}
