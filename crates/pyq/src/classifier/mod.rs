//! Subject classification against the learned variation dictionary.
//!
//! A file name fragment is normalized (upper-cased, punctuation to spaces, whitespace collapsed)
//! and compared with every known variation. A variation matches when any of these holds:
//!
//! 1. [`MatchKind::Exact`]: the texts are equal,
//! 2. [`MatchKind::Compact`]: they are equal once all whitespace is removed,
//! 3. [`MatchKind::Word`]: one word of the input is the variation,
//! 4. [`MatchKind::Substring`]: the variation occurs inside the input,
//! 5. [`MatchKind::Phrase`]: every word (longer than one character) of a multi-word variation
//!    occurs in the input, in any order.
//!
//! Matches are ordered by variation length, longest first, so the most specific variation wins.
//! When nothing matches, known noise (years, semester markers, degree and branch labels, exam
//! words, months, file-type words) is stripped until the text stops changing and the residual is
//! matched again.
//!
//! Files that still do not match go through the [`resolution`] workflow.

use super::*;
use crate::{extract::Tables, knowledge::KnowledgeStore};

pub mod normalize;
pub mod resolution;

pub use normalize::{compact, normalize_text, words};
pub use resolution::{Mapping, Outcome, Policy, Prompt, Question, Request, Resolver, State};

/// Upper bound on noise-stripping rounds; real inputs settle in two or three.
const MAX_NOISE_ROUNDS: usize = 16;

/// Number of suggestions offered for an unmatched file.
pub const SUGGESTION_LIMIT: usize = 5;

/// How a variation matched the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
  /// Equal texts
  Exact,
  /// Equal once whitespace is removed
  Compact,
  /// An input word equals the variation
  Word,
  /// The variation is a substring of the input
  Substring,
  /// Every word of the variation occurs in the input
  Phrase,
}

/// A variation that matched, with the subject it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
  /// The dictionary variation, as stored
  pub variation:   String,
  /// Key of the subject the variation maps to
  pub subject_key: String,
  /// Canonical subject name
  pub standard:    String,
  /// Which test accepted the match
  pub kind:        MatchKind,
}

/// A subject proposed for an unmatched file, ranked by shared words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
  /// Subject key
  pub subject_key: String,
  /// Canonical subject name
  pub standard:    String,
  /// Number of residual words the subject shares
  pub score:       usize,
}

/// Matches file name fragments against a [`KnowledgeStore`].
#[derive(Debug, Clone)]
pub struct Classifier {
  noise: Vec<Regex>,
}

impl Classifier {
  /// Compiles the noise patterns of `tables`, plus every branch abbreviation.
  pub fn new(tables: &Tables) -> Result<Self> {
    let mut noise =
      tables.noise.iter().map(|p| extract::tables::pattern(p)).collect::<Result<Vec<_>>>()?;
    for abbreviation in tables.branches.iter().flat_map(|group| &group.abbreviations) {
      let normalized = normalize_text(abbreviation);
      if !normalized.is_empty() {
        noise.push(extract::tables::literal(&normalized)?);
      }
    }
    debug!("Classifier compiled {} noise patterns", noise.len());
    Ok(Self { noise })
  }

  /// A classifier over the built-in tables.
  pub fn builtin() -> Result<Self> { Self::new(&Tables::default()) }

  /// A classifier over the configured tables.
  pub fn from_config(config: &Config) -> Result<Self> { Self::new(&Tables::from_config(config)?) }

  /// Every variation matching `fragment`, most specific first.
  ///
  /// `fragment` is usually a file name; a `.pdf` extension is ignored.
  pub fn classify(&self, store: &KnowledgeStore, fragment: &str) -> Vec<Match> {
    let text = normalize_text(file_stem(fragment));
    if text.is_empty() {
      return Vec::new();
    }
    let matches = match_text(store, &text);
    if !matches.is_empty() {
      return matches;
    }

    let residual = self.strip_noise(&text);
    if residual.is_empty() || residual == text {
      return Vec::new();
    }
    debug!("No match for {text:?}, retrying with residual {residual:?}");
    match_text(store, &residual)
  }

  /// Removes noise tokens from `text` until it stops changing.
  pub fn strip_noise(&self, text: &str) -> String {
    let mut current = normalize_text(text);
    for _ in 0..MAX_NOISE_ROUNDS {
      let stripped = self
        .noise
        .iter()
        .fold(current.clone(), |acc, re| re.replace_all(&acc, " ").into_owned());
      let stripped = normalize_text(&stripped);
      if stripped == current {
        break;
      }
      current = stripped;
    }
    current
  }

  /// The text a human would map for `fragment`: its residual, or the whole normalized fragment
  /// when stripping leaves nothing.
  pub fn residual(&self, fragment: &str) -> String {
    let text = normalize_text(file_stem(fragment));
    let residual = self.strip_noise(&text);
    if residual.is_empty() {
      text
    } else {
      residual
    }
  }

  /// Up to `limit` subjects sharing words with the residual of `fragment`.
  ///
  /// A subject's vocabulary is its key, its canonical name and every variation mapped to it.
  pub fn suggest(&self, store: &KnowledgeStore, fragment: &str, limit: usize) -> Vec<Suggestion> {
    let residual = self.residual(fragment);
    let wanted: BTreeSet<&str> = words(&residual).filter(|w| w.chars().count() > 1).collect();
    if wanted.is_empty() {
      return Vec::new();
    }

    let mut vocabulary: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    for (key, subject) in store.subjects() {
      let entry = vocabulary.entry(key.as_str()).or_default();
      entry.extend(words(&normalize_text(key)).map(str::to_string));
      entry.extend(words(&normalize_text(&subject.standard)).map(str::to_string));
    }
    for (variation, key) in store.variations() {
      if let Some(entry) = vocabulary.get_mut(key.as_str()) {
        entry.extend(words(&normalize_text(variation)).map(str::to_string));
      }
    }

    let mut suggestions: Vec<Suggestion> = vocabulary
      .into_iter()
      .filter_map(|(key, known)| {
        let score = wanted.iter().filter(|w| known.contains(**w)).count();
        (score > 0).then(|| Suggestion {
          subject_key: key.to_string(),
          standard: store.standard(key).unwrap_or(UNKNOWN).to_string(),
          score,
        })
      })
      .collect();
    suggestions.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.subject_key.cmp(&b.subject_key)));
    suggestions.truncate(limit);
    suggestions
  }
}

/// Single matching pass of normalized `text` over the whole dictionary.
pub fn match_text(store: &KnowledgeStore, text: &str) -> Vec<Match> {
  let text_compact = compact(text);
  let text_words: HashSet<&str> = words(text).collect();

  let mut matches: Vec<Match> = store
    .variations()
    .iter()
    .filter_map(|(variation, key)| {
      let normalized = normalize_text(variation);
      let kind = match_kind(&normalized, text, &text_compact, &text_words)?;
      let standard = store.standard(key)?;
      trace!("{variation:?} matched {text:?} as {kind:?}");
      Some(Match {
        variation: variation.clone(),
        subject_key: key.clone(),
        standard: standard.to_string(),
        kind,
      })
    })
    .collect();

  matches.sort_by(|a, b| {
    b.variation
      .chars()
      .count()
      .cmp(&a.variation.chars().count())
      .then(a.kind.cmp(&b.kind))
      .then_with(|| a.variation.cmp(&b.variation))
  });
  matches
}

/// The first test under which `variation` matches `text`.
fn match_kind(
  variation: &str,
  text: &str,
  text_compact: &str,
  text_words: &HashSet<&str>,
) -> Option<MatchKind> {
  if variation.is_empty() {
    return None;
  }
  if variation == text {
    return Some(MatchKind::Exact);
  }
  if compact(variation) == text_compact {
    return Some(MatchKind::Compact);
  }
  if text_words.contains(variation) {
    return Some(MatchKind::Word);
  }
  if text.contains(variation) {
    return Some(MatchKind::Substring);
  }
  let parts: Vec<&str> = words(variation).filter(|w| w.chars().count() > 1).collect();
  if parts.len() > 1 && parts.iter().all(|part| text.contains(part)) {
    return Some(MatchKind::Phrase);
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;

  fn store(entries: &[(&str, &str, &[&str])]) -> (KnowledgeStore, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let mut store = KnowledgeStore::load(dir.path());
    for (key, standard, variations) in entries {
      store.add_subject(key, standard).unwrap();
      for variation in *variations {
        store.add_variation(variation, key).unwrap();
      }
    }
    (store, dir)
  }

  fn kinds(matches: &[Match]) -> Vec<(&str, MatchKind)> {
    matches.iter().map(|m| (m.variation.as_str(), m.kind)).collect()
  }

  #[traced_test]
  #[test]
  fn test_reference_file_matches_physics() {
    let (store, _dir) = store(&[("PHY", "Engineering Physics", &["PHYSICS"])]);
    let classifier = Classifier::builtin().unwrap();
    let matches = classifier.classify(&store, "FE-BTECH_PHYSICS_SEM I_DEC 2016.pdf");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].subject_key, "PHY");
    assert_eq!(matches[0].standard, "Engineering Physics");
    assert_eq!(matches[0].kind, MatchKind::Word);
  }

  #[test]
  fn test_match_kinds() {
    let (store, _dir) = store(&[
      ("DS", "Data Structures", &["DATA STRUCTURES"]),
      ("OS", "Operating Systems", &["OPERATING SYSTEMS", "OS"]),
      ("CN", "Computer Networks", &["NETWORK"]),
    ]);
    let classifier = Classifier::builtin().unwrap();

    assert_eq!(kinds(&classifier.classify(&store, "data structures")), vec![(
      "DATA STRUCTURES",
      MatchKind::Exact
    )]);
    assert_eq!(kinds(&classifier.classify(&store, "DataStructures.pdf")), vec![(
      "DATA STRUCTURES",
      MatchKind::Compact
    )]);
    assert_eq!(kinds(&classifier.classify(&store, "OS_SEM5")), vec![("OS", MatchKind::Word)]);
    assert_eq!(kinds(&classifier.classify(&store, "NETWORKS 2019")), vec![(
      "NETWORK",
      MatchKind::Substring
    )]);
    assert_eq!(kinds(&classifier.classify(&store, "Systems-Operating 2019")), vec![(
      "OPERATING SYSTEMS",
      MatchKind::Phrase
    )]);
  }

  #[test]
  fn test_longest_variation_first() {
    let (store, _dir) =
      store(&[("DS", "Data Structures", &["DATA STRUCTURES"]), ("DB", "Databases", &["DATA"])]);
    let matches = Classifier::builtin().unwrap().classify(&store, "DATA STRUCTURES AND DATA");
    assert_eq!(matches.iter().map(|m| m.subject_key.as_str()).collect::<Vec<_>>(), vec![
      "DS", "DB"
    ]);
  }

  #[test]
  fn test_noise_pass_finds_residual_match() {
    let (store, _dir) = store(&[("AM3", "Applied Mathematics III", &["AM3"])]);
    let classifier = Classifier::builtin().unwrap();
    let matches = classifier.classify(&store, "AM 3 2019.pdf");
    assert_eq!(kinds(&matches), vec![("AM3", MatchKind::Compact)]);
  }

  #[test]
  fn test_strip_noise_to_fixed_point() {
    let classifier = Classifier::builtin().unwrap();
    assert_eq!(classifier.strip_noise("FE BTECH PHYSICS SEM I DEC 2016"), "PHYSICS");
    assert_eq!(classifier.strip_noise("COMPS DBMS END SEM QUESTION PAPER MAY 18"), "DBMS");
    assert_eq!(classifier.residual("2016.pdf"), "2016");
  }

  #[test]
  fn test_no_match_is_empty() {
    let (store, _dir) = store(&[("PHY", "Engineering Physics", &["PHYSICS"])]);
    let classifier = Classifier::builtin().unwrap();
    assert!(classifier.classify(&store, "CHEMISTRY SEM II.pdf").is_empty());
    assert!(classifier.classify(&store, ".pdf").is_empty());
  }

  #[test]
  fn test_classification_is_idempotent() {
    let (store, _dir) = store(&[
      ("DS", "Data Structures", &["DATA STRUCTURES", "DS", "DSA"]),
      ("DB", "Databases", &["DATA", "DBMS"]),
    ]);
    let classifier = Classifier::builtin().unwrap();
    let first = classifier.classify(&store, "DS DATA STRUCTURES DBMS");
    let second = classifier.classify(&store, "DS DATA STRUCTURES DBMS");
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
  }

  #[test]
  fn test_suggestions_rank_by_shared_words() {
    let (store, _dir) = store(&[
      ("AM1", "Applied Mathematics I", &["MATHS 1"]),
      ("AM2", "Applied Mathematics II", &["APPLIED MATHS II"]),
      ("PHY", "Engineering Physics", &["PHYSICS"]),
    ]);
    let classifier = Classifier::builtin().unwrap();
    let suggestions = classifier.suggest(&store, "APPLIED MATHS II KT 2019.pdf", SUGGESTION_LIMIT);
    assert_eq!(suggestions[0].subject_key, "AM2");
    assert_eq!(suggestions[0].score, 3);
    assert!(suggestions.iter().all(|s| s.subject_key != "PHY"));
    assert!(classifier.suggest(&store, "ZZZ.pdf", SUGGESTION_LIMIT).is_empty());
  }
}
