//! Core paper record and the facet sets aggregated from it.
//!
//! A [`Paper`] is created once per discovered PDF and never mutated afterwards. Every
//! classification field holds the [`UNKNOWN`] sentinel when its extractor finds nothing, so
//! consumers can filter on a single value rather than juggling `Option`s.
//!
//! # Examples
//!
//! ```
//! use pyq::paper::{Facets, Paper, UNKNOWN};
//!
//! let paper = Paper::new("PHYSICS.pdf", "http://host/2016/PHYSICS.pdf");
//! assert_eq!(paper.year, UNKNOWN);
//!
//! let mut facets = Facets::default();
//! facets.absorb(&paper);
//! assert!(facets.years.contains(UNKNOWN));
//! ```

use super::*;

/// Sentinel stored in any classification field that could not be inferred.
pub const UNKNOWN: &str = "Unknown";

/// A single discovered exam paper with its inferred metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
  /// File name as it appears in the listing (percent-decoded)
  pub file_name:        String,
  /// Absolute URL of the PDF on the listing server
  pub url:              String,
  /// Four-digit year, e.g. `2016`
  pub year:             String,
  /// Branch code, e.g. `COMMON` for first-year papers
  pub branch:           String,
  /// Semester number as a string, e.g. `1`
  pub semester:         String,
  /// Exam type label, e.g. `End Semester`
  pub exam_type:        String,
  /// The variation text that matched during classification
  pub subject:          String,
  /// Canonical subject name looked up from the knowledge store
  pub standard_subject: String,
}

impl Paper {
  /// Creates a paper with every classification field set to [`UNKNOWN`].
  pub fn new(file_name: impl Into<String>, url: impl Into<String>) -> Self {
    Self {
      file_name:        file_name.into(),
      url:              url.into(),
      year:             UNKNOWN.to_string(),
      branch:           UNKNOWN.to_string(),
      semester:         UNKNOWN.to_string(),
      exam_type:        UNKNOWN.to_string(),
      subject:          UNKNOWN.to_string(),
      standard_subject: UNKNOWN.to_string(),
    }
  }

  /// Returns a copy whose URL has `from` replaced by `to` as a prefix.
  ///
  /// Used when handing papers to consumers that reach the files through a proxy. Papers whose
  /// URL does not start with `from` are returned unchanged.
  pub fn rebased(&self, from: &str, to: &str) -> Self {
    let mut paper = self.clone();
    if let Some(rest) = self.url.strip_prefix(from) {
      paper.url = format!("{to}{rest}");
    }
    paper
  }

  /// The file name without its `.pdf` extension.
  pub fn stem(&self) -> &str { file_stem(&self.file_name) }
}

/// Strips a trailing `.pdf` extension (any case) from a file name.
pub fn file_stem(file_name: &str) -> &str {
  let len = file_name.len();
  if len > 4 && file_name.is_char_boundary(len - 4) && file_name[len - 4..].eq_ignore_ascii_case(".pdf")
  {
    &file_name[..len - 4]
  } else {
    file_name
  }
}

/// One of the deduplicated metadata dimensions aggregated over papers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
  /// [`Paper::year`]
  Year,
  /// [`Paper::branch`]
  Branch,
  /// [`Paper::exam_type`]
  ExamType,
  /// [`Paper::semester`]
  Semester,
  /// [`Paper::subject`]
  Subject,
  /// [`Paper::standard_subject`]
  StandardSubject,
}

impl Facet {
  /// All facets in their canonical order.
  pub const ALL: [Facet; 6] = [
    Facet::Year,
    Facet::Branch,
    Facet::ExamType,
    Facet::Semester,
    Facet::Subject,
    Facet::StandardSubject,
  ];

  /// Reads this facet's value off a paper.
  pub fn of<'a>(&self, paper: &'a Paper) -> &'a str {
    match self {
      Facet::Year => &paper.year,
      Facet::Branch => &paper.branch,
      Facet::ExamType => &paper.exam_type,
      Facet::Semester => &paper.semester,
      Facet::Subject => &paper.subject,
      Facet::StandardSubject => &paper.standard_subject,
    }
  }
}

/// Deduplicated facet values, as stored in the flat collection and at every tree node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
  /// Distinct years
  pub years:             BTreeSet<String>,
  /// Distinct branches
  pub branches:          BTreeSet<String>,
  /// Distinct exam types
  pub exam_types:        BTreeSet<String>,
  /// Distinct semesters
  pub semesters:         BTreeSet<String>,
  /// Distinct raw subject variations
  pub subjects:          BTreeSet<String>,
  /// Distinct canonical subjects
  pub standard_subjects: BTreeSet<String>,
}

impl Facets {
  /// Mutable access to the set backing `facet`.
  pub fn set_mut(&mut self, facet: Facet) -> &mut BTreeSet<String> {
    match facet {
      Facet::Year => &mut self.years,
      Facet::Branch => &mut self.branches,
      Facet::ExamType => &mut self.exam_types,
      Facet::Semester => &mut self.semesters,
      Facet::Subject => &mut self.subjects,
      Facet::StandardSubject => &mut self.standard_subjects,
    }
  }

  /// Shared access to the set backing `facet`.
  pub fn set(&self, facet: Facet) -> &BTreeSet<String> {
    match facet {
      Facet::Year => &self.years,
      Facet::Branch => &self.branches,
      Facet::ExamType => &self.exam_types,
      Facet::Semester => &self.semesters,
      Facet::Subject => &self.subjects,
      Facet::StandardSubject => &self.standard_subjects,
    }
  }

  /// Adds every facet value of `paper`. Returns `true` if anything new was inserted.
  pub fn absorb(&mut self, paper: &Paper) -> bool {
    let mut changed = false;
    for facet in Facet::ALL {
      changed |= self.set_mut(facet).insert(facet.of(paper).to_string());
    }
    changed
  }

  /// Unions `other` into `self`.
  pub fn merge(&mut self, other: &Facets) {
    for facet in Facet::ALL {
      self.set_mut(facet).extend(other.set(facet).iter().cloned());
    }
  }
}
