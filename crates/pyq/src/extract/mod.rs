//! Metadata extraction from paths and file names.
//!
//! Each field (year, branch, semester, exam type) is inferred by its own ordered list of
//! [`Rule`]s. A rule is an independent predicate that either produces a value or passes; the first
//! rule that produces a value wins, and when none do the field is [`UNKNOWN`]. Keeping the rules
//! as data makes the priority order explicit and lets every rule be tested with a literal file
//! name.
//!
//! All extractors read the same [`Target`], a normalized view of the path and file name:
//! upper-cased, percent-decoded, with `_` and `+` turned into spaces and the `.pdf` extension
//! dropped.
//!
//! # Examples
//!
//! ```
//! use pyq::{extract::Extractor, paper::UNKNOWN};
//!
//! let extractor = Extractor::builtin(2000, 2025).unwrap();
//! let fields = extractor.extract("/papers/2 0 1 6/", "FE-BTECH_PHYSICS_SEM I_DEC 2016.pdf");
//! assert_eq!(fields.year, "2016");
//! assert_eq!(fields.branch, "COMMON");
//! assert_eq!(fields.semester, "1");
//! assert_eq!(fields.exam_type, UNKNOWN);
//! ```

use super::*;

mod branch;
mod exam;
mod semester;
pub mod tables;
mod year;

pub use tables::Tables;
pub(crate) use tables::CompiledTables;

use crate::config::YearRange;

/// A named extraction rule: returns a value or passes to the next rule.
pub type Rule = (&'static str, fn(&Extractor, &Target) -> Option<String>);

/// Normalized view of a path and file name that all rules read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
  /// Normalized file name without extension
  pub file:     String,
  /// Normalized path segments, deepest first
  pub segments: Vec<String>,
  /// Segments as they appeared (percent-decoded), deepest first
  pub raw:      Vec<String>,
}

impl Target {
  /// Builds the view for a directory path (a URL path or plain path) and a file name.
  pub fn new(path: &str, file_name: &str) -> Self {
    let raw: Vec<String> = path
      .split('/')
      .filter(|s| !s.trim().is_empty())
      .map(|s| urlencoding::decode(s).map(|d| d.into_owned()).unwrap_or_else(|_| s.to_string()))
      .rev()
      .collect();
    let segments = raw.iter().map(|s| normalize(s)).collect();
    let file_name =
      urlencoding::decode(file_name).map(|d| d.into_owned()).unwrap_or_else(|_| file_name.into());
    Self { file: normalize(file_stem(&file_name)), segments, raw }
  }

  /// The file name followed by every path segment.
  pub fn texts(&self) -> impl Iterator<Item = &str> {
    std::iter::once(self.file.as_str()).chain(self.segments.iter().map(String::as_str))
  }
}

/// Upper-cases `text`, turns `_` and `+` into spaces and collapses whitespace.
pub fn normalize(text: &str) -> String {
  text
    .to_uppercase()
    .replace(['_', '+'], " ")
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
}

/// The four extracted fields of a paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
  /// See [`Paper::year`]
  pub year:      String,
  /// See [`Paper::branch`]
  pub branch:    String,
  /// See [`Paper::semester`]
  pub semester:  String,
  /// See [`Paper::exam_type`]
  pub exam_type: String,
}

/// Runs the year, branch, semester and exam type rule lists.
#[derive(Debug, Clone)]
pub struct Extractor {
  /// Compiled pattern tables
  pub(crate) tables: CompiledTables,
  /// Years outside this range are rejected by every year rule
  pub(crate) years:  YearRange,
}

impl Extractor {
  /// Compiles `tables` for use with the given year range.
  pub fn new(tables: &Tables, years: YearRange) -> Result<Self> {
    Ok(Self { tables: CompiledTables::compile(tables)?, years })
  }

  /// An extractor over the built-in tables.
  pub fn builtin(min_year: u32, max_year: u32) -> Result<Self> {
    Self::new(&Tables::default(), YearRange { min: min_year, max: max_year })
  }

  /// Loads the configured tables (or the built-in ones) and the configured year range.
  pub fn from_config(config: &Config) -> Result<Self> {
    Self::new(&Tables::from_config(config)?, config.years)
  }

  /// Runs every extractor on `path` and `file_name`.
  pub fn extract(&self, path: &str, file_name: &str) -> Extraction {
    let target = Target::new(path, file_name);
    Extraction {
      year:      self.run("year", year::RULES, &target),
      branch:    self.run("branch", branch::RULES, &target),
      semester:  self.run("semester", semester::RULES, &target),
      exam_type: self.run("exam type", exam::RULES, &target),
    }
  }

  /// Year of the paper, or [`UNKNOWN`].
  pub fn year(&self, path: &str, file_name: &str) -> String {
    self.run("year", year::RULES, &Target::new(path, file_name))
  }

  /// Branch of the paper, or [`UNKNOWN`].
  pub fn branch(&self, path: &str, file_name: &str) -> String {
    self.run("branch", branch::RULES, &Target::new(path, file_name))
  }

  /// Semester of the paper, or [`UNKNOWN`].
  pub fn semester(&self, path: &str, file_name: &str) -> String {
    self.run("semester", semester::RULES, &Target::new(path, file_name))
  }

  /// Exam type of the paper, or [`UNKNOWN`].
  pub fn exam_type(&self, path: &str, file_name: &str) -> String {
    self.run("exam type", exam::RULES, &Target::new(path, file_name))
  }

  /// Whether the file name or any path segment marks a first-year paper.
  pub fn is_first_year(&self, target: &Target) -> bool {
    target.texts().any(|text| self.tables.first_year.iter().any(|re| re.is_match(text)))
  }

  /// Whether the file name or any path segment carries a re-exam marker.
  pub(crate) fn is_re_exam(&self, target: &Target) -> bool {
    target.texts().any(|text| self.tables.re_exam.iter().any(|re| re.is_match(text)))
  }

  /// Applies `rules` in order and returns the first value produced.
  fn run(&self, field: &str, rules: &[Rule], target: &Target) -> String {
    for (name, rule) in rules {
      if let Some(value) = rule(self, target) {
        trace!("{field} = {value:?} via rule `{name}` for {:?}", target.file);
        return value;
      }
    }
    trace!("{field} unknown for {:?}", target.file);
    UNKNOWN.to_string()
  }
}
