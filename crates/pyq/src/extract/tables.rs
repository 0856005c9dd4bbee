//! Pattern tables loaded from TOML and compiled once per run.

use super::*;

/// The built-in tables shipped with the crate.
const DEFAULT_TABLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config/tables.toml"));

/// Raw, deserialized pattern tables.
///
/// See `config/tables.toml` for the format. Patterns are regular expressions except for branch
/// abbreviations, which are literals.
#[derive(Debug, Clone, Deserialize)]
pub struct Tables {
  /// Branch forced for first-year papers
  pub common_branch:       String,
  /// Branch forced by postgraduate markers
  pub postgraduate_branch: String,
  /// Exam type forced by re-exam markers
  pub end_semester:        String,
  /// Patterns identifying first-year papers
  pub first_year:          Vec<String>,
  /// Patterns identifying re-exam papers
  pub re_exam:             Vec<String>,
  /// Patterns identifying postgraduate papers
  pub postgraduate:        Vec<String>,
  /// Patterns identifying undergraduate papers of unknown branch
  pub undergrad:           Vec<String>,
  /// Month name prefixes, used for `DEC 2016` style path segments
  pub months:              Vec<String>,
  /// Branch abbreviation groups, in priority order
  pub branches:            Vec<BranchGroup>,
  /// Roman numeral (or other label) to semester number
  #[serde(default)]
  pub semester_numerals:   BTreeMap<String, String>,
  /// Direct semester patterns
  #[serde(default)]
  pub semesters:           Vec<PatternValue>,
  /// Exam type patterns
  #[serde(default)]
  pub exam_types:          Vec<PatternValue>,
  /// Last-resort exam type substrings
  #[serde(default)]
  pub exam_fallbacks:      Vec<SubstringValue>,
  /// Academic-year labels
  #[serde(default)]
  pub academic_years:      Vec<AcademicYear>,
  /// Noise patterns stripped by the classifier's second pass
  #[serde(default)]
  pub noise:               Vec<String>,
}

/// A branch with its abbreviations.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchGroup {
  /// Branch code produced on a match
  pub branch:        String,
  /// Literal abbreviations, matched on word boundaries
  pub abbreviations: Vec<String>,
  /// Generic groups (B.Tech, COMMON, M.Tech) are skipped by the re-exam search
  #[serde(default)]
  pub generic:       bool,
}

/// A pattern and the value it produces.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternValue {
  /// Regular expression
  pub pattern: String,
  /// Resulting value
  pub value:   String,
}

/// A substring and the value it produces.
#[derive(Debug, Clone, Deserialize)]
pub struct SubstringValue {
  /// Upper-case substring
  pub contains: String,
  /// Resulting value
  pub value:    String,
}

/// Labels that stand for a given year.
#[derive(Debug, Clone, Deserialize)]
pub struct AcademicYear {
  /// Four-digit year
  pub year:   String,
  /// Upper-case labels
  pub labels: Vec<String>,
}

impl Default for Tables {
  fn default() -> Self {
    toml::from_str(DEFAULT_TABLES).expect("built-in tables.toml is valid")
  }
}

impl Tables {
  /// Parses tables from a TOML string.
  pub fn from_toml(toml_str: &str) -> Result<Self> { Ok(toml::from_str(toml_str)?) }

  /// Reads tables from a TOML file.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    debug!("Loading pattern tables from {}", path.display());
    Self::from_toml(&std::fs::read_to_string(path)?)
  }

  /// The configured override tables, or the built-in ones.
  pub fn from_config(config: &Config) -> Result<Self> {
    match &config.tables {
      Some(path) => Self::from_file(path),
      None => Ok(Self::default()),
    }
  }
}

/// Compiles a table pattern into a case-insensitive regex.
pub(crate) fn pattern(raw: &str) -> Result<Regex> { Ok(Regex::new(&format!("(?i){raw}"))?) }

/// Compiles a literal abbreviation, escaped, into a word-bounded case-insensitive regex.
pub(crate) fn literal(raw: &str) -> Result<Regex> {
  Ok(Regex::new(&format!(r"(?i)\b{}\b", regex::escape(raw.trim())))?)
}

/// Compiles every pattern of a list.
fn patterns(raw: &[String]) -> Result<Vec<Regex>> { raw.iter().map(|p| pattern(p)).collect() }

/// A branch group with compiled abbreviations.
#[derive(Debug, Clone)]
pub(crate) struct CompiledBranch {
  pub branch:   String,
  pub generic:  bool,
  pub patterns: Vec<Regex>,
}

/// Tables in matching form.
#[derive(Debug, Clone)]
pub(crate) struct CompiledTables {
  pub common_branch:       String,
  pub postgraduate_branch: String,
  pub end_semester:        String,
  pub first_year:          Vec<Regex>,
  pub re_exam:             Vec<Regex>,
  pub postgraduate:        Vec<Regex>,
  pub undergrad:           Vec<Regex>,
  pub month_year:          Regex,
  pub branches:            Vec<CompiledBranch>,
  pub semester_marker:     Regex,
  pub semester_numerals:   BTreeMap<String, String>,
  pub semesters:           Vec<(Regex, String)>,
  pub exam_types:          Vec<(Regex, String)>,
  pub exam_fallbacks:      Vec<(String, String)>,
  pub academic_years:      Vec<(String, String)>,
}

impl CompiledTables {
  pub fn compile(tables: &Tables) -> Result<Self> {
    let months =
      tables.months.iter().map(|m| regex::escape(&m.to_uppercase())).collect::<Vec<_>>().join("|");
    let month_year = pattern(&format!(r"\b(?:{months})[A-Z]*[\s\-'.,]*(\d{{4}}|\d{{2}})\b"))?;

    let branches = tables
      .branches
      .iter()
      .map(|group| {
        Ok(CompiledBranch {
          branch:   group.branch.clone(),
          generic:  group.generic,
          patterns: group.abbreviations.iter().map(|a| literal(a)).collect::<Result<_>>()?,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    let pairs = |entries: &[PatternValue]| -> Result<Vec<(Regex, String)>> {
      entries.iter().map(|e| Ok((pattern(&e.pattern)?, e.value.clone()))).collect()
    };

    Ok(Self {
      common_branch: tables.common_branch.clone(),
      postgraduate_branch: tables.postgraduate_branch.clone(),
      end_semester: tables.end_semester.clone(),
      first_year: patterns(&tables.first_year)?,
      re_exam: patterns(&tables.re_exam)?,
      postgraduate: patterns(&tables.postgraduate)?,
      undergrad: patterns(&tables.undergrad)?,
      month_year,
      branches,
      semester_marker: pattern(r"\bSEM(?:ESTER)?[\s.\-]*([IVX]+|\d{1,2})\b")?,
      semester_numerals: tables
        .semester_numerals
        .iter()
        .map(|(k, v)| (k.to_uppercase(), v.clone()))
        .collect(),
      semesters: pairs(&tables.semesters)?,
      exam_types: pairs(&tables.exam_types)?,
      exam_fallbacks: tables
        .exam_fallbacks
        .iter()
        .map(|f| (f.contains.to_uppercase(), f.value.clone()))
        .collect(),
      academic_years: tables
        .academic_years
        .iter()
        .flat_map(|y| y.labels.iter().map(|l| (l.to_uppercase(), y.year.clone())))
        .collect(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_builtin_tables_compile() {
    let tables = Tables::default();
    assert_eq!(tables.common_branch, "COMMON");
    assert!(tables.branches.iter().any(|b| b.generic));
    let compiled = CompiledTables::compile(&tables).unwrap();
    assert_eq!(compiled.branches.len(), tables.branches.len());
    assert_eq!(compiled.semester_numerals.get("IV").map(String::as_str), Some("4"));
  }

  #[test]
  fn test_builtin_noise_is_loaded() {
    let tables = Tables::default();
    assert!(!tables.noise.is_empty());
    assert!(!tables.academic_years.is_empty());
    let noise = patterns(&tables.noise).unwrap();
    assert!(noise.iter().any(|re| re.is_match("SEM II")));
    assert!(noise.iter().any(|re| re.is_match("DEC 2016")));
  }

  #[test]
  fn test_literal_is_escaped() {
    let re = literal("M.TECH").unwrap();
    assert!(re.is_match("M.TECH SEM II"));
    assert!(!re.is_match("MXTECH"));
    // An abbreviation full of metacharacters must still compile.
    assert!(literal("C++ (OOP)").is_ok());
    assert!(literal("E&TC").unwrap().is_match("BE E&TC 2019"));
  }

  #[test]
  fn test_bad_pattern_is_an_error() {
    let mut tables = Tables::default();
    tables.first_year.push("(unclosed".into());
    assert!(matches!(CompiledTables::compile(&tables), Err(PyqError::Regex(_))));
  }
}
