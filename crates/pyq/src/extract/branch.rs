//! Branch rules.
//!
//! The first-year check runs first and overrides every other signal: first-year papers are shared
//! by all branches. Re-exam papers get a restricted search that skips the generic groups, since
//! re-exam folders are usually labelled with a generic degree name that would otherwise
//! short-circuit the lookup.

use super::*;

/// Branch rules in priority order.
pub(super) const RULES: &[Rule] = &[
  ("first year", first_year),
  ("postgraduate", postgraduate),
  ("re-exam restricted search", re_exam_search),
  ("abbreviation table", table_search),
  ("undergraduate fallback", undergrad_fallback),
];

fn first_year(extractor: &Extractor, target: &Target) -> Option<String> {
  extractor.is_first_year(target).then(|| extractor.tables.common_branch.clone())
}

fn postgraduate(extractor: &Extractor, target: &Target) -> Option<String> {
  let tables = &extractor.tables;
  target
    .texts()
    .any(|text| tables.postgraduate.iter().any(|re| re.is_match(text)))
    .then(|| tables.postgraduate_branch.clone())
}

fn re_exam_search(extractor: &Extractor, target: &Target) -> Option<String> {
  if !extractor.is_re_exam(target) {
    return None;
  }
  search(extractor, target, false)
}

fn table_search(extractor: &Extractor, target: &Target) -> Option<String> {
  search(extractor, target, true)
}

fn undergrad_fallback(extractor: &Extractor, target: &Target) -> Option<String> {
  let tables = &extractor.tables;
  target
    .texts()
    .any(|text| tables.undergrad.iter().any(|re| re.is_match(text)))
    .then(|| tables.common_branch.clone())
}

/// Searches the file name, then each path segment deepest first, for the first branch group with
/// a matching abbreviation.
fn search(extractor: &Extractor, target: &Target, include_generic: bool) -> Option<String> {
  target.texts().find_map(|text| {
    extractor
      .tables
      .branches
      .iter()
      .filter(|group| include_generic || !group.generic)
      .find(|group| group.patterns.iter().any(|re| re.is_match(text)))
      .map(|group| group.branch.clone())
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn extractor() -> Extractor { Extractor::builtin(2000, 2025).unwrap() }

  #[test]
  fn test_first_year_overrides_everything() {
    let e = extractor();
    assert_eq!(e.branch("/", "FE-BTECH_PHYSICS_SEM I_DEC 2016.pdf"), "COMMON");
    assert_eq!(e.branch("/FIRST YEAR/COMPS/", "MATHS.pdf"), "COMMON");
    assert_eq!(e.branch("/papers/F.E/", "M.TECH_MECH.pdf"), "COMMON");
  }

  #[test]
  fn test_postgraduate() {
    let e = extractor();
    assert_eq!(e.branch("/", "MTECH_COMPS_DSA.pdf"), "MTECH");
    assert_eq!(e.branch("/M.Tech/2019/", "ADVANCED DSA.pdf"), "MTECH");
  }

  #[test]
  fn test_re_exam_restricted_search_finds_branch() {
    let e = extractor();
    // The generic COMMON/BTECH group would otherwise match the deepest folder first.
    assert_eq!(e.branch("/COMPS/RE EXAM/BTECH/", "DBMS.pdf"), "COMPS");
    assert_eq!(e.branch("/COMPS/EXAM/BTECH/", "DBMS.pdf"), "COMMON");
    assert_eq!(e.branch("/BTECH RE-EXAM/", "SEM V EXTC.pdf"), "EXTC");
    assert_eq!(e.branch("/RE-EXAM/IT/", "DBMS.pdf"), "IT");
  }

  #[test]
  fn test_table_search_prefers_file_name() {
    let e = extractor();
    assert_eq!(e.branch("/CIVIL/", "COMPS_OS.pdf"), "COMPS");
    assert_eq!(e.branch("/CIVIL/2018/", "SURVEYING.pdf"), "CIVIL");
    assert_eq!(e.branch("/", "Information_Technology_SEM5.pdf"), "IT");
  }

  #[test]
  fn test_word_boundaries() {
    let e = extractor();
    // `IT` inside a word and `CHEM` inside `CHEMISTRY` must not match.
    assert_eq!(e.branch("/", "DIGITAL CHEMISTRY.pdf"), UNKNOWN);
  }

  #[test]
  fn test_undergrad_fallback_and_unknown() {
    let e = extractor();
    assert_eq!(e.branch("/", "B TECH MISC.pdf"), "COMMON");
    assert_eq!(e.branch("/misc/", "random.pdf"), UNKNOWN);
  }
}
