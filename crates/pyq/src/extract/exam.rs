//! Exam type rules.

use super::*;

/// Exam type rules in priority order.
pub(super) const RULES: &[Rule] = &[
  ("re-exam path", re_exam_path),
  ("exam table", table),
  ("file name fallbacks", fallbacks),
];

/// Re-exams are sat in place of the end-semester exam.
fn re_exam_path(extractor: &Extractor, target: &Target) -> Option<String> {
  let tables = &extractor.tables;
  target
    .segments
    .iter()
    .any(|segment| tables.re_exam.iter().any(|re| re.is_match(segment)))
    .then(|| tables.end_semester.clone())
}

fn table(extractor: &Extractor, target: &Target) -> Option<String> {
  target.texts().find_map(|text| {
    extractor.tables.exam_types.iter().find(|(re, _)| re.is_match(text)).map(|(_, v)| v.clone())
  })
}

fn fallbacks(extractor: &Extractor, target: &Target) -> Option<String> {
  extractor
    .tables
    .exam_fallbacks
    .iter()
    .find(|(needle, _)| target.file.contains(needle.as_str()))
    .map(|(_, value)| value.clone())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn extractor() -> Extractor { Extractor::builtin(2000, 2025).unwrap() }

  #[test]
  fn test_re_exam_path_forces_end_semester() {
    let e = extractor();
    assert_eq!(e.exam_type("/2019/RE EXAM/", "DBMS MID SEM.pdf"), "End Semester");
    assert_eq!(e.exam_type("/2019/re-exam/", "DBMS.pdf"), "End Semester");
  }

  #[test]
  fn test_table_over_file_then_path() {
    let e = extractor();
    assert_eq!(e.exam_type("/END SEM/", "DBMS MID-SEM.pdf"), "Mid Semester");
    assert_eq!(e.exam_type("/2019/ENDSEM/", "DBMS.pdf"), "End Semester");
    assert_eq!(e.exam_type("/", "OS CA-2.pdf"), "Continuous Assessment");
  }

  #[test]
  fn test_fallbacks() {
    let e = extractor();
    assert_eq!(e.exam_type("/", "END COURSE EXAM DBMS.pdf"), "End Semester");
    assert_eq!(e.exam_type("/", "Unit_Test_2 DBMS.pdf"), "Continuous Assessment");
    assert_eq!(e.exam_type("/", "CYCLE TEST 1.pdf"), "Continuous Assessment");
    assert_eq!(e.exam_type("/", "DBMS.pdf"), UNKNOWN);
  }
}
