//! Semester rules.

use super::*;

/// Semester rules in priority order.
pub(super) const RULES: &[Rule] = &[
  ("SEM marker", marker),
  ("label table", label_table),
  ("first year default", first_year_default),
];

/// `SEM I`, `SEMESTER-4`, `SEM.VII` in the file name, mapped through the numeral table.
fn marker(extractor: &Extractor, target: &Target) -> Option<String> {
  let tables = &extractor.tables;
  tables.semester_marker.captures_iter(&target.file).find_map(|captures| {
    let label = captures.get(1)?.as_str().to_uppercase();
    if let Some(value) = tables.semester_numerals.get(&label) {
      return Some(value.clone());
    }
    match label.parse::<u8>() {
      Ok(n @ 1..=8) => Some(n.to_string()),
      _ => None,
    }
  })
}

/// Direct label patterns (`FIRST SEM`, `3RD SEMESTER`) over the file name, then the path.
fn label_table(extractor: &Extractor, target: &Target) -> Option<String> {
  target.texts().find_map(|text| {
    extractor.tables.semesters.iter().find(|(re, _)| re.is_match(text)).map(|(_, v)| v.clone())
  })
}

fn first_year_default(extractor: &Extractor, target: &Target) -> Option<String> {
  extractor.is_first_year(target).then(|| "1".to_string())
}
