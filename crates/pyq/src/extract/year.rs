//! Year rules.

use super::*;

lazy_static! {
  static ref FOUR_DIGIT_YEAR: Regex = Regex::new(r"(?:^|\D)(20\d{2})(?:\D|$)").unwrap();
}

/// Year rules in priority order.
pub(super) const RULES: &[Rule] = &[
  ("path segment", path_segment),
  ("file name digits", file_name_digits),
  ("academic-year label", academic_year_label),
  ("month segment", month_segment),
];

/// Accepts `year` if it parses and lies in the configured range.
fn accept(extractor: &Extractor, year: &str) -> Option<String> {
  let parsed: u32 = year.parse().ok()?;
  extractor.years.contains(parsed).then(|| parsed.to_string())
}

/// A path segment that is exactly `20NN`, ignoring whitespace (`/2 0 1 6/`).
fn path_segment(extractor: &Extractor, target: &Target) -> Option<String> {
  target.segments.iter().find_map(|segment| {
    let compact: String = segment.chars().filter(|c| !c.is_whitespace()).collect();
    (compact.len() == 4 && compact.starts_with("20") && compact.chars().all(|c| c.is_ascii_digit()))
      .then(|| accept(extractor, &compact))
      .flatten()
  })
}

/// A standalone `20NN` digit run in the file name.
fn file_name_digits(extractor: &Extractor, target: &Target) -> Option<String> {
  FOUR_DIGIT_YEAR
    .captures_iter(&target.file)
    .find_map(|captures| captures.get(1).and_then(|m| accept(extractor, m.as_str())))
}

/// A known academic-year label somewhere in the file name.
fn academic_year_label(extractor: &Extractor, target: &Target) -> Option<String> {
  extractor
    .tables
    .academic_years
    .iter()
    .find(|(label, _)| target.file.contains(label.as_str()))
    .and_then(|(_, year)| accept(extractor, year))
}

/// A path segment naming a month with a two- or four-digit year (`DEC 2016`, `MAY-17`).
fn month_segment(extractor: &Extractor, target: &Target) -> Option<String> {
  target.segments.iter().find_map(|segment| {
    let digits = extractor.tables.month_year.captures(segment)?.get(1)?.as_str();
    if digits.len() == 2 {
      accept(extractor, &format!("20{digits}"))
    } else {
      accept(extractor, digits)
    }
  })
}
