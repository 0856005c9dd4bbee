//! Text normalization shared by matching, noise stripping and suggestions.

/// Upper-cases `text`, turns every non-alphanumeric character into a space and collapses runs of
/// whitespace.
pub fn normalize_text(text: &str) -> String {
  text
    .to_uppercase()
    .chars()
    .map(|c| if c.is_alphanumeric() { c } else { ' ' })
    .collect::<String>()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
}

/// `text` with all whitespace removed.
pub fn compact(text: &str) -> String { text.chars().filter(|c| !c.is_whitespace()).collect() }

/// The words of a normalized text.
pub fn words(text: &str) -> impl Iterator<Item = &str> { text.split(' ').filter(|w| !w.is_empty()) }

/// A subject key derived from a subject name: the initials of a multi-word name, or the whole
/// name for a single word.
///
/// ```
/// use pyq::classifier::normalize::derive_key;
///
/// assert_eq!(derive_key("Applied Mathematics I"), "AMI");
/// assert_eq!(derive_key("physics"), "PHYSICS");
/// ```
pub fn derive_key(name: &str) -> String {
  let normalized = normalize_text(name);
  let parts: Vec<&str> = words(&normalized).collect();
  match parts.as_slice() {
    [] => String::new(),
    [single] => single.to_string(),
    many => many.iter().filter_map(|w| w.chars().next()).collect(),
  }
}
