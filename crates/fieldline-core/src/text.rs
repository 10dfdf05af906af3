//! Text folding for search and display labels.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Case- and diacritic-fold `input` and trim surrounding whitespace.
///
/// `"  Ação Élétrica "` folds to `"acao eletrica"`.
pub fn fold(input: &str) -> String {
  input
    .trim()
    .nfd()
    .filter(|c| !is_combining_mark(*c))
    .flat_map(char::to_lowercase)
    .collect()
}

/// `true` if any of `fields` contains the already-folded `needle`.
pub fn any_contains<'a>(
  fields: impl IntoIterator<Item = Option<&'a str>>,
  needle: &str,
) -> bool {
  fields
    .into_iter()
    .flatten()
    .any(|field| fold(field).contains(needle))
}

/// Turn an internal status identifier into a human label:
/// `in_progress` → `IN PROGRESS`.
pub fn status_label(status: &str) -> String {
  status
    .split(['_', '-'])
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
    .to_uppercase()
}
