//! Locale-aware title comparison.
//!
//! Titles compare the way a human-facing list sorts them: first by letters
//! with case and accents ignored, then accents, then case (lowercase first).
//! `"apple" < "Banana" < "Cherry"` and `"cote" < "côte" < "Côte"`.

use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Primary collation key: decomposed, combining marks removed, lowercased.
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Compare two titles.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    fold(a)
        .cmp(&fold(b))
        .then_with(|| compare_accents(a, b))
        .then_with(|| compare_case(a, b))
        .then_with(|| a.cmp(b))
}

// Secondary level: with case removed but accents kept, unaccented sorts first.
fn compare_accents(a: &str, b: &str) -> Ordering {
    let marks = |s: &str| -> Vec<bool> { s.nfd().map(is_combining_mark).collect() };
    marks(a).cmp(&marks(b))
}

// Tertiary level: lowercase before uppercase at the first differing position.
fn compare_case(a: &str, b: &str) -> Ordering {
    let upper = |s: &str| -> Vec<bool> { s.nfd().map(char::is_uppercase).collect() };
    upper(a).cmp(&upper(b))
}
