//! Category enumeration for filter controls.

use papertrail_core::Note;
use std::collections::HashSet;

/// Distinct non-empty categories of `notes`, in first-seen order.
pub fn categories(notes: &[Note]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    notes
        .iter()
        .filter_map(|n| n.category.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty() && seen.insert(*c))
        .map(str::to_string)
        .collect()
}
