/// Longest candidate that must match a column name exactly.
pub const SHORT_CANDIDATE_LEN: usize = 2;

/// Logical-to-physical column resolution for loosely named spreadsheet headers.
///
/// Names are compared after lowercasing and dropping spaces and underscores;
/// a column matches when its normalized name contains the normalized
/// candidate. Candidates of [`SHORT_CANDIDATE_LEN`] characters or fewer
/// (`"ht"`, `"id"`, `"h"`) only match a whole normalized name, so `"h"` never
/// lands on `area_ha`. Candidates are tried in order and, for each candidate,
/// columns are scanned in order, so the first candidate that hits anything wins.
pub fn resolve_column<'a, S: AsRef<str>>(columns: &'a [S], candidates: &[&str]) -> Option<&'a str> {
    let normalized: Vec<String> = columns.iter().map(|c| squash(c.as_ref())).collect();

    for candidate in candidates {
        let needle = squash(candidate);
        if needle.is_empty() {
            continue;
        }
        let short = needle.chars().count() <= SHORT_CANDIDATE_LEN;
        let hit = |name: &String| if short { *name == needle } else { name.contains(&needle) };
        if let Some(idx) = normalized.iter().position(hit) {
            return Some(columns[idx].as_ref());
        }
    }
    None
}

fn squash(name: &str) -> String {
    name.chars()
        .filter(|c| *c != ' ' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Case-insensitive substring test against any of `markers`.
pub(crate) fn contains_any(text: &str, markers: &[&str]) -> bool {
    let lower = text.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}
