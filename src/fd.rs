//! Functional-dependency list handling.
//!
//! FDs are opaque strings here; the backend owns their semantics. These
//! helpers only parse, normalize and merge lists of them.

use serde_json::Value;
use std::collections::HashSet;

/// Parse an FD list given either as a JSON array of strings or as text with
/// one FD per `;`- or newline-separated entry. Blank entries are dropped.
pub fn parse_fd_list(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
        return items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.trim().to_string(),
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .filter(|s| !s.is_empty())
            .collect();
    }

    trimmed
        .split([';', '\r', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Concatenate lists, dropping blanks and repeats, keeping first occurrence.
pub fn merge_unique<'a, I, L>(lists: I) -> Vec<String>
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = &'a String>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for list in lists {
        for fd in list {
            let fd = fd.trim();
            if fd.is_empty() {
                continue;
            }
            if seen.insert(fd.to_string()) {
                out.push(fd.to_string());
            }
        }
    }
    out
}

/// Top-level FD list for a full recomputation. The first non-blank of the
/// closure-augmented list and the raw user list is sent as parsed; when it
/// yields nothing, or neither is given, every table's projection is merged.
pub fn select_top_level(
    with_closure: Option<&str>,
    raw: Option<&str>,
    per_table: &[&[String]],
) -> Vec<String> {
    let chosen = [with_closure, raw]
        .into_iter()
        .flatten()
        .find(|candidate| !candidate.trim().is_empty());
    let parsed = chosen.map(parse_fd_list).unwrap_or_default();
    if !parsed.is_empty() {
        return parsed;
    }
    merge_unique(per_table.iter().map(|fds| fds.iter()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_json_array() {
        assert_eq!(parse_fd_list(r#"[" A->B ", "", "C->D"]"#), strings(&["A->B", "C->D"]));
    }

    #[test]
    fn test_parse_separated_text() {
        assert_eq!(
            parse_fd_list("A->B; C->D\r\nE->F\n\n"),
            strings(&["A->B", "C->D", "E->F"])
        );
        assert!(parse_fd_list("   ").is_empty());
    }

    #[test]
    fn test_merge_keeps_first_occurrence() {
        let a = strings(&["A->B", " C->D "]);
        let b = strings(&["C->D", "", "E->F", "A->B"]);
        assert_eq!(merge_unique([&a, &b]), strings(&["A->B", "C->D", "E->F"]));
    }

    #[test]
    fn test_top_level_priority() {
        let t1 = strings(&["A->B"]);
        let t2 = strings(&["B->C", "A->B"]);
        let tables: [&[String]; 2] = [&t1, &t2];

        assert_eq!(
            select_top_level(Some("X->Y;Y->Z"), Some("A->B"), &tables),
            strings(&["X->Y", "Y->Z"])
        );
        assert_eq!(select_top_level(Some("  "), Some("A->B"), &tables), strings(&["A->B"]));
        assert_eq!(select_top_level(None, None, &tables), strings(&["A->B", "B->C"]));
    }

    #[test]
    fn test_top_level_user_list_sent_as_parsed() {
        let t1 = strings(&["A->B"]);
        let t2 = strings(&["B->C"]);
        let tables: [&[String]; 2] = [&t1, &t2];

        assert_eq!(
            select_top_level(None, Some("A --> B; A-->B"), &tables),
            strings(&["A --> B", "A-->B"])
        );
        // An empty closure list falls through to the merge, not to the raw list.
        assert_eq!(
            select_top_level(Some("[]"), Some("X->Y"), &tables),
            strings(&["A->B", "B->C"])
        );
    }
}
