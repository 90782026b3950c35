//! Projection of the original rows onto a column subset.
//!
//! Tuples are compared structurally, so cell values containing `,`, `;` or `|`
//! never collide with each other.

use crate::relation::OriginalRelation;
use std::collections::HashMap;
use std::collections::HashSet;

pub type Tuple = Vec<String>;

/// Pick the cells at `columns` out of `row`. Missing cells become `""`.
pub fn project_row(row: &[String], columns: &[usize]) -> Tuple {
    columns
        .iter()
        .map(|&c| row.get(c).cloned().unwrap_or_default())
        .collect()
}

/// Deduplicated projection in first-occurrence order.
pub fn project_rows(rows: &[Vec<String>], columns: &[usize]) -> Vec<Tuple> {
    if columns.is_empty() {
        return Vec::new();
    }

    let mut seen: HashSet<Tuple> = HashSet::new();
    let mut out = Vec::new();
    for row in rows {
        let tuple = project_row(row, columns);
        if seen.insert(tuple.clone()) {
            out.push(tuple);
        }
    }
    out
}

pub fn project(relation: &OriginalRelation, columns: &[usize]) -> Vec<Tuple> {
    project_rows(relation.rows(), columns)
}

/// Map each distinct tuple to the index of its first occurrence.
pub fn first_occurrence<I>(tuples: I) -> HashMap<Tuple, usize>
where
    I: IntoIterator<Item = Tuple>,
{
    let mut index = HashMap::new();
    for (i, tuple) in tuples.into_iter().enumerate() {
        index.entry(tuple).or_insert(i);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ric::RicMatrix;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_scenario_a_dedup() {
        let rel = OriginalRelation::new(
            rows(&[&["a", "1", "x"], &["a", "2", "x"], &["b", "1", "y"]]),
            RicMatrix::default(),
        );
        let projected = project(&rel, &[0, 2]);
        assert_eq!(projected, rows(&[&["a", "x"], &["b", "y"]]));
    }

    #[test]
    fn test_projection_is_repeatable() {
        let data = rows(&[&["a", "1"], &["b", "1"], &["a", "1"], &["c", "2"]]);
        let first = project_rows(&data, &[1, 0]);
        let second = project_rows(&data, &[1, 0]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_distinct_count_and_first_positions() {
        let data = rows(&[&["x", "1"], &["y", "1"], &["x", "2"], &["y", "3"], &["z", "1"]]);
        let projected = project_rows(&data, &[0]);
        assert_eq!(projected, rows(&[&["x"], &["y"], &["z"]]));
    }

    #[test]
    fn test_empty_columns_project_to_nothing() {
        let data = rows(&[&["a"], &["b"]]);
        assert!(project_rows(&data, &[]).is_empty());
    }

    #[test]
    fn test_short_rows_pad_with_empty() {
        let data = rows(&[&["a", "b"], &["c"]]);
        assert_eq!(project_rows(&data, &[1]), rows(&[&["b"], &[""]]));
    }

    #[test]
    fn test_delimiters_inside_cells_do_not_collide() {
        let data = rows(&[&["a|b", "c"], &["a", "b|c"]]);
        assert_eq!(project_rows(&data, &[0, 1]).len(), 2);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let index = first_occurrence(rows(&[&["a"], &["b"], &["a"]]));
        assert_eq!(index[&vec!["a".to_string()]], 0);
        assert_eq!(index[&vec!["b".to_string()]], 1);
    }
}
