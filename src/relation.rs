//! The original (undecomposed) relation and its baseline RIC matrix.

use crate::ric::RicMatrix;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    #[error("Original table is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Original table must be an array of rows")]
    NotRows,
}

/// Read-only session context: the original rows plus the baseline RIC
/// values computed for them. `baseline_ric[r][c]` describes `rows[r][c]`.
#[derive(Debug, Clone, Default)]
pub struct OriginalRelation {
    rows: Vec<Vec<String>>,
    baseline_ric: RicMatrix,
}

impl OriginalRelation {
    pub fn new(rows: Vec<Vec<String>>, baseline_ric: RicMatrix) -> Self {
        Self { rows, baseline_ric }
    }

    /// Parse rows from a JSON array of arrays. Scalar cells are stringified,
    /// `null` becomes the empty string.
    pub fn try_from_json(text: &str) -> Result<Vec<Vec<String>>, RelationError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Array(rows) = value else {
            return Err(RelationError::NotRows);
        };
        Ok(rows
            .iter()
            .map(|row| match row {
                Value::Array(cells) => cells.iter().map(cell_text).collect(),
                _ => Vec::new(),
            })
            .collect())
    }

    /// Tolerant loader used by the page boundary: unreadable input yields an
    /// empty table instead of an error.
    pub fn from_json(rows_json: &str, ric_json: &str) -> Self {
        let rows = if rows_json.trim().is_empty() {
            Vec::new()
        } else {
            Self::try_from_json(rows_json).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "original table parse failed; using empty table");
                Vec::new()
            })
        };
        Self::new(rows, RicMatrix::from_json(ric_json))
    }

    /// Parse the manual-data text form: rows separated by `;`, cells by `,`.
    pub fn parse_manual_data(text: &str) -> Vec<Vec<String>> {
        text.split(';')
            .filter(|row| !row.trim().is_empty())
            .map(|row| row.split(',').map(|cell| cell.trim().to_string()).collect())
            .collect()
    }

    pub fn from_manual_data(text: &str, baseline_ric: RicMatrix) -> Self {
        Self::new(Self::parse_manual_data(text), baseline_ric)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn baseline_ric(&self) -> &RicMatrix {
        &self.baseline_ric
    }

    /// Width of the first row; every column index a group may hold is below it.
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell text, or `""` when the row is shorter than `col`.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map_or("", String::as_str)
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_data_trims_and_skips_empty_rows() {
        let rows = OriginalRelation::parse_manual_data(" a , 1 ;;b,2; ");
        assert_eq!(
            rows,
            vec![
                vec!["a".to_string(), "1".to_string()],
                vec!["b".to_string(), "2".to_string()],
            ]
        );
    }

    #[test]
    fn test_json_rows_stringify_scalars() {
        let rows = OriginalRelation::try_from_json(r#"[["a", 1, null, true]]"#).unwrap();
        assert_eq!(rows[0], vec!["a", "1", "", "true"]);
    }

    #[test]
    fn test_tolerant_loader_falls_back_to_empty() {
        let rel = OriginalRelation::from_json("not json", "[[0.5]]");
        assert_eq!(rel.row_count(), 0);
        assert_eq!(rel.column_count(), 0);
        assert_eq!(rel.baseline_ric().get(0, 0), Some(0.5));
    }

    #[test]
    fn test_missing_cells_read_as_empty() {
        let rel = OriginalRelation::from_manual_data("a,b,c;d", RicMatrix::default());
        assert_eq!(rel.column_count(), 3);
        assert_eq!(rel.cell(1, 0), "d");
        assert_eq!(rel.cell(1, 2), "");
        assert_eq!(rel.cell(9, 0), "");
    }

    #[test]
    fn test_non_array_is_rejected() {
        assert!(matches!(
            OriginalRelation::try_from_json(r#"{"rows": []}"#),
            Err(RelationError::NotRows)
        ));
    }
}
