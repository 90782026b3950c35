//! RIC (relational information content) matrices.
//!
//! Cells arrive from the backend either as JSON numbers or as numeric strings.
//! Anything that does not parse to a finite number is kept as "no value" so a
//! single bad cell only suppresses its own annotation.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Row-major matrix of RIC values. `None` marks a cell without a usable value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RicMatrix {
    rows: Vec<Vec<Option<f64>>>,
}

impl RicMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(finite).collect())
                .collect(),
        }
    }

    /// Build from an arbitrary JSON value. Non-arrays become an empty matrix.
    pub fn from_value(value: &Value) -> Self {
        let Value::Array(rows) = value else {
            if !value.is_null() {
                tracing::warn!("ric matrix is not an array; treating as empty");
            }
            return Self::default();
        };

        let rows = rows
            .iter()
            .map(|row| match row {
                Value::Array(cells) => cells.iter().map(cell_value).collect(),
                _ => Vec::new(),
            })
            .collect();

        Self { rows }
    }

    /// Parse a JSON text. Malformed input yields an empty matrix.
    pub fn from_json(text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value(&value),
            Err(err) => {
                tracing::warn!(error = %err, "ric matrix JSON parse failed");
                Self::default()
            }
        }
    }

    /// Value at `(row, col)`, or `None` when out of bounds or not a number.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.rows.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    pub fn has_row(&self, row: usize) -> bool {
        row < self.rows.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<'de> Deserialize<'de> for RicMatrix {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

fn cell_value(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(n) => n.as_f64().and_then(finite),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(finite),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_and_numeric_strings() {
        let m = RicMatrix::from_json(r#"[[0.5, "0.25"], [1, "1.0"]]"#);
        assert_eq!(m.row_count(), 2);
        assert_eq!(m.get(0, 0), Some(0.5));
        assert_eq!(m.get(0, 1), Some(0.25));
        assert_eq!(m.get(1, 1), Some(1.0));
    }

    #[test]
    fn test_invalid_cells_have_no_value() {
        let m = RicMatrix::from_json(r#"[["abc", null, "NaN", true]]"#);
        assert_eq!(m.get(0, 0), None);
        assert_eq!(m.get(0, 1), None);
        assert_eq!(m.get(0, 2), None);
        assert_eq!(m.get(0, 3), None);
    }

    #[test]
    fn test_out_of_bounds_reads() {
        let m = RicMatrix::new(vec![vec![0.1]]);
        assert_eq!(m.get(0, 1), None);
        assert_eq!(m.get(3, 0), None);
        assert!(m.has_row(0));
        assert!(!m.has_row(1));
    }

    #[test]
    fn test_malformed_json_is_empty() {
        assert!(RicMatrix::from_json("{not json").is_empty());
        assert!(RicMatrix::from_json(r#"{"a": 1}"#).is_empty());
        assert!(RicMatrix::from_json("").is_empty());
    }

    #[test]
    fn test_non_finite_inputs_are_dropped() {
        let m = RicMatrix::new(vec![vec![f64::NAN, f64::INFINITY, 0.3]]);
        assert_eq!(m.get(0, 0), None);
        assert_eq!(m.get(0, 1), None);
        assert_eq!(m.get(0, 2), Some(0.3));
    }
}
