//! Backend payloads.
//!
//! Responses are decoded leniently: a missing or ill-typed field becomes its
//! empty default instead of failing the whole body.

use crate::ric::RicMatrix;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectFdsRequest {
    pub columns: Vec<usize>,
}

/// Projected FDs come back under `projectedFDs`, or `fds` on older routes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectFdsResponse {
    #[serde(rename = "projectedFDs", default, deserialize_with = "lenient_opt_strings")]
    projected_fds: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_opt_strings")]
    fds: Option<Vec<String>>,
}

impl ProjectFdsResponse {
    pub fn into_list(self) -> Vec<String> {
        self.projected_fds.or(self.fds).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttemptResponse {
    #[serde(default, deserialize_with = "lenient_opt_u32")]
    pub attempts: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRequest {
    pub columns: Vec<usize>,
    pub manual_data: String,
    pub fds: String,
    pub time_limit: u32,
    pub monte_carlo: bool,
    pub samples: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecomposeAllRequest {
    pub tables: Vec<TableRequest>,
    pub fds: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableResult {
    #[serde(rename = "projectedFDs", default, deserialize_with = "lenient_strings")]
    pub projected_fds: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecomposeAllResponse {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub dp_preserved: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub lj_preserved: bool,
    #[serde(default)]
    pub global_ric: RicMatrix,
    #[serde(default, deserialize_with = "lenient_table_results")]
    pub table_results: Vec<TableResult>,
    #[serde(default, deserialize_with = "lenient_columns")]
    pub union_cols: Vec<usize>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub global_manual_rows: Vec<String>,
}

/// Undo history: JSON-encoded snapshots, most recent last.
pub fn decode_undo_history(body: &str) -> Result<Vec<String>, serde_json::Error> {
    let value: Value = serde_json::from_str(body)?;
    Ok(strings_of(&value).unwrap_or_default())
}

/// Decode one snapshot: a list of column-index lists, one per group.
/// Entries that are not lists restore as empty groups.
pub fn decode_snapshot(text: &str) -> Result<Vec<Vec<usize>>, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(entries) = value else {
        return Ok(Vec::new());
    };
    Ok(entries.iter().map(columns_of).collect())
}

fn strings_of(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
        ),
        Value::Null => None,
        _ => {
            tracing::warn!("expected a list of strings in backend payload");
            None
        }
    }
}

fn columns_of(value: &Value) -> Vec<usize> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Number(n) => n.as_u64().map(|n| n as usize),
            Value::String(s) => s.trim().parse::<usize>().ok(),
            _ => None,
        })
        .collect()
}

fn lenient_opt_strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(strings_of(&value))
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(strings_of(&value).unwrap_or_default())
}

fn lenient_columns<'de, D>(deserializer: D) -> Result<Vec<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(columns_of(&value))
}

fn lenient_opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Truthiness, the way the page treated these flags.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

fn lenient_table_results<'de, D>(deserializer: D) -> Result<Vec<TableResult>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or_default())
        .collect())
}
