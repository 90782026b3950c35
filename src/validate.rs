//! Column coverage check run before a full recomputation.

use crate::group::SchemaGroup;
use std::collections::HashSet;

/// The decomposition leaves some original columns out. Holds 0-based
/// indices; displays them 1-based.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "Calculation canceled: not all columns in the original table are covered by the \
     decomposed tables. Missing column(s): {listed}. Please add the missing columns to \
     the decomposed tables or update the existing decomposed tables.",
    listed = join_one_based(.missing)
)]
pub struct CoverageError {
    pub missing: Vec<usize>,
}

impl CoverageError {
    pub fn one_based(&self) -> Vec<usize> {
        self.missing.iter().map(|c| c + 1).collect()
    }
}

fn join_one_based(missing: &[usize]) -> String {
    missing
        .iter()
        .map(|c| (c + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Original column indices, ascending, that no group holds.
pub fn missing_columns(groups: &[SchemaGroup], total_columns: usize) -> Vec<usize> {
    let covered: HashSet<usize> = groups
        .iter()
        .flat_map(|g| g.columns().iter().copied())
        .collect();
    (0..total_columns).filter(|c| !covered.contains(c)).collect()
}

pub fn ensure_coverage(groups: &[SchemaGroup], total_columns: usize) -> Result<(), CoverageError> {
    let missing = missing_columns(groups, total_columns);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoverageError { missing })
    }
}
