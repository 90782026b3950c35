//! Maps every displayed cell of every group onto the backend's global RIC
//! matrix.
//!
//! The global matrix is indexed by the union of all group columns, with one
//! row per distinct union tuple in whatever order the backend chose. Rows are
//! therefore matched by content, never by position: each group's projected
//! tuple is looked up in a first-occurrence index built from the global
//! tuples projected onto that group's columns.

use crate::group::{GroupId, SchemaGroup};
use crate::projection::{Tuple, first_occurrence, project};
use crate::relation::OriginalRelation;
use crate::ric::RicMatrix;
use crate::shade::{Shade, ShadePalette};
use crate::sync::wire::DecomposeAllResponse;
use serde::Serialize;
use std::collections::HashMap;

/// Transient view of one full-recomputation response.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationContext {
    union_columns: Vec<usize>,
    global_tuples: Vec<Tuple>,
    global_ric: RicMatrix,
}

impl ReconciliationContext {
    /// `union_columns` is sorted and deduplicated; `global_tuples[i]` and
    /// the matrix row `i` describe the same logical row.
    pub fn new(
        mut union_columns: Vec<usize>,
        global_tuples: Vec<Tuple>,
        global_ric: RicMatrix,
    ) -> Self {
        union_columns.sort_unstable();
        union_columns.dedup();
        Self {
            union_columns,
            global_tuples,
            global_ric,
        }
    }

    /// Build from a backend response. When the backend omits `unionCols`,
    /// the union of the column sets that were sent stands in for it.
    pub fn from_response(response: &DecomposeAllResponse, sent_columns: &[Vec<usize>]) -> Self {
        let union_columns = if response.union_cols.is_empty() {
            sent_columns.iter().flatten().copied().collect()
        } else {
            response.union_cols.clone()
        };

        let global_tuples = response
            .global_manual_rows
            .iter()
            .map(|row| row.split(',').map(|cell| cell.trim().to_string()).collect())
            .collect();

        Self::new(union_columns, global_tuples, response.global_ric.clone())
    }

    pub fn union_columns(&self) -> &[usize] {
        &self.union_columns
    }

    pub fn global_tuples(&self) -> &[Tuple] {
        &self.global_tuples
    }

    pub fn global_ric(&self) -> &RicMatrix {
        &self.global_ric
    }

    /// Position of original column `column` in the union, if present.
    pub fn position_in_union(&self, column: usize) -> Option<usize> {
        self.union_columns.binary_search(&column).ok()
    }

    /// First global row index for each distinct projection of the global
    /// tuples onto `columns`.
    pub fn first_row_index(&self, columns: &[usize]) -> HashMap<Tuple, usize> {
        let positions: Vec<Option<usize>> =
            columns.iter().map(|&c| self.position_in_union(c)).collect();

        first_occurrence(self.global_tuples.iter().map(|row| {
            positions
                .iter()
                .map(|&pos| {
                    pos.and_then(|p| row.get(p))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect::<Tuple>()
        }))
    }

    /// RIC value for original column `column` in global row `row`.
    pub fn ric_at(&self, row: usize, column: usize) -> Option<f64> {
        let col = self.position_in_union(column)?;
        self.global_ric.get(row, col)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedCell {
    pub value: String,
    /// Original column index.
    pub column: usize,
    pub ric: Option<f64>,
    pub shade: Shade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedRow {
    /// Matched row of the global matrix, if any.
    pub global_row: Option<usize>,
    pub cells: Vec<AnnotatedCell>,
}

/// A rendered table: a group's projection, or the original relation when
/// `group` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedTable {
    pub group: Option<GroupId>,
    pub columns: Vec<usize>,
    pub rows: Vec<AnnotatedRow>,
}

impl AnnotatedTable {
    pub fn plaque_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| &r.cells)
            .filter(|c| c.shade.is_plaque())
            .count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    palette: ShadePalette,
}

impl Reconciler {
    pub fn new(palette: ShadePalette) -> Self {
        Self { palette }
    }

    pub fn palette(&self) -> &ShadePalette {
        &self.palette
    }

    fn cell(&self, value: String, column: usize, ric: Option<f64>) -> AnnotatedCell {
        AnnotatedCell {
            value,
            column,
            ric,
            shade: self.palette.shade(ric),
        }
    }

    /// Annotate one group's deduplicated projection of the original rows.
    pub fn reconcile_group(
        &self,
        relation: &OriginalRelation,
        group: GroupId,
        columns: &[usize],
        ctx: &ReconciliationContext,
    ) -> AnnotatedTable {
        let index = ctx.first_row_index(columns);

        let rows = project(relation, columns)
            .into_iter()
            .map(|tuple| {
                let global_row = index
                    .get(&tuple)
                    .copied()
                    .filter(|&r| ctx.global_ric.has_row(r));
                let cells = tuple
                    .into_iter()
                    .zip(columns)
                    .map(|(value, &column)| {
                        let ric = global_row.and_then(|r| ctx.ric_at(r, column));
                        self.cell(value, column, ric)
                    })
                    .collect();
                AnnotatedRow { global_row, cells }
            })
            .collect();

        AnnotatedTable {
            group: Some(group),
            columns: columns.to_vec(),
            rows,
        }
    }

    pub fn reconcile(
        &self,
        relation: &OriginalRelation,
        groups: &[SchemaGroup],
        ctx: &ReconciliationContext,
    ) -> Vec<AnnotatedTable> {
        groups
            .iter()
            .map(|g| self.reconcile_group(relation, g.id(), g.columns(), ctx))
            .collect()
    }

    /// A group's projection with no RIC data, as shown before any recomputation.
    pub fn unannotated(&self, relation: &OriginalRelation, group: &SchemaGroup) -> AnnotatedTable {
        let columns = group.columns();
        let rows = project(relation, columns)
            .into_iter()
            .map(|tuple| AnnotatedRow {
                global_row: None,
                cells: tuple
                    .into_iter()
                    .zip(columns)
                    .map(|(value, &column)| self.cell(value, column, None))
                    .collect(),
            })
            .collect();
        AnnotatedTable {
            group: Some(group.id()),
            columns: columns.to_vec(),
            rows,
        }
    }

    /// The original table, every row, shaded from its baseline matrix.
    pub fn annotate_original(&self, relation: &OriginalRelation) -> AnnotatedTable {
        let baseline = relation.baseline_ric();
        let rows = relation
            .rows()
            .iter()
            .enumerate()
            .map(|(r, row)| AnnotatedRow {
                global_row: Some(r),
                cells: row
                    .iter()
                    .enumerate()
                    .map(|(c, value)| self.cell(value.clone(), c, baseline.get(r, c)))
                    .collect(),
            })
            .collect();
        AnnotatedTable {
            group: None,
            columns: (0..relation.column_count()).collect(),
            rows,
        }
    }
}
