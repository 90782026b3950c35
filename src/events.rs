//! Drag-and-drop as an event source.
//!
//! The interaction layer reports what happened to a group's header row; the
//! core applies it to the decomposition and says whether a projected-FD sync
//! must be issued.

use crate::group::{Decomposition, GroupId, Membership};
use crate::sync::{SyncTicket, begin_sync};

/// What a drop carries: the `data-orig-idx` attribute if the item had one,
/// and the header text (the 1-based column number) otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DroppedColumn {
    pub orig_idx: Option<String>,
    pub header_text: String,
}

impl DroppedColumn {
    pub fn from_index(index: usize) -> Self {
        Self {
            orig_idx: Some(index.to_string()),
            header_text: (index + 1).to_string(),
        }
    }

    /// 0-based original column index, if one can be recovered.
    pub fn index(&self) -> Option<usize> {
        if let Some(raw) = self.orig_idx.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            return leading_integer(raw).and_then(|n| usize::try_from(n).ok());
        }
        leading_integer(self.header_text.trim())
            .filter(|&n| n >= 1)
            .and_then(|n| usize::try_from(n - 1).ok())
    }
}

/// Integer prefix of `text` (`"3px"` reads as 3).
fn leading_integer(text: &str) -> Option<i64> {
    let end = text
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(text.len(), |(i, _)| i);
    text[..end].parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Column membership changed. Carries the sync to issue, if any.
    Changed(Option<SyncTicket>),
    /// Accepted without changing the column set (duplicate, pure reorder).
    Unchanged,
    /// Discarded; state is untouched.
    Ignored(String),
}

/// Capability the rendering surface drives.
pub trait ColumnEvents {
    fn on_column_added(&mut self, group: GroupId, column: &DroppedColumn, position: usize)
    -> DropOutcome;
    fn on_column_removed(&mut self, group: GroupId, column: &DroppedColumn) -> DropOutcome;
    fn on_columns_reordered(&mut self, group: GroupId, order: &[usize]) -> DropOutcome;
}

impl Decomposition {
    fn outcome(
        &mut self,
        group: GroupId,
        result: Result<Membership, crate::group::GroupError>,
    ) -> DropOutcome {
        match result {
            Ok(Membership::Changed) => DropOutcome::Changed(begin_sync(self, group)),
            Ok(Membership::Unchanged) => DropOutcome::Unchanged,
            Err(err) => {
                tracing::warn!(group = %group, error = %err, "column event ignored");
                DropOutcome::Ignored(err.to_string())
            }
        }
    }
}

impl ColumnEvents for Decomposition {
    fn on_column_added(
        &mut self,
        group: GroupId,
        column: &DroppedColumn,
        position: usize,
    ) -> DropOutcome {
        let Some(index) = column.index() else {
            tracing::warn!(group = %group, ?column, "could not parse dropped column index");
            return DropOutcome::Ignored("Could not parse dropped column index".to_string());
        };
        let result = self.insert_column(group, position, index);
        self.outcome(group, result)
    }

    fn on_column_removed(&mut self, group: GroupId, column: &DroppedColumn) -> DropOutcome {
        let Some(index) = column.index() else {
            tracing::warn!(group = %group, ?column, "could not parse removed column index");
            return DropOutcome::Ignored("Could not parse removed column index".to_string());
        };
        let result = self.remove_column(group, index);
        self.outcome(group, result)
    }

    fn on_columns_reordered(&mut self, group: GroupId, order: &[usize]) -> DropOutcome {
        let result = self.resequence(group, order);
        self.outcome(group, result)
    }
}
