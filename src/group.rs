//! Decomposition state: the live, ordered set of schema groups.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Display number of a group. Ids are the smallest positive integer not held
/// by a live group, so they are reused after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GroupError {
    #[error("No decomposed table {0}")]
    UnknownGroup(GroupId),
    #[error("Column {column} is outside the original table ({total} columns)")]
    ColumnOutOfRange { column: usize, total: usize },
    #[error("Column {0} appears more than once")]
    DuplicateColumn(usize),
}

/// Whether a mutation changed the group's column *set*.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Changed,
    Unchanged,
}

/// One user-created decomposition unit.
#[derive(Debug, Clone)]
pub struct SchemaGroup {
    id: GroupId,
    columns: Vec<usize>,
    projected_fds: Vec<String>,
    sync_epoch: u64,
}

impl SchemaGroup {
    fn new(id: GroupId) -> Self {
        Self {
            id,
            columns: Vec::new(),
            projected_fds: Vec::new(),
            sync_epoch: 0,
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Original-column indices in display order.
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Last known server answer for `columns`. Empty by default.
    pub fn projected_fds(&self) -> &[String] {
        &self.projected_fds
    }

    pub fn set_projected_fds(&mut self, fds: Vec<String>) {
        self.projected_fds = fds;
    }

    pub fn sync_epoch(&self) -> u64 {
        self.sync_epoch
    }

    pub(crate) fn bump_sync_epoch(&mut self) -> u64 {
        self.sync_epoch += 1;
        self.sync_epoch
    }

    fn column_set(&self) -> HashSet<usize> {
        self.columns.iter().copied().collect()
    }
}

/// The live decomposition, in creation (display) order.
#[derive(Debug, Clone, Default)]
pub struct Decomposition {
    total_columns: usize,
    groups: Vec<SchemaGroup>,
}

impl Decomposition {
    pub fn new(total_columns: usize) -> Self {
        Self {
            total_columns,
            groups: Vec::new(),
        }
    }

    pub fn total_columns(&self) -> usize {
        self.total_columns
    }

    pub fn groups(&self) -> &[SchemaGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn group(&self, id: GroupId) -> Option<&SchemaGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut SchemaGroup> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    fn require_mut(&mut self, id: GroupId) -> Result<&mut SchemaGroup, GroupError> {
        self.group_mut(id).ok_or(GroupError::UnknownGroup(id))
    }

    /// Append an empty group and return its id.
    pub fn create_group(&mut self) -> GroupId {
        let used: HashSet<u32> = self.groups.iter().map(|g| g.id.0).collect();
        let mut next = 1;
        while used.contains(&next) {
            next += 1;
        }
        let id = GroupId(next);
        self.groups.push(SchemaGroup::new(id));
        id
    }

    pub fn remove_group(&mut self, id: GroupId) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| g.id != id);
        self.groups.len() != before
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    fn check_range(&self, column: usize) -> Result<(), GroupError> {
        if column >= self.total_columns {
            return Err(GroupError::ColumnOutOfRange {
                column,
                total: self.total_columns,
            });
        }
        Ok(())
    }

    /// Insert `column` at `position` (clamped to the current length).
    /// A column already in the group is left where it is.
    pub fn insert_column(
        &mut self,
        id: GroupId,
        position: usize,
        column: usize,
    ) -> Result<Membership, GroupError> {
        self.check_range(column)?;
        let group = self.require_mut(id)?;
        if group.columns.contains(&column) {
            return Ok(Membership::Unchanged);
        }
        let at = position.min(group.columns.len());
        group.columns.insert(at, column);
        Ok(Membership::Changed)
    }

    pub fn remove_column(&mut self, id: GroupId, column: usize) -> Result<Membership, GroupError> {
        let group = self.require_mut(id)?;
        let before = group.columns.len();
        group.columns.retain(|&c| c != column);
        Ok(if group.columns.len() == before {
            Membership::Unchanged
        } else {
            Membership::Changed
        })
    }

    /// Replace the column sequence with the current display order.
    pub fn resequence(&mut self, id: GroupId, order: &[usize]) -> Result<Membership, GroupError> {
        let mut seen = HashSet::new();
        for &column in order {
            self.check_range(column)?;
            if !seen.insert(column) {
                return Err(GroupError::DuplicateColumn(column));
            }
        }

        let group = self.require_mut(id)?;
        let membership = if group.column_set() == seen {
            Membership::Unchanged
        } else {
            Membership::Changed
        };
        group.columns = order.to_vec();
        Ok(membership)
    }

    /// Column lists of every group, in display order.
    pub fn snapshot(&self) -> Vec<Vec<usize>> {
        self.groups.iter().map(|g| g.columns.clone()).collect()
    }

    /// Replace every group with one group per snapshot entry. Entries are
    /// sanitized: out-of-range and repeated columns are dropped.
    pub fn restore(&mut self, snapshot: &[Vec<usize>]) -> Vec<GroupId> {
        self.groups.clear();
        let mut ids = Vec::with_capacity(snapshot.len());
        for columns in snapshot {
            let id = self.create_group();
            let mut seen = HashSet::new();
            let clean: Vec<usize> = columns
                .iter()
                .copied()
                .filter(|&c| c < self.total_columns && seen.insert(c))
                .collect();
            if clean.len() != columns.len() {
                tracing::warn!(group = %id, "snapshot entry had invalid columns; dropped them");
            }
            if let Some(group) = self.group_mut(id) {
                group.columns = clean;
            }
            ids.push(id);
        }
        ids
    }
}
