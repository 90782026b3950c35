//! Keeps each group's cached projected FDs in step with its columns.
//!
//! Every sync bumps the group's epoch and hands out a ticket. A completion is
//! stored only while its ticket is the group's latest, so responses that
//! arrive out of order cannot overwrite a newer answer.

use super::client::{Backend, SyncError};
use crate::group::{Decomposition, GroupId};
use serde::{Deserialize, Serialize};

/// An outstanding projected-FD request for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTicket {
    pub group: GroupId,
    pub epoch: u64,
    pub columns: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncApplied {
    /// The answer was stored on the group.
    Stored,
    /// The cache was emptied (no columns, or the request failed).
    Cleared,
    /// A newer request was issued after this one; the answer was dropped.
    Stale,
    /// The group was removed while the request was in flight.
    GroupGone,
}

/// Start a sync for `id`. Returns `None` when no request is needed: the group
/// is unknown, or it has no columns (its cache is cleared right away).
pub fn begin_sync(decomposition: &mut Decomposition, id: GroupId) -> Option<SyncTicket> {
    let group = decomposition.group_mut(id)?;
    let epoch = group.bump_sync_epoch();
    if group.columns().is_empty() {
        group.set_projected_fds(Vec::new());
        return None;
    }
    Some(SyncTicket {
        group: id,
        epoch,
        columns: group.columns().to_vec(),
    })
}

/// Apply the outcome of a ticket's request.
pub fn complete_sync(
    decomposition: &mut Decomposition,
    ticket: &SyncTicket,
    result: Result<Vec<String>, SyncError>,
) -> SyncApplied {
    let Some(group) = decomposition.group_mut(ticket.group) else {
        tracing::debug!(group = %ticket.group, "fd sync response for removed group dropped");
        return SyncApplied::GroupGone;
    };
    if group.sync_epoch() != ticket.epoch {
        tracing::debug!(
            group = %ticket.group,
            epoch = ticket.epoch,
            latest = group.sync_epoch(),
            "stale fd sync response dropped"
        );
        return SyncApplied::Stale;
    }

    match result {
        Ok(fds) => {
            group.set_projected_fds(fds);
            SyncApplied::Stored
        }
        Err(err) => {
            tracing::warn!(group = %ticket.group, error = %err, "projected fd sync failed");
            group.set_projected_fds(Vec::new());
            SyncApplied::Cleared
        }
    }
}

/// Run a full sync against a blocking backend.
pub fn sync_group<B: Backend + ?Sized>(
    decomposition: &mut Decomposition,
    id: GroupId,
    backend: &B,
) -> SyncApplied {
    if decomposition.group(id).is_none() {
        return SyncApplied::GroupGone;
    }
    match begin_sync(decomposition, id) {
        Some(ticket) => {
            let result = backend.project_fds(&ticket.columns);
            complete_sync(decomposition, &ticket, result)
        }
        None => SyncApplied::Cleared,
    }
}
