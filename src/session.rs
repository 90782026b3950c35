//! One page session: the original relation, the live decomposition, and the
//! Compute RIC / Undo / attempt-counter flows around them.
//!
//! Every backend round trip is split into a `prepare`/`begin` half and a
//! `finish`/`apply` half so a host that performs requests itself (the browser)
//! drives the same state machine as the blocking helpers used natively.

use crate::config::RequestOptions;
use crate::group::{Decomposition, GroupId};
use crate::reconcile::{AnnotatedTable, ReconciliationContext, Reconciler};
use crate::relation::OriginalRelation;
use crate::request::build_request;
use crate::sync::wire::{DecomposeAllRequest, DecomposeAllResponse, decode_snapshot};
use crate::sync::{Backend, SyncApplied, SyncError, SyncTicket, begin_sync, complete_sync};
use crate::validate::{CoverageError, ensure_coverage, missing_columns};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No decomposed tables yet.")]
    NoGroups,
    #[error(transparent)]
    Coverage(#[from] CoverageError),
    #[error("A RIC computation is already in progress")]
    InFlight,
    #[error("No RIC computation is in progress")]
    NotInFlight,
    #[error("Decomposition not accepted: {0}")]
    Rejected(String),
    #[error("Server error while computing RIC: {0}")]
    Backend(SyncError),
    #[error("Undo failed: {0}")]
    Undo(SyncError),
    #[error("Failed to parse history snapshot from server: {0}")]
    Snapshot(serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

/// Dependency-preservation and lossless-join flags, exactly as the backend
/// reported them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PreservationReport {
    pub dependency_preserving: bool,
    pub lossless_join: bool,
}

impl PreservationReport {
    pub fn messages(&self) -> [(Severity, &'static str); 2] {
        let dp = if self.dependency_preserving {
            (Severity::Ok, "✓ Dependency-Preserving provided!")
        } else {
            (Severity::Warning, "⚠ Dependency-Preserving not provided!")
        };
        let lj = if self.lossless_join {
            (Severity::Ok, "✓ Lossless-Join provided!")
        } else {
            (Severity::Error, "❌ Lossless-Join not provided!")
        };
        [dp, lj]
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ComputeOutcome {
    pub report: PreservationReport,
    pub tables: Vec<AnnotatedTable>,
    /// Groups removed or edited while the request was in flight.
    pub skipped: Vec<GroupId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// The backend had no earlier snapshot; all groups were cleared.
    NothingToRestore,
    /// Groups were rebuilt from the snapshot. Each ticket is a sync to issue.
    Restored { tickets: Vec<SyncTicket> },
}

#[derive(Debug, Clone)]
struct PendingCompute {
    sent: Vec<(GroupId, Vec<usize>)>,
}

#[derive(Debug)]
pub struct Session {
    relation: OriginalRelation,
    decomposition: Decomposition,
    options: RequestOptions,
    reconciler: Reconciler,
    pending: Option<PendingCompute>,
    last: Option<ComputeOutcome>,
    attempts: Option<u32>,
}

impl Session {
    pub fn new(relation: OriginalRelation) -> Self {
        Self::with_options(relation, RequestOptions::default())
    }

    pub fn with_options(relation: OriginalRelation, options: RequestOptions) -> Self {
        let decomposition = Decomposition::new(relation.column_count());
        Self {
            relation,
            decomposition,
            options,
            reconciler: Reconciler::default(),
            pending: None,
            last: None,
            attempts: None,
        }
    }

    pub fn relation(&self) -> &OriginalRelation {
        &self.relation
    }

    pub fn decomposition(&self) -> &Decomposition {
        &self.decomposition
    }

    /// Mutable access for column events (see [`crate::events::ColumnEvents`]).
    pub fn decomposition_mut(&mut self) -> &mut Decomposition {
        &mut self.decomposition
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut RequestOptions {
        &mut self.options
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn attempts(&self) -> Option<u32> {
        self.attempts
    }

    pub fn is_computing(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_outcome(&self) -> Option<&ComputeOutcome> {
        self.last.as_ref()
    }

    pub fn add_group(&mut self) -> GroupId {
        self.decomposition.create_group()
    }

    pub fn remove_group(&mut self, id: GroupId) -> bool {
        self.decomposition.remove_group(id)
    }

    pub fn missing_columns(&self) -> Vec<usize> {
        missing_columns(self.decomposition.groups(), self.relation.column_count())
    }

    /// Each group's cached projected FDs, without asking the backend.
    pub fn show_fds(&self) -> Result<Vec<(GroupId, Vec<String>)>, SessionError> {
        if self.decomposition.is_empty() {
            return Err(SessionError::NoGroups);
        }
        Ok(self
            .decomposition
            .groups()
            .iter()
            .map(|g| (g.id(), g.projected_fds().to_vec()))
            .collect())
    }

    /// Tables as currently displayed: the last recomputation's annotation for
    /// groups unchanged since, a plain projection for everything else.
    pub fn tables(&self) -> Vec<AnnotatedTable> {
        self.decomposition
            .groups()
            .iter()
            .map(|group| {
                self.last
                    .as_ref()
                    .and_then(|last| {
                        last.tables.iter().find(|t| {
                            t.group == Some(group.id()) && t.columns == group.columns()
                        })
                    })
                    .cloned()
                    .unwrap_or_else(|| self.reconciler.unannotated(&self.relation, group))
            })
            .collect()
    }

    pub fn original_table(&self) -> AnnotatedTable {
        self.reconciler.annotate_original(&self.relation)
    }

    pub fn begin_fd_sync(&mut self, id: GroupId) -> Option<SyncTicket> {
        begin_sync(&mut self.decomposition, id)
    }

    pub fn complete_fd_sync(
        &mut self,
        ticket: &SyncTicket,
        result: Result<Vec<String>, SyncError>,
    ) -> SyncApplied {
        complete_sync(&mut self.decomposition, ticket, result)
    }

    pub fn run_fd_sync<B: Backend + ?Sized>(
        &mut self,
        ticket: &SyncTicket,
        backend: &B,
    ) -> SyncApplied {
        let result = backend.project_fds(&ticket.columns);
        self.complete_fd_sync(ticket, result)
    }

    /// Gate and build a full recomputation. Fails without side effects when
    /// there are no groups, a request is outstanding, or columns are missing.
    pub fn prepare_compute(&mut self) -> Result<DecomposeAllRequest, SessionError> {
        if self.decomposition.is_empty() {
            return Err(SessionError::NoGroups);
        }
        if self.pending.is_some() {
            return Err(SessionError::InFlight);
        }
        ensure_coverage(self.decomposition.groups(), self.relation.column_count())?;

        let request = build_request(&self.relation, self.decomposition.groups(), &self.options);
        self.pending = Some(PendingCompute {
            sent: self
                .decomposition
                .groups()
                .iter()
                .map(|g| (g.id(), g.columns().to_vec()))
                .collect(),
        });
        Ok(request)
    }

    /// Consume the backend's answer to the request from [`Self::prepare_compute`].
    /// A failure leaves every group exactly as it was.
    pub fn finish_compute(
        &mut self,
        result: Result<DecomposeAllResponse, SyncError>,
    ) -> Result<ComputeOutcome, SessionError> {
        let pending = self.pending.take().ok_or(SessionError::NotInFlight)?;

        let response = match result {
            Ok(response) => response,
            Err(SyncError::Rejected { status, message }) => {
                tracing::warn!(status, %message, "decomposition rejected by backend");
                return Err(SessionError::Rejected(message));
            }
            Err(err) => {
                tracing::warn!(error = %err, "decompose-all request failed");
                return Err(SessionError::Backend(err));
            }
        };

        let sent_columns: Vec<Vec<usize>> = pending.sent.iter().map(|(_, c)| c.clone()).collect();
        let ctx = ReconciliationContext::from_response(&response, &sent_columns);

        let mut tables = Vec::new();
        let mut skipped = Vec::new();
        for (i, (id, columns)) in pending.sent.iter().enumerate() {
            let Some(group) = self.decomposition.group_mut(*id) else {
                tracing::debug!(group = %id, "group removed during RIC computation");
                skipped.push(*id);
                continue;
            };
            if group.columns() != columns.as_slice() {
                tracing::debug!(group = %id, "group edited during RIC computation");
                skipped.push(*id);
                continue;
            }

            if let Some(result) = response.table_results.get(i) {
                if !result.projected_fds.is_empty() {
                    group.set_projected_fds(result.projected_fds.clone());
                }
            }
            tables.push(self.reconciler.reconcile_group(&self.relation, *id, columns, &ctx));
        }

        let outcome = ComputeOutcome {
            report: PreservationReport {
                dependency_preserving: response.dp_preserved,
                lossless_join: response.lj_preserved,
            },
            tables,
            skipped,
        };
        tracing::info!(
            dp_preserved = outcome.report.dependency_preserving,
            lj_preserved = outcome.report.lossless_join,
            tables = outcome.tables.len(),
            "relational information content computed"
        );
        self.last = Some(outcome.clone());
        Ok(outcome)
    }

    /// Validate, send and reconcile in one blocking call.
    pub fn compute_ric<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<ComputeOutcome, SessionError> {
        let request = self.prepare_compute()?;
        let result = backend.decompose_all(&request);
        self.finish_compute(result)
    }

    /// Apply an undo answer: the backend's history after its pop.
    pub fn apply_undo(
        &mut self,
        result: Result<Vec<String>, SyncError>,
    ) -> Result<UndoOutcome, SessionError> {
        let history = result.map_err(SessionError::Undo)?;
        let Some(latest) = history.last() else {
            self.decomposition.clear();
            self.last = None;
            return Ok(UndoOutcome::NothingToRestore);
        };

        let snapshot = decode_snapshot(latest).map_err(SessionError::Snapshot)?;
        let ids = self.decomposition.restore(&snapshot);
        self.last = None;
        tracing::info!(groups = ids.len(), "decomposition restored from snapshot");

        let tickets = ids
            .into_iter()
            .filter_map(|id| begin_sync(&mut self.decomposition, id))
            .collect();
        Ok(UndoOutcome::Restored { tickets })
    }

    pub fn undo<B: Backend + ?Sized>(&mut self, backend: &B) -> Result<UndoOutcome, SessionError> {
        let outcome = self.apply_undo(backend.undo())?;
        if let UndoOutcome::Restored { tickets } = &outcome {
            for ticket in tickets {
                self.run_fd_sync(ticket, backend);
            }
        }
        Ok(outcome)
    }

    pub fn set_attempts(&mut self, attempts: Option<u32>) {
        self.attempts = attempts;
    }

    /// Session bookkeeping only; failures are logged and otherwise ignored.
    pub fn reset_attempts<B: Backend + ?Sized>(&mut self, backend: &B) {
        match backend.reset_attempt() {
            Ok(attempts) => self.attempts = Some(attempts.unwrap_or(0)),
            Err(err) => tracing::warn!(error = %err, "reset attempt failed"),
        }
    }

    pub fn record_attempt<B: Backend + ?Sized>(&mut self, backend: &B) {
        match backend.increment_attempt() {
            Ok(Some(attempts)) => self.attempts = Some(attempts),
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "increment attempt failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ColumnEvents, DropOutcome, DroppedColumn};
    use crate::ric::RicMatrix;
    use crate::shade::Shade;
    use crate::sync::wire::TableResult;
    use std::cell::RefCell;

    /// In-memory backend recording every call.
    #[derive(Default)]
    struct FakeBackend {
        calls: RefCell<Vec<String>>,
        fds: Vec<String>,
        fail_fds: bool,
        decompose: Option<Result<DecomposeAllResponse, (u16, String)>>,
        history: Vec<String>,
    }

    impl FakeBackend {
        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn log(&self, call: &str) {
            self.calls.borrow_mut().push(call.to_string());
        }
    }

    impl Backend for FakeBackend {
        fn reset_attempt(&self) -> Result<Option<u32>, SyncError> {
            self.log("reset");
            Ok(None)
        }

        fn increment_attempt(&self) -> Result<Option<u32>, SyncError> {
            self.log("increment");
            Ok(Some(self.calls.borrow().len() as u32))
        }

        fn project_fds(&self, columns: &[usize]) -> Result<Vec<String>, SyncError> {
            self.log(&format!("project_fds {columns:?}"));
            if self.fail_fds {
                return Err(SyncError::Rejected {
                    status: 500,
                    message: "down".into(),
                });
            }
            Ok(self.fds.clone())
        }

        fn decompose_all(
            &self,
            _request: &DecomposeAllRequest,
        ) -> Result<DecomposeAllResponse, SyncError> {
            self.log("decompose_all");
            match &self.decompose {
                Some(Ok(resp)) => Ok(resp.clone()),
                Some(Err((status, message))) => Err(SyncError::Rejected {
                    status: *status,
                    message: message.clone(),
                }),
                None => Err(SyncError::Transport("unreachable".into())),
            }
        }

        fn undo(&self) -> Result<Vec<String>, SyncError> {
            self.log("undo");
            Ok(self.history.clone())
        }
    }

    fn relation() -> OriginalRelation {
        OriginalRelation::from_manual_data("a,1,x;a,2,x;b,1,y", RicMatrix::default())
    }

    fn session_with(groups: &[&[usize]]) -> Session {
        let mut session = Session::new(relation());
        for columns in groups {
            let id = session.add_group();
            session.decomposition_mut().resequence(id, columns).unwrap();
        }
        session
    }

    fn response(dp: bool, lj: bool) -> DecomposeAllResponse {
        DecomposeAllResponse {
            dp_preserved: dp,
            lj_preserved: lj,
            global_ric: RicMatrix::new(vec![
                vec![0.5, 1.0, 0.5],
                vec![0.5, 1.0, 0.5],
                vec![1.0, 1.0, 1.0],
            ]),
            table_results: vec![
                TableResult {
                    projected_fds: vec!["A->B".into()],
                },
                TableResult::default(),
            ],
            union_cols: vec![0, 1, 2],
            global_manual_rows: vec!["a,1,x".into(), "a,2,x".into(), "b,1,y".into()],
        }
    }

    #[test]
    fn test_scenario_b_compute_proceeds() {
        let mut session = session_with(&[&[0, 1], &[2]]);
        let backend = FakeBackend {
            decompose: Some(Ok(response(true, true))),
            ..FakeBackend::default()
        };
        let outcome = session.compute_ric(&backend).unwrap();
        assert_eq!(backend.calls(), vec!["decompose_all"]);
        assert_eq!(outcome.tables.len(), 2);
        assert!(!session.is_computing());
    }

    #[test]
    fn test_scenario_c_blocked_without_network() {
        let mut session = session_with(&[&[0, 1]]);
        let backend = FakeBackend::default();
        let err = session.compute_ric(&backend).unwrap_err();
        match err {
            SessionError::Coverage(cov) => assert_eq!(cov.one_based(), vec![3]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(backend.calls().is_empty());
        assert!(!session.is_computing());
    }

    #[test]
    fn test_scenario_d_flags_reported_rows_rendered() {
        let mut session = session_with(&[&[0, 1], &[2]]);
        let backend = FakeBackend {
            decompose: Some(Ok(response(false, true))),
            ..FakeBackend::default()
        };
        let outcome = session.compute_ric(&backend).unwrap();
        let messages = outcome.report.messages();
        assert_eq!(messages[0].0, Severity::Warning);
        assert_eq!(messages[1], (Severity::Ok, "✓ Lossless-Join provided!"));

        let first = &outcome.tables[0];
        assert_eq!(first.rows.len(), 3);
        assert_eq!(first.rows[0].cells[0].shade, Shade::Plaque { lightness: 55.0 });
        assert_eq!(first.rows[0].cells[1].shade, Shade::Plain);
        assert_eq!(outcome.tables[1].rows.len(), 2);
    }

    #[test]
    fn test_scenario_e_fd_failure_clears_cache() {
        let mut session = session_with(&[]);
        let id = session.add_group();
        let backend = FakeBackend {
            fail_fds: true,
            ..FakeBackend::default()
        };
        session
            .decomposition_mut()
            .group_mut(id)
            .unwrap()
            .set_projected_fds(vec!["stale".into()]);

        let outcome = session
            .decomposition_mut()
            .on_column_added(id, &DroppedColumn::from_index(0), 0);
        let DropOutcome::Changed(Some(ticket)) = outcome else {
            panic!("expected ticket");
        };
        assert_eq!(session.run_fd_sync(&ticket, &backend), SyncApplied::Cleared);
        assert!(session.decomposition().group(id).unwrap().projected_fds().is_empty());
    }

    #[test]
    fn test_server_fds_refresh_cache() {
        let mut session = session_with(&[&[0, 1], &[2]]);
        let second = session.decomposition().groups()[1].id();
        session
            .decomposition_mut()
            .group_mut(second)
            .unwrap()
            .set_projected_fds(vec!["kept".into()]);
        let backend = FakeBackend {
            decompose: Some(Ok(response(true, true))),
            ..FakeBackend::default()
        };
        session.compute_ric(&backend).unwrap();
        let fds = session.show_fds().unwrap();
        assert_eq!(fds[0].1, vec!["A->B"]);
        assert_eq!(fds[1].1, vec!["kept"]);
    }

    #[test]
    fn test_rejection_is_verbatim_and_changes_nothing() {
        let mut session = session_with(&[&[0, 1], &[2]]);
        let backend = FakeBackend {
            decompose: Some(Err((400, "Lossless-join violated".into()))),
            ..FakeBackend::default()
        };
        let err = session.compute_ric(&backend).unwrap_err();
        assert_eq!(err.to_string(), "Decomposition not accepted: Lossless-join violated");
        assert!(session.last_outcome().is_none());
        assert!(!session.is_computing());
    }

    #[test]
    fn test_second_compute_while_in_flight() {
        let mut session = session_with(&[&[0, 1, 2]]);
        session.prepare_compute().unwrap();
        assert!(matches!(session.prepare_compute(), Err(SessionError::InFlight)));
        session.finish_compute(Ok(response(true, true))).unwrap();
        assert!(session.prepare_compute().is_ok());
    }

    #[test]
    fn test_edits_during_compute_are_skipped() {
        let mut session = session_with(&[&[0, 1], &[2]]);
        let first = session.decomposition().groups()[0].id();
        session.prepare_compute().unwrap();
        session.decomposition_mut().remove_column(first, 1).unwrap();
        let outcome = session.finish_compute(Ok(response(true, true))).unwrap();
        assert_eq!(outcome.skipped, vec![first]);
        assert_eq!(outcome.tables.len(), 1);

        // The edited group is shown as a plain projection.
        let shown = session.tables();
        assert_eq!(shown[0].plaque_count(), 0);
        assert_eq!(shown[0].columns, vec![0]);
    }

    #[test]
    fn test_no_groups() {
        let mut session = session_with(&[]);
        assert!(matches!(session.prepare_compute(), Err(SessionError::NoGroups)));
        assert!(matches!(session.show_fds(), Err(SessionError::NoGroups)));
    }

    #[test]
    fn test_undo_restores_and_syncs() {
        let mut session = session_with(&[&[0]]);
        let backend = FakeBackend {
            fds: vec!["A->B".into()],
            history: vec!["[[0,1],[2]]".into(), "[[0,1],[1,2],[]]".into()],
            ..FakeBackend::default()
        };
        let outcome = session.undo(&backend).unwrap();
        let UndoOutcome::Restored { tickets } = outcome else {
            panic!("expected restore");
        };
        assert_eq!(tickets.len(), 2);
        assert_eq!(session.decomposition().snapshot(), vec![vec![0, 1], vec![1, 2], vec![]]);
        assert_eq!(
            backend.calls(),
            vec!["undo", "project_fds [0, 1]", "project_fds [1, 2]"]
        );
        assert_eq!(session.decomposition().groups()[0].projected_fds(), &["A->B".to_string()]);
    }

    #[test]
    fn test_undo_with_empty_history_clears() {
        let mut session = session_with(&[&[0, 1, 2]]);
        let backend = FakeBackend::default();
        assert_eq!(session.undo(&backend).unwrap(), UndoOutcome::NothingToRestore);
        assert!(session.decomposition().is_empty());
    }

    #[test]
    fn test_undo_bad_snapshot_changes_nothing() {
        let mut session = session_with(&[&[0, 1, 2]]);
        let err = session.apply_undo(Ok(vec!["[[0,".into()])).unwrap_err();
        assert!(matches!(err, SessionError::Snapshot(_)));
        assert_eq!(session.decomposition().snapshot(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_attempt_counter() {
        let mut session = session_with(&[]);
        let backend = FakeBackend::default();
        session.reset_attempts(&backend);
        assert_eq!(session.attempts(), Some(0));
        session.record_attempt(&backend);
        assert_eq!(session.attempts(), Some(2));
    }
}
