pub mod config;
pub mod console;
pub mod events;
pub mod fd;
pub mod group;
pub mod html;
pub mod projection;
pub mod reconcile;
pub mod relation;
pub mod request;
pub mod ric;
pub mod session;
pub mod shade;
pub mod sync;
pub mod text;
pub mod validate;

use wasm_bindgen::prelude::*;

use events::{ColumnEvents, DropOutcome, DroppedColumn};
use group::GroupId;
use html::HtmlRenderer;
use relation::OriginalRelation;
use ric::RicMatrix;
use serde_json::json;
use session::{Session, UndoOutcome};
use shade::ShadePalette;
use sync::wire::DecomposeAllResponse;
use sync::{SyncError, SyncTicket, decode, decode_attempts, decode_project_fds, decode_undo};

/// Initialize panic hook and console logging in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        console::install();
    }
}

/// Deduplicated projection of a JSON row array onto `columns`, as JSON.
#[wasm_bindgen(js_name = "projectTable")]
pub fn project_table(rows_json: &str, columns: &[u32]) -> Result<String, String> {
    let rows = OriginalRelation::try_from_json(rows_json).map_err(|e| e.to_string())?;
    let columns: Vec<usize> = columns.iter().map(|&c| c as usize).collect();
    let tuples = projection::project_rows(&rows, &columns);
    serde_json::to_string(&tuples).map_err(|e| e.to_string())
}

/// CSS background for a RIC value.
#[wasm_bindgen(js_name = "plaqueShade")]
pub fn plaque_shade(ric: f64) -> String {
    let palette = ShadePalette::default();
    palette.css(palette.shade(Some(ric)))
}

/// Browser-facing session. The page performs every request itself and feeds
/// the raw status and body back in.
#[wasm_bindgen]
pub struct Workspace {
    session: Session,
    renderer: HtmlRenderer,
}

#[wasm_bindgen]
impl Workspace {
    /// `original_table` is a JSON array of rows; `ric_matrix` the baseline
    /// matrix. Malformed input yields an empty table rather than an error.
    #[wasm_bindgen(constructor)]
    pub fn new(original_table: &str, ric_matrix: &str) -> Workspace {
        Self::from_relation(OriginalRelation::from_json(original_table, ric_matrix))
    }

    /// Build from `a,1;b,2` manual data text.
    #[wasm_bindgen(js_name = "fromManualData")]
    pub fn from_manual_data(data: &str, ric_matrix: &str) -> Workspace {
        Self::from_relation(OriginalRelation::from_manual_data(
            data,
            RicMatrix::from_json(ric_matrix),
        ))
    }

    #[wasm_bindgen(js_name = "columnCount")]
    pub fn column_count(&self) -> usize {
        self.session.relation().column_count()
    }

    #[wasm_bindgen(js_name = "addGroup")]
    pub fn add_group(&mut self) -> u32 {
        self.session.add_group().0
    }

    #[wasm_bindgen(js_name = "removeGroup")]
    pub fn remove_group(&mut self, group: u32) -> bool {
        self.session.remove_group(GroupId(group))
    }

    /// Returns `{"status": "changed" | "unchanged" | "ignored", ...}`. A
    /// `ticket` present on a change is a projected-FD request to issue.
    #[wasm_bindgen(js_name = "dropColumn")]
    pub fn drop_column(
        &mut self,
        group: u32,
        orig_idx: Option<String>,
        header_text: String,
        position: usize,
    ) -> Result<String, String> {
        let column = DroppedColumn {
            orig_idx,
            header_text,
        };
        let outcome = self
            .session
            .decomposition_mut()
            .on_column_added(GroupId(group), &column, position);
        drop_json(outcome)
    }

    #[wasm_bindgen(js_name = "removeColumn")]
    pub fn remove_column(
        &mut self,
        group: u32,
        orig_idx: Option<String>,
        header_text: String,
    ) -> Result<String, String> {
        let column = DroppedColumn {
            orig_idx,
            header_text,
        };
        let outcome = self
            .session
            .decomposition_mut()
            .on_column_removed(GroupId(group), &column);
        drop_json(outcome)
    }

    #[wasm_bindgen(js_name = "reorderColumns")]
    pub fn reorder_columns(&mut self, group: u32, order: &[u32]) -> Result<String, String> {
        let order: Vec<usize> = order.iter().map(|&c| c as usize).collect();
        let outcome = self
            .session
            .decomposition_mut()
            .on_columns_reordered(GroupId(group), &order);
        drop_json(outcome)
    }

    /// Feed back the answer to a ticket's `project-fds` request.
    #[wasm_bindgen(js_name = "completeFdSync")]
    pub fn complete_fd_sync(
        &mut self,
        ticket_json: &str,
        status: u16,
        body: &str,
    ) -> Result<String, String> {
        let ticket: SyncTicket = serde_json::from_str(ticket_json).map_err(|e| e.to_string())?;
        self.fd_sync_result(&ticket, decode_project_fds(status, body))
    }

    /// A ticket's `project-fds` request never got an HTTP answer.
    #[wasm_bindgen(js_name = "failFdSync")]
    pub fn fail_fd_sync(&mut self, ticket_json: &str, message: String) -> Result<String, String> {
        let ticket: SyncTicket = serde_json::from_str(ticket_json).map_err(|e| e.to_string())?;
        self.fd_sync_result(&ticket, Err(SyncError::Transport(message)))
    }

    /// 1-based numbers of the columns no group holds.
    #[wasm_bindgen(js_name = "missingColumns")]
    pub fn missing_columns(&self) -> js_sys::Array {
        self.session
            .missing_columns()
            .into_iter()
            .map(|c| JsValue::from((c + 1) as u32))
            .collect()
    }

    #[wasm_bindgen(js_name = "showFds")]
    pub fn show_fds(&self) -> Result<String, String> {
        let fds = self.session.show_fds().map_err(|e| e.to_string())?;
        Ok(self.renderer.render_fds(&fds))
    }

    /// Validate and build the `decompose-all` body. Errors carry the message
    /// to show the user; no request must be sent then.
    #[wasm_bindgen(js_name = "prepareCompute")]
    pub fn prepare_compute(
        &mut self,
        fd_list_with_closure: Option<String>,
        fd_list: Option<String>,
    ) -> Result<String, String> {
        let options = self.session.options_mut();
        options.fd_list_with_closure = fd_list_with_closure;
        options.fd_list = fd_list;
        let request = self.session.prepare_compute().map_err(|e| e.to_string())?;
        serde_json::to_string(&request).map_err(|e| e.to_string())
    }

    #[wasm_bindgen(js_name = "applyCompute")]
    pub fn apply_compute(&mut self, status: u16, body: &str) -> Result<String, String> {
        self.compute_result(decode::<DecomposeAllResponse>(status, body))
    }

    /// The `decompose-all` request never got an HTTP answer (`fetch` rejected).
    /// Clears the in-flight guard and reports a server error.
    #[wasm_bindgen(js_name = "failCompute")]
    pub fn fail_compute(&mut self, message: String) -> Result<String, String> {
        self.compute_result(Err(SyncError::Transport(message)))
    }

    /// Returns `{"status": "nothing"}` when no earlier snapshot exists, or
    /// `{"status": "restored", "tickets": [...]}` with the syncs to issue.
    #[wasm_bindgen(js_name = "applyUndo")]
    pub fn apply_undo(&mut self, status: u16, body: &str) -> Result<String, String> {
        self.undo_result(decode_undo(status, body))
    }

    /// The undo request never got an HTTP answer.
    #[wasm_bindgen(js_name = "failUndo")]
    pub fn fail_undo(&mut self, message: String) -> Result<String, String> {
        self.undo_result(Err(SyncError::Transport(message)))
    }

    #[wasm_bindgen(js_name = "applyAttempts")]
    pub fn apply_attempts(&mut self, status: u16, body: &str) {
        match decode_attempts(status, body) {
            Ok(Some(attempts)) => self.session.set_attempts(Some(attempts)),
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "attempt counter update failed"),
        }
    }

    pub fn attempts(&self) -> Option<u32> {
        self.session.attempts()
    }

    pub fn snapshot(&self) -> Result<String, String> {
        serde_json::to_string(&self.session.decomposition().snapshot()).map_err(|e| e.to_string())
    }

    #[wasm_bindgen(js_name = "renderHtml")]
    pub fn render_html(&self) -> String {
        self.renderer.render_page(
            &self.session.original_table(),
            &self.session.tables(),
            self.session.last_outcome().map(|o| &o.report),
        )
    }
}

impl Workspace {
    fn from_relation(relation: OriginalRelation) -> Self {
        Self {
            session: Session::new(relation),
            renderer: HtmlRenderer::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn fd_sync_result(
        &mut self,
        ticket: &SyncTicket,
        result: Result<Vec<String>, SyncError>,
    ) -> Result<String, String> {
        let applied = self.session.complete_fd_sync(ticket, result);
        serde_json::to_string(&applied).map_err(|e| e.to_string())
    }

    fn compute_result(
        &mut self,
        result: Result<DecomposeAllResponse, SyncError>,
    ) -> Result<String, String> {
        let outcome = self.session.finish_compute(result).map_err(|e| e.to_string())?;
        serde_json::to_string(&outcome).map_err(|e| e.to_string())
    }

    fn undo_result(&mut self, result: Result<Vec<String>, SyncError>) -> Result<String, String> {
        let outcome = self.session.apply_undo(result).map_err(|e| e.to_string())?;
        let value = match outcome {
            UndoOutcome::NothingToRestore => json!({ "status": "nothing" }),
            UndoOutcome::Restored { tickets } => {
                json!({ "status": "restored", "tickets": tickets })
            }
        };
        serde_json::to_string(&value).map_err(|e| e.to_string())
    }
}

fn drop_json(outcome: DropOutcome) -> Result<String, String> {
    let value = match outcome {
        DropOutcome::Changed(ticket) => json!({ "status": "changed", "ticket": ticket }),
        DropOutcome::Unchanged => json!({ "status": "unchanged" }),
        DropOutcome::Ignored(reason) => json!({ "status": "ignored", "reason": reason }),
    };
    serde_json::to_string(&value).map_err(|e| e.to_string())
}
