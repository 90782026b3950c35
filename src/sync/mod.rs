//! Backend synchronization: wire payloads, the backend client and the
//! per-group projected-FD sync.

mod client;
mod fd_sync;
pub mod wire;

#[cfg(not(target_arch = "wasm32"))]
pub use client::HttpBackend;
pub use client::{
    Backend, SyncError, check_status, decode, decode_attempts, decode_project_fds, decode_undo,
};
pub use fd_sync::{SyncApplied, SyncTicket, begin_sync, complete_sync, sync_group};
