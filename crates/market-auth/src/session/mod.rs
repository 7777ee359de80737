//! Session lifecycle management and the session log.
//!
//! - `lifecycle`: the client-side timer-driven state machine
//! - `storage`: client-local persistence backing the lifecycle
//! - `listener`: warnings, end notifications, and re-authentication redirects
//! - `log` / `file_log`: the server-side audit trail of session starts and ends
//! - `cleanup`: closes log records whose credential expired unannounced

pub mod cleanup;
pub mod file_log;
pub mod lifecycle;
pub mod listener;
pub mod log;
pub mod storage;

pub use cleanup::SessionLogSweeper;
pub use file_log::FileSessionLog;
pub use lifecycle::{LifecycleState, SessionLifecycle, SessionStatus};
pub use listener::{EndReason, SessionListener, TracingListener};
pub use log::{MemorySessionLog, SessionLog, SessionLogRecord, token_reference};
pub use storage::{FileSessionStorage, MemorySessionStorage};
