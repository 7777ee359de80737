//! Capabilities defined in `market-core` and implemented by other crates.

pub mod clock;
pub mod session_storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use session_storage::{SessionStorage, keys};
