//! Client-local key-value persistence for session state.

use crate::result::AppResult;

/// Storage keys under which the client session is persisted.
pub mod keys {
    /// The bearer credential.
    pub const TOKEN: &str = "token";
    /// Absolute expiry as an epoch-milliseconds string.
    pub const EXPIRATION_TIME: &str = "expirationTime";
    /// Opaque JSON blob describing the signed-in user.
    pub const USER_DATA: &str = "userData";

    /// Every key owned by the session, cleared together.
    pub const ALL: [&str; 3] = [TOKEN, EXPIRATION_TIME, USER_DATA];
}

/// Synchronous key-value store holding the client's session values.
///
/// Writes and removals take a batch of keys and must apply it as one
/// unit: a reader never observes a token without its expiry.
pub trait SessionStorage: Send + Sync + std::fmt::Debug + 'static {
    /// Read a value. `None` if the key is absent.
    fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Write all entries as one unit.
    fn set_many(&self, entries: &[(&str, String)]) -> AppResult<()>;

    /// Remove all keys as one unit. Missing keys are ignored.
    fn remove_many(&self, keys: &[&str]) -> AppResult<()>;
}
