//! Accounts consulted when issuing credentials.

pub mod directory;

pub use directory::{Account, AccountDirectory, MemoryAccountDirectory};
