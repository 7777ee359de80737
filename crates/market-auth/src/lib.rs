//! # market-auth
//!
//! Credential handling and session lifecycle for the marketplace.
//!
//! ## Modules
//!
//! - `jwt`: credential issuance (`JwtEncoder`) and stateless validation (`JwtDecoder`)
//! - `password`: Argon2id password hashing
//! - `account`: account directory consulted at login
//! - `session`: client-side lifecycle manager, local session storage, and the server-side session log

pub mod account;
pub mod jwt;
pub mod password;
pub mod session;

pub use account::{Account, AccountDirectory, MemoryAccountDirectory};
pub use jwt::{Claims, IssuedCredential, JwtDecoder, JwtEncoder};
pub use password::PasswordHasher;
pub use session::{
    EndReason, FileSessionLog, FileSessionStorage, LifecycleState, MemorySessionLog,
    MemorySessionStorage, SessionLifecycle, SessionListener, SessionLog, SessionLogRecord,
    SessionStatus, TracingListener,
};
