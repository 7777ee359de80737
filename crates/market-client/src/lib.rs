//! # market-client
//!
//! Client side of the marketplace session subsystem.
//!
//! [`SessionClient`] logs in over HTTP, hands the credential to a
//! [`SessionLifecycle`](market_auth::SessionLifecycle), attaches it to
//! protected requests, and tears the session down when the server rejects
//! it. [`RouteGuard`] decides whether a role-restricted page may render.

pub mod client;
pub mod error;
pub mod guard;

pub use client::{SessionClient, UserProfile};
pub use error::ClientError;
pub use guard::{GuardDecision, RouteGuard};
