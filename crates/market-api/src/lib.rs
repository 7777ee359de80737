//! # market-api
//!
//! HTTP API layer for the marketplace session subsystem built on Axum.
//!
//! Provides the login/logout/identity endpoints, the authentication gate
//! middleware, the `AuthUser` extractor, DTOs, and error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
