//! # market-core
//!
//! Core crate for the marketplace session subsystem. Contains the
//! configuration schema, role levels, the clock and session-storage
//! capabilities, and the unified error system.
//!
//! This crate has **no** internal dependencies on other marketplace crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, SessionError};
pub use result::AppResult;
