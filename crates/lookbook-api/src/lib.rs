//! Lookbook API Library
//!
//! This crate provides the HTTP handlers, the analysis pipeline, and the
//! application setup.

pub mod error;
pub mod handlers;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::{AppState, MediaConfig, ServiceState};
