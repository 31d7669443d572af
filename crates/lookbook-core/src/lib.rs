//! Lookbook Core Library
//!
//! This crate provides the domain models, error types, configuration, and the
//! garment-list extractor shared across all Lookbook components.

pub mod config;
pub mod error;
pub mod extract;
pub mod models;

// Re-export commonly used types
pub use config::{AnalyzerConfig, BaseConfig, Config, VisionProtocol};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use extract::{extract_garments, ExtractError};
pub use models::{GarmentRecord, HostedImageRef, NewClothingRecord, PersistenceFailure};
