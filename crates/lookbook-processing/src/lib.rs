//! Lookbook Processing Library
//!
//! Upload validation and image preprocessing (bounded resize + JPEG
//! re-encode) for the analyzer pipeline.

pub mod image;
pub mod validator;

pub use crate::image::ImagePreprocessor;
pub use validator::{MediaValidator, ValidationError};
