//! Lookbook Services Library
//!
//! Clients for the external collaborators the analyzer pipeline delegates
//! to: the image host, the background-removal job API, the vision model, and
//! the downstream wardrobe storage API. Each collaborator sits behind a
//! trait so the API crate can inject test doubles.

pub mod error;
pub mod services;

pub use error::ServiceError;
pub use services::background_removal::{BackgroundRemovalClient, BackgroundRemover};
pub use services::image_host::{ImageHost, ImageHostClient};
pub use services::vision::{OpenAiAssistantAnalyzer, OpenAiChatAnalyzer, VisionAnalyzer};
pub use services::wardrobe::{WardrobeClient, WardrobeStore};
