//! Application state
//!
//! `AppState` carries the configuration, the upload limits, and the injected
//! external-service handles the pipeline runs against.

use std::path::PathBuf;
use std::sync::Arc;

use lookbook_core::Config;
use lookbook_services::{BackgroundRemover, ImageHost, VisionAnalyzer, WardrobeStore};

/// Injected external collaborators. Background removal is optional: when the
/// job API is not configured the pipeline skips that stage.
#[derive(Clone)]
pub struct ServiceState {
    pub image_host: Arc<dyn ImageHost>,
    pub background_remover: Option<Arc<dyn BackgroundRemover>>,
    pub vision: Arc<dyn VisionAnalyzer>,
    pub wardrobe: Arc<dyn WardrobeStore>,
}

/// Upload limits and preprocessing parameters.
#[derive(Clone, Debug)]
pub struct MediaConfig {
    pub max_file_size: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    pub max_image_width: u32,
    pub jpeg_quality: u8,
}

/// Main application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub services: ServiceState,
    pub media: MediaConfig,
    pub temp_dir: PathBuf,
    pub is_production: bool,
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
