//! Service initialization
//!
//! External API clients are constructed here, once, and injected through
//! `AppState`. Nothing else in the crate builds an HTTP client.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use lookbook_core::{Config, VisionProtocol};
use lookbook_services::{
    BackgroundRemovalClient, BackgroundRemover, ImageHost, ImageHostClient, OpenAiAssistantAnalyzer,
    OpenAiChatAnalyzer, VisionAnalyzer, WardrobeClient, WardrobeStore,
};

use crate::services::sweeper::TempFileSweeper;
use crate::state::{AppState, MediaConfig, ServiceState};

/// Build all service clients and assemble the application state.
pub fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_client_timeout_secs()))
        .build()
        .context("Failed to create HTTP client")?;

    let image_host: Arc<dyn ImageHost> = Arc::new(ImageHostClient::new(
        client.clone(),
        config.image_host_url().to_string(),
        config.image_host_api_key().to_string(),
        config.image_host_folder().to_string(),
    ));

    let background_remover: Option<Arc<dyn BackgroundRemover>> =
        if config.background_removal_enabled() {
            // validate() guarantees url and key are present when enabled
            let base_url = config
                .background_removal_url()
                .context("BACKGROUND_REMOVAL_URL missing")?
                .to_string();
            let api_key = config
                .background_removal_api_key()
                .context("BACKGROUND_REMOVAL_API_KEY missing")?
                .to_string();
            Some(Arc::new(BackgroundRemovalClient::new(
                client.clone(),
                base_url,
                api_key,
                Duration::from_millis(config.background_removal_poll_interval_ms()),
                config.background_removal_poll_max_attempts(),
            )))
        } else {
            tracing::info!("Background removal disabled, pipeline will skip that stage");
            None
        };

    let vision: Arc<dyn VisionAnalyzer> = match config.vision_protocol() {
        VisionProtocol::Chat => Arc::new(OpenAiChatAnalyzer::new(
            client.clone(),
            config.openai_base_url().to_string(),
            config.openai_api_key().to_string(),
            config.openai_model().to_string(),
            config.openai_max_tokens(),
        )),
        VisionProtocol::Assistant => {
            // validate() guarantees the assistant id is present
            let assistant_id = config
                .openai_assistant_id()
                .context("OPENAI_ASSISTANT_ID missing")?
                .to_string();
            Arc::new(OpenAiAssistantAnalyzer::new(
                client.clone(),
                config.openai_base_url().to_string(),
                config.openai_api_key().to_string(),
                assistant_id,
                Duration::from_millis(config.run_poll_interval_ms()),
                config.run_poll_max_attempts(),
            ))
        }
    };

    let wardrobe: Arc<dyn WardrobeStore> = Arc::new(WardrobeClient::new(
        client,
        config.wardrobe_service_url().to_string(),
    ));

    let temp_dir = config.temp_dir().clone();
    let sweeper = Arc::new(TempFileSweeper::new(
        temp_dir.clone(),
        Duration::from_secs(config.temp_max_age_secs()),
        Duration::from_secs(config.temp_sweep_interval_secs()),
    ));
    sweeper.start();

    let state = AppState {
        config: config.clone(),
        services: ServiceState {
            image_host,
            background_remover,
            vision,
            wardrobe,
        },
        media: MediaConfig {
            max_file_size: config.max_file_size_bytes(),
            allowed_extensions: config.allowed_extensions().to_vec(),
            allowed_content_types: config.allowed_content_types().to_vec(),
            max_image_width: config.max_image_width(),
            jpeg_quality: config.jpeg_quality(),
        },
        temp_dir,
        is_production: config.is_production(),
    };

    Ok(Arc::new(state))
}
