//! Test helpers: build AppState and router for integration tests.
//!
//! The external collaborators are trait doubles from [doubles]; no network
//! access happens in these tests.

pub mod doubles;
pub mod fixtures;

use std::path::Path;
use std::sync::Arc;

use axum_test::TestServer;
use tempfile::TempDir;

use doubles::{RecordingWardrobe, StubBackgroundRemover, StubImageHost, StubVision};
use lookbook_api::setup::routes::setup_routes;
use lookbook_api::state::{AppState, MediaConfig, ServiceState};
use lookbook_core::{AnalyzerConfig, BaseConfig, Config, VisionProtocol};

/// Test application: server, shared doubles, and the owned temp dir.
pub struct TestApp {
    pub server: TestServer,
    pub image_host: Arc<StubImageHost>,
    pub background_remover: Option<Arc<StubBackgroundRemover>>,
    pub vision: Arc<StubVision>,
    pub wardrobe: Arc<RecordingWardrobe>,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Number of spooled upload files still on disk.
    pub fn temp_file_count(&self) -> usize {
        std::fs::read_dir(self.temp_dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn test_config(temp_dir: &Path) -> AnalyzerConfig {
    AnalyzerConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
        },
        temp_dir: temp_dir.to_path_buf(),
        max_file_size_bytes: 10 * 1024 * 1024,
        allowed_extensions: vec![
            "jpg".to_string(),
            "jpeg".to_string(),
            "png".to_string(),
            "webp".to_string(),
        ],
        allowed_content_types: vec![
            "image/jpeg".to_string(),
            "image/png".to_string(),
            "image/webp".to_string(),
        ],
        max_image_width: 64,
        jpeg_quality: 80,
        image_host_url: "https://images.test".to_string(),
        image_host_api_key: "test-key".to_string(),
        image_host_folder: "wardrobe".to_string(),
        background_removal_enabled: true,
        background_removal_url: Some("https://removal.test".to_string()),
        background_removal_api_key: Some("test-key".to_string()),
        background_removal_poll_interval_ms: 1,
        background_removal_poll_max_attempts: 3,
        openai_api_key: "sk-test".to_string(),
        openai_base_url: "https://openai.test/v1".to_string(),
        openai_model: "gpt-4o".to_string(),
        openai_max_tokens: 500,
        openai_assistant_id: None,
        vision_protocol: VisionProtocol::Chat,
        run_poll_interval_ms: 1,
        run_poll_max_attempts: 3,
        wardrobe_service_url: "http://wardrobe.test".to_string(),
        http_client_timeout_secs: 5,
        temp_sweep_interval_secs: 3600,
        temp_max_age_secs: 3600,
    }
}

pub struct TestAppOptions {
    pub vision_reply: String,
    pub with_background_remover: bool,
    pub background_removal_times_out: bool,
    pub wardrobe: RecordingWardrobe,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            vision_reply: fixtures::SINGLE_GARMENT_REPLY.to_string(),
            with_background_remover: true,
            background_removal_times_out: false,
            wardrobe: RecordingWardrobe::default(),
        }
    }
}

pub fn setup_test_app(options: TestAppOptions) -> TestApp {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let config = Config(Box::new(test_config(temp_dir.path())));

    let image_host = Arc::new(StubImageHost::default());
    let background_remover = options.with_background_remover.then(|| {
        Arc::new(StubBackgroundRemover {
            times_out: options.background_removal_times_out,
            ..StubBackgroundRemover::default()
        })
    });
    let vision = Arc::new(StubVision::replying(options.vision_reply));
    let wardrobe = Arc::new(options.wardrobe);

    let state = Arc::new(AppState {
        config: config.clone(),
        services: ServiceState {
            image_host: image_host.clone(),
            background_remover: background_remover
                .clone()
                .map(|r| r as Arc<dyn lookbook_services::BackgroundRemover>),
            vision: vision.clone(),
            wardrobe: wardrobe.clone(),
        },
        media: MediaConfig {
            max_file_size: config.max_file_size_bytes(),
            allowed_extensions: config.allowed_extensions().to_vec(),
            allowed_content_types: config.allowed_content_types().to_vec(),
            max_image_width: config.max_image_width(),
            jpeg_quality: config.jpeg_quality(),
        },
        temp_dir: temp_dir.path().to_path_buf(),
        is_production: false,
    });

    let router = setup_routes(&config, state).expect("failed to build router");
    let server = TestServer::new(router).expect("failed to start test server");

    TestApp {
        server,
        image_host,
        background_remover,
        vision,
        wardrobe,
        temp_dir,
    }
}
