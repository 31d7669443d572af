//! Configuration module
//!
//! This module provides configuration structures for the analyzer service:
//! server settings, upload limits, and the credentials/endpoints of the
//! external collaborators (image host, background removal, OpenAI, wardrobe).

use std::env;
use std::path::PathBuf;

// Common constants
const DEFAULT_PORT: u16 = 4002;
const MAX_FILE_SIZE_MB: usize = 10;
const MAX_IMAGE_WIDTH: u32 = 1024;
const JPEG_QUALITY: u8 = 80;
const POLL_INTERVAL_MS: u64 = 1000;
const POLL_MAX_ATTEMPTS: u32 = 120;
const OPENAI_MAX_TOKENS: u32 = 500;
const HTTP_CLIENT_TIMEOUT_SECS: u64 = 60;
const TEMP_SWEEP_INTERVAL_SECS: u64 = 3600;
const TEMP_MAX_AGE_SECS: u64 = 3600;

/// Which protocol the vision analyzer speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisionProtocol {
    /// One-shot chat completion with an inline base64 image.
    Chat,
    /// Assistants file + thread + run protocol with run-status polling.
    Assistant,
}

/// Base configuration shared by server concerns
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
}

/// Analyzer service configuration
#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    pub base: BaseConfig,
    // Upload handling
    pub temp_dir: PathBuf,
    pub max_file_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    // Image preprocessing
    pub max_image_width: u32,
    pub jpeg_quality: u8,
    // Image host
    pub image_host_url: String,
    pub image_host_api_key: String,
    pub image_host_folder: String,
    // Background removal job API
    pub background_removal_enabled: bool,
    pub background_removal_url: Option<String>,
    pub background_removal_api_key: Option<String>,
    pub background_removal_poll_interval_ms: u64,
    pub background_removal_poll_max_attempts: u32,
    // OpenAI vision
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_max_tokens: u32,
    pub openai_assistant_id: Option<String>,
    pub vision_protocol: VisionProtocol,
    pub run_poll_interval_ms: u64,
    pub run_poll_max_attempts: u32,
    // Downstream wardrobe storage API
    pub wardrobe_service_url: String,
    // Misc
    pub http_client_timeout_secs: u64,
    pub temp_sweep_interval_secs: u64,
    pub temp_max_age_secs: u64,
}

/// Application configuration (analyzer service).
#[derive(Clone, Debug)]
pub struct Config(pub Box<AnalyzerConfig>);

impl Config {
    fn inner(&self) -> &AnalyzerConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = AnalyzerConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn temp_dir(&self) -> &PathBuf {
        &self.inner().temp_dir
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.inner().max_file_size_bytes
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.inner().allowed_extensions
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.inner().allowed_content_types
    }

    pub fn max_image_width(&self) -> u32 {
        self.inner().max_image_width
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.inner().jpeg_quality
    }

    pub fn image_host_url(&self) -> &str {
        &self.inner().image_host_url
    }

    pub fn image_host_api_key(&self) -> &str {
        &self.inner().image_host_api_key
    }

    pub fn image_host_folder(&self) -> &str {
        &self.inner().image_host_folder
    }

    pub fn background_removal_enabled(&self) -> bool {
        self.inner().background_removal_enabled
    }

    pub fn background_removal_url(&self) -> Option<&str> {
        self.inner().background_removal_url.as_deref()
    }

    pub fn background_removal_api_key(&self) -> Option<&str> {
        self.inner().background_removal_api_key.as_deref()
    }

    pub fn background_removal_poll_interval_ms(&self) -> u64 {
        self.inner().background_removal_poll_interval_ms
    }

    pub fn background_removal_poll_max_attempts(&self) -> u32 {
        self.inner().background_removal_poll_max_attempts
    }

    pub fn openai_api_key(&self) -> &str {
        &self.inner().openai_api_key
    }

    pub fn openai_base_url(&self) -> &str {
        &self.inner().openai_base_url
    }

    pub fn openai_model(&self) -> &str {
        &self.inner().openai_model
    }

    pub fn openai_max_tokens(&self) -> u32 {
        self.inner().openai_max_tokens
    }

    pub fn openai_assistant_id(&self) -> Option<&str> {
        self.inner().openai_assistant_id.as_deref()
    }

    pub fn vision_protocol(&self) -> VisionProtocol {
        self.inner().vision_protocol
    }

    pub fn run_poll_interval_ms(&self) -> u64 {
        self.inner().run_poll_interval_ms
    }

    pub fn run_poll_max_attempts(&self) -> u32 {
        self.inner().run_poll_max_attempts
    }

    pub fn wardrobe_service_url(&self) -> &str {
        &self.inner().wardrobe_service_url
    }

    pub fn http_client_timeout_secs(&self) -> u64 {
        self.inner().http_client_timeout_secs
    }

    pub fn temp_sweep_interval_secs(&self) -> u64 {
        self.inner().temp_sweep_interval_secs
    }

    pub fn temp_max_age_secs(&self) -> u64 {
        self.inner().temp_max_age_secs
    }
}

impl AnalyzerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        let allowed_extensions = env::var("ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| "jpg,jpeg,png,webp".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|_| "image/jpeg,image/png,image/webp".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let vision_protocol = match env::var("VISION_PROTOCOL")
            .unwrap_or_else(|_| "chat".to_string())
            .to_lowercase()
            .as_str()
        {
            "assistant" => VisionProtocol::Assistant,
            _ => VisionProtocol::Chat,
        };

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
        };

        let config = AnalyzerConfig {
            base,
            temp_dir: PathBuf::from(
                env::var("UPLOAD_TEMP_DIR").unwrap_or_else(|_| "uploads".to_string()),
            ),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            allowed_extensions,
            allowed_content_types,
            max_image_width: env::var("MAX_IMAGE_WIDTH")
                .unwrap_or_else(|_| MAX_IMAGE_WIDTH.to_string())
                .parse()
                .unwrap_or(MAX_IMAGE_WIDTH),
            jpeg_quality: env::var("JPEG_QUALITY")
                .unwrap_or_else(|_| JPEG_QUALITY.to_string())
                .parse()
                .unwrap_or(JPEG_QUALITY),
            image_host_url: env::var("IMAGE_HOST_URL")
                .map_err(|_| anyhow::anyhow!("IMAGE_HOST_URL must be set"))?,
            image_host_api_key: env::var("IMAGE_HOST_API_KEY")
                .map_err(|_| anyhow::anyhow!("IMAGE_HOST_API_KEY must be set"))?,
            image_host_folder: env::var("IMAGE_HOST_FOLDER")
                .unwrap_or_else(|_| "wardrobe".to_string()),
            background_removal_enabled: env::var("BACKGROUND_REMOVAL_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            background_removal_url: env::var("BACKGROUND_REMOVAL_URL").ok(),
            background_removal_api_key: env::var("BACKGROUND_REMOVAL_API_KEY").ok(),
            background_removal_poll_interval_ms: env::var("BACKGROUND_REMOVAL_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(POLL_INTERVAL_MS),
            background_removal_poll_max_attempts: env::var("BACKGROUND_REMOVAL_POLL_MAX_ATTEMPTS")
                .unwrap_or_else(|_| POLL_MAX_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(POLL_MAX_ATTEMPTS),
            openai_api_key: env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY must be set"))?,
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            openai_max_tokens: env::var("OPENAI_MAX_TOKENS")
                .unwrap_or_else(|_| OPENAI_MAX_TOKENS.to_string())
                .parse()
                .unwrap_or(OPENAI_MAX_TOKENS),
            openai_assistant_id: env::var("OPENAI_ASSISTANT_ID").ok(),
            vision_protocol,
            run_poll_interval_ms: env::var("RUN_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(POLL_INTERVAL_MS),
            run_poll_max_attempts: env::var("RUN_POLL_MAX_ATTEMPTS")
                .unwrap_or_else(|_| POLL_MAX_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(POLL_MAX_ATTEMPTS),
            wardrobe_service_url: env::var("WARDROBE_SERVICE_URL")
                .map_err(|_| anyhow::anyhow!("WARDROBE_SERVICE_URL must be set"))?,
            http_client_timeout_secs: env::var("HTTP_CLIENT_TIMEOUT_SECS")
                .unwrap_or_else(|_| HTTP_CLIENT_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(HTTP_CLIENT_TIMEOUT_SECS),
            temp_sweep_interval_secs: env::var("TEMP_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| TEMP_SWEEP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(TEMP_SWEEP_INTERVAL_SECS),
            temp_max_age_secs: env::var("TEMP_MAX_AGE_SECS")
                .unwrap_or_else(|_| TEMP_MAX_AGE_SECS.to_string())
                .parse()
                .unwrap_or(TEMP_MAX_AGE_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let is_production = {
            let env = self.base.environment.to_lowercase();
            env == "production" || env == "prod"
        };

        if is_production && self.base.cors_origins.iter().any(|o| o.trim() == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_EXTENSIONS cannot be empty"));
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(anyhow::anyhow!("JPEG_QUALITY must be between 1 and 100"));
        }

        if self.background_removal_enabled
            && (self.background_removal_url.is_none() || self.background_removal_api_key.is_none())
        {
            return Err(anyhow::anyhow!(
                "BACKGROUND_REMOVAL_ENABLED=true requires BACKGROUND_REMOVAL_URL and BACKGROUND_REMOVAL_API_KEY to be set"
            ));
        }

        if self.vision_protocol == VisionProtocol::Assistant && self.openai_assistant_id.is_none() {
            return Err(anyhow::anyhow!(
                "VISION_PROTOCOL=assistant requires OPENAI_ASSISTANT_ID to be set"
            ));
        }

        if self.background_removal_poll_max_attempts == 0 || self.run_poll_max_attempts == 0 {
            return Err(anyhow::anyhow!("poll max attempts must be at least 1"));
        }

        if self.background_removal_poll_interval_ms == 0 || self.run_poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("poll intervals must be at least 1ms"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AnalyzerConfig {
        AnalyzerConfig {
            base: BaseConfig {
                server_port: 4002,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
            },
            temp_dir: PathBuf::from("uploads"),
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
            max_image_width: 1024,
            jpeg_quality: 80,
            image_host_url: "https://images.example.com".to_string(),
            image_host_api_key: "test-key".to_string(),
            image_host_folder: "wardrobe".to_string(),
            background_removal_enabled: true,
            background_removal_url: Some("https://removal.example.com".to_string()),
            background_removal_api_key: Some("test-key".to_string()),
            background_removal_poll_interval_ms: 1000,
            background_removal_poll_max_attempts: 120,
            openai_api_key: "sk-test".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o".to_string(),
            openai_max_tokens: 500,
            openai_assistant_id: None,
            vision_protocol: VisionProtocol::Chat,
            run_poll_interval_ms: 1000,
            run_poll_max_attempts: 120,
            wardrobe_service_url: "http://wardrobe.example.com".to_string(),
            http_client_timeout_secs: 60,
            temp_sweep_interval_secs: 3600,
            temp_max_age_secs: 3600,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_wildcard_cors_in_production() {
        let mut config = test_config();
        config.base.environment = "production".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CORS_ORIGINS"));
    }

    #[test]
    fn test_validate_rejects_assistant_without_id() {
        let mut config = test_config();
        config.vision_protocol = VisionProtocol::Assistant;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("OPENAI_ASSISTANT_ID"));
    }

    #[test]
    fn test_validate_rejects_removal_without_endpoint() {
        let mut config = test_config();
        config.background_removal_url = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_poll_attempts() {
        let mut config = test_config();
        config.run_poll_max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_production() {
        let mut config = test_config();
        config.base.cors_origins = vec!["https://app.example.com".to_string()];
        config.base.environment = "PROD".to_string();
        let config = Config(Box::new(config));
        assert!(config.is_production());
    }
}
