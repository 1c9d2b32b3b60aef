use serde::Deserialize;
use std::time::Duration;

/// Main configuration for the import service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// S3 configuration
    pub s3: S3Config,
    /// Notification queue configuration
    pub queue: QueueConfig,
    /// HTTP API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// Service-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging/metrics
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// S3 configuration for the import bucket.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    /// Bucket receiving CSV uploads
    pub bucket: String,
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (for MinIO, LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub force_path_style: bool,
    /// Presigned upload URL expiration in seconds
    #[serde(default = "default_presigned_url_expiry_secs")]
    pub presigned_url_expiry_secs: u64,
    /// Key prefix for freshly uploaded files
    #[serde(default = "default_uploaded_prefix")]
    pub uploaded_prefix: String,
    /// Key prefix files are moved to after a successful import
    #[serde(default = "default_processed_prefix")]
    pub processed_prefix: String,
    /// Key prefix files are moved to when an import fails
    #[serde(default = "default_error_prefix")]
    pub error_prefix: String,
}

/// Configuration for the queue delivering S3 object-created notifications.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// URL of the notification queue
    pub queue_url: String,
    /// Long-poll wait time in seconds
    #[serde(default = "default_wait_time_secs")]
    pub wait_time_secs: i32,
    /// Maximum messages per receive call
    #[serde(default = "default_max_messages")]
    pub max_messages: i32,
    /// Concurrency for per-record processing within one event
    #[serde(default = "default_record_concurrency")]
    pub record_concurrency: usize,
}

/// HTTP API configuration for the presigned upload endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API listen address
    #[serde(default = "default_api_host")]
    pub host: String,
    /// API listen port
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Enable permissive CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

// Default value functions
fn default_service_name() -> String {
    "import-service".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_region() -> String {
    "us-east-2".to_string()
}

fn default_presigned_url_expiry_secs() -> u64 {
    300
}

fn default_uploaded_prefix() -> String {
    "uploaded/".to_string()
}

fn default_processed_prefix() -> String {
    "processed/".to_string()
}

fn default_error_prefix() -> String {
    "error/".to_string()
}

fn default_wait_time_secs() -> i32 {
    20
}

fn default_max_messages() -> i32 {
    10
}

fn default_record_concurrency() -> usize {
    4
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8081
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from config files and environment.
    ///
    /// Environment variables use the `IMPORT` prefix with `__` separators,
    /// e.g. `IMPORT__S3__BUCKET` -> `s3.bucket`.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/import-service").required(false))
            .add_source(config::File::with_name("/etc/storefront/import-service").required(false))
            .add_source(
                config::Environment::with_prefix("IMPORT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }

    /// Get presigned URL expiry as Duration
    pub fn presigned_url_expiry(&self) -> Duration {
        Duration::from_secs(self.s3.presigned_url_expiry_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            cors_enabled: default_true(),
        }
    }
}
