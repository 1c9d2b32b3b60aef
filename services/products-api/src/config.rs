use serde::Deserialize;

/// Main configuration for the Products API service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// AWS connection configuration
    #[serde(default)]
    pub aws: AwsConfig,
    /// DynamoDB table configuration
    #[serde(default)]
    pub tables: TableConfig,
    /// HTTP API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// Service-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// AWS client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AwsConfig {
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (for LocalStack, DynamoDB Local, etc.)
    pub endpoint_url: Option<String>,
}

/// DynamoDB table names and scan bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    /// Table holding product records, keyed by `id`
    #[serde(default = "default_products_table")]
    pub products: String,
    /// Table holding stock records, keyed by `product_id`
    #[serde(default = "default_stocks_table")]
    pub stocks: String,
    /// Page size for list scans; no continuation is followed past this
    #[serde(default = "default_scan_limit")]
    pub scan_limit: i32,
}

/// HTTP API configuration.
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
    "products-api".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_region() -> String {
    "us-east-2".to_string()
}

fn default_products_table() -> String {
    "products".to_string()
}

fn default_stocks_table() -> String {
    "stocks".to_string()
}

fn default_scan_limit() -> i32 {
    25
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from config files and environment.
    ///
    /// Environment variables use the `PRODUCTS` prefix with `__` separators,
    /// e.g. `PRODUCTS__TABLES__PRODUCTS` -> `tables.products`.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/products-api").required(false))
            .add_source(config::File::with_name("/etc/storefront/products-api").required(false))
            .add_source(
                config::Environment::with_prefix("PRODUCTS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_url: None,
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            products: default_products_table(),
            stocks: default_stocks_table(),
            scan_limit: default_scan_limit(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let tables = TableConfig::default();
        assert_eq!(tables.products, "products");
        assert_eq!(tables.stocks, "stocks");
        assert_eq!(tables.scan_limit, 25);
        assert_eq!(default_api_port(), 8080);
    }
}
