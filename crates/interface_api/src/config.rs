//! API configuration

use serde::Deserialize;

/// API configuration, loaded from `API_*` environment variables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Underwriting API base URL
    pub underwriting_url: String,
    /// Underwriting API key
    pub underwriting_api_key: String,
    /// Payment processor base URL
    pub payment_url: String,
    /// Payment processor secret key
    pub payment_secret_key: String,
    /// Directory for stored policy documents
    pub documents_dir: String,
    /// Log level filter
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/tripcover".to_string(),
            underwriting_url: "https://underwriting.example.com/api".to_string(),
            underwriting_api_key: String::new(),
            payment_url: "https://payments.example.com".to_string(),
            payment_secret_key: String::new(),
            documents_dir: "./documents".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
