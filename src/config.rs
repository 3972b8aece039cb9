use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for MediAlert
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediAlertConfig {
    /// Backend API settings
    pub api: ApiConfig,
    /// Assessment workflow defaults
    pub assessment: AssessmentConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the triage backend
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
    /// Bearer credential for authenticated endpoints (can be set via env var)
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssessmentConfig {
    /// Fallback latitude when no live geolocation is available
    pub default_latitude: f64,
    /// Fallback longitude when no live geolocation is available
    pub default_longitude: f64,
    /// Address label sent alongside the fallback coordinates
    pub location_address: String,
    /// Emergency number shown when the server supplies none
    pub emergency_number: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
}

impl Default for MediAlertConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_seconds: 30,
                token: None, // Will be read from env var
            },
            assessment: AssessmentConfig {
                default_latitude: 4.8156,
                default_longitude: 6.9271,
                location_address: "Current Location".to_string(),
                emergency_number: "112".to_string(),
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
            },
        }
    }
}

impl MediAlertConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (medialert.toml)
    /// 3. Environment variables (prefixed with MEDIALERT_)
    pub fn load() -> Result<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.timeout_seconds", defaults.api.timeout_seconds)?
            .set_default("assessment.default_latitude", defaults.assessment.default_latitude)?
            .set_default(
                "assessment.default_longitude",
                defaults.assessment.default_longitude,
            )?
            .set_default(
                "assessment.location_address",
                defaults.assessment.location_address,
            )?
            .set_default(
                "assessment.emergency_number",
                defaults.assessment.emergency_number,
            )?
            .set_default("observability.log_level", defaults.observability.log_level)?;

        if Path::new("medialert.toml").exists() {
            builder = builder.add_source(File::with_name("medialert"));
        }

        // Override with environment variables
        builder = builder.add_source(
            Environment::with_prefix("MEDIALERT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let mut medialert_config: MediAlertConfig = config.try_deserialize()?;

        // Special handling for the bearer token - check the plain env var too
        if medialert_config.api.token.is_none() {
            if let Ok(token) = std::env::var("MEDIALERT_TOKEN") {
                medialert_config.api.token = Some(token);
            }
        }

        Ok(medialert_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<MediAlertConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = MediAlertConfig::load_env_file();
        MediAlertConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static MediAlertConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_backend() {
        let config = MediAlertConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.assessment.emergency_number, "112");
        assert_eq!(config.assessment.location_address, "Current Location");
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = MediAlertConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: MediAlertConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.api.base_url, config.api.base_url);
        assert_eq!(back.assessment.default_latitude, config.assessment.default_latitude);
    }
}
