//! Application configuration.
//!
//! Settings come from `echoscan.toml`; `ECHOSCAN_SERVICE_URL` and
//! `ECHOSCAN_CONTEXT` override the file. Every field has a default so an
//! absent file yields a usable configuration.

use crate::error::{ConfigError, CoreError};
use crate::types::validate_relevance;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "echoscan.toml";
pub const SERVICE_URL_ENV: &str = "ECHOSCAN_SERVICE_URL";
pub const CONTEXT_ENV: &str = "ECHOSCAN_CONTEXT";

/// Upper bound the service accepts for a single discovery request.
pub const MAX_DISCOVERY_ITEMS: u32 = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Smallest page requested from the listing call used to resync
    /// analyses. Never below a full discovery run.
    #[serde(default = "default_listing_limit")]
    pub listing_limit: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            listing_limit: default_listing_limit(),
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub context_description: String,

    #[serde(default = "default_max_items")]
    pub max_items: u32,

    #[serde(default = "default_synthesis_min_relevance")]
    pub synthesis_min_relevance: f64,

    #[serde(default)]
    pub enrich_mode: EnrichMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            context_description: String::new(),
            max_items: default_max_items(),
            synthesis_min_relevance: default_synthesis_min_relevance(),
            enrich_mode: EnrichMode::default(),
        }
    }
}

/// How analyses produced by an enrich call reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichMode {
    /// Re-read the listing after the enrich call succeeds.
    #[default]
    Listing,
    /// Trust the analyses returned by the enrich call itself.
    Inline,
}

fn default_base_url() -> String {
    "http://localhost:8001".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    concat!("echoscan/", env!("CARGO_PKG_VERSION")).into()
}
fn default_listing_limit() -> u32 {
    MAX_DISCOVERY_ITEMS
}
fn default_max_items() -> u32 {
    20
}
fn default_synthesis_min_relevance() -> f64 {
    50.0
}

impl AppConfig {
    /// Loads configuration from `path`, or from `echoscan.toml` in the
    /// working directory when no path is given. A missing default file is
    /// not an error; a missing explicit file is.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let path_display = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                CoreError::Config(ConfigError::FileNotFound { path: path_display.clone() })
            }
            std::io::ErrorKind::PermissionDenied => {
                CoreError::Config(ConfigError::PermissionDenied { path: path_display.clone() })
            }
            _ => CoreError::Io(e),
        })?;

        let config = Self::from_toml(&contents)?;
        info!("Loaded configuration from {}", path_display);
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, CoreError> {
        toml::from_str(contents).map_err(|e| CoreError::Config(ConfigError::Parse(e)))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(SERVICE_URL_ENV) {
            if !url.trim().is_empty() {
                debug!("Service URL overridden by {}", SERVICE_URL_ENV);
                self.service.base_url = url.trim().to_string();
            }
        }
        if let Ok(context) = std::env::var(CONTEXT_ENV) {
            debug!("Context description overridden by {}", CONTEXT_ENV);
            self.pipeline.context_description = context;
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let url = Url::parse(&self.service.base_url).map_err(|_| ConfigError::InvalidValue {
            field: "service.base_url".to_string(),
            value: self.service.base_url.clone(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "service.base_url".to_string(),
                value: self.service.base_url.clone(),
            }
            .into());
        }

        if self.service.timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "service.timeout_secs must be greater than zero".to_string(),
            }
            .into());
        }

        // A shorter listing can miss the items an enrich batch just sent.
        if self.service.listing_limit < MAX_DISCOVERY_ITEMS {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "service.listing_limit must be at least {MAX_DISCOVERY_ITEMS}, got {}",
                    self.service.listing_limit
                ),
            }
            .into());
        }

        if !(1..=MAX_DISCOVERY_ITEMS).contains(&self.pipeline.max_items) {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.max_items".to_string(),
                value: self.pipeline.max_items.to_string(),
            }
            .into());
        }

        validate_relevance(
            "pipeline.synthesis_min_relevance",
            self.pipeline.synthesis_min_relevance,
        )
        .map_err(|_| ConfigError::InvalidValue {
            field: "pipeline.synthesis_min_relevance".to_string(),
            value: self.pipeline.synthesis_min_relevance.to_string(),
        })?;

        Ok(())
    }
}
