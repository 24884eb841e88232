//! Layered configuration: `dreamdx.toml` overridden by `DREAMDX__*` variables.

use derive_getters::Getters;
use derive_setters::Setters;
use dreamdx_core::LogFormat;
use dreamdx_error::ConfigError;
use dreamdx_models::{DEFAULT_CHAT_COMPLETIONS_URL, DEFAULT_MODEL};
use dreamdx_narrative::DeleteMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "dreamdx.toml";

/// Prefix of environment overrides, e.g. `DREAMDX__SERVER__BIND`.
pub const ENV_PREFIX: &str = "DREAMDX";

/// Root configuration.
///
/// Every section has defaults so an empty file (or none at all) is valid.
///
/// # Examples
///
/// ```
/// use dreamdx_server::DreamConfig;
///
/// let config = DreamConfig::default();
/// assert_eq!(config.server().stage(), "dev");
/// assert_eq!(config.gateway().max_retries(), &3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters, Setters)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct DreamConfig {
    /// HTTP endpoint
    server: ServerSettings,
    /// Remote text generator
    generator: GeneratorSettings,
    /// Narrative persistence
    storage: StorageSettings,
    /// Client side of the endpoint
    gateway: GatewaySettings,
    /// Log output
    logging: LoggingSettings,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[serde(default)]
#[setters(prefix = "with_", into)]
pub struct ServerSettings {
    /// Listen address
    bind: String,
    /// Path prefix of the command routes
    stage: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            stage: "dev".to_string(),
        }
    }
}

/// `[generator]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Chat completions endpoint
    url: String,
    /// Model identifier
    model: String,
    /// Bearer token; `OPENAI_API_KEY` is used when unset
    api_key: Option<String>,
    /// Sampling temperature
    temperature: Option<f32>,
    /// Completion length limit
    max_tokens: Option<u32>,
    /// Per-request timeout in seconds
    timeout_secs: u64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_CHAT_COMPLETIONS_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}

impl GeneratorSettings {
    /// Configured key, else `OPENAI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns an error when neither is set.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::new(
                    "Generator API key missing: set generator.api_key or OPENAI_API_KEY",
                )
            })
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which store backs the service.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageBackend {
    /// Process memory; lost on exit
    Memory,
    /// JSON document on disk
    #[default]
    File,
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct StorageSettings {
    /// Backend selection
    backend: StorageBackend,
    /// Location of the JSON file
    path: Option<PathBuf>,
    /// Hard or soft delete
    delete_mode: DeleteMode,
}

impl StorageSettings {
    /// Configured path, else `<data dir>/dreamdx/narratives.json`.
    pub fn resolve_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("dreamdx")
                .join("narratives.json")
        })
    }
}

/// `[gateway]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct GatewaySettings {
    /// Endpoint base URL; `API_BASE_URL` is used when unset
    base_url: Option<String>,
    /// Stage prefix of the endpoint routes
    stage: String,
    /// Retries after the first attempt
    max_retries: u32,
    /// Exponential backoff factor in seconds
    backoff_factor: f64,
    /// Per-attempt timeout in seconds
    timeout_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: None,
            stage: "dev".to_string(),
            max_retries: 3,
            backoff_factor: 0.3,
            timeout_secs: 90,
        }
    }
}

impl GatewaySettings {
    /// Configured base URL, else `API_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns an error when neither is set.
    pub fn resolve_base_url(&self) -> Result<String, ConfigError> {
        self.base_url
            .clone()
            .or_else(|| std::env::var("API_BASE_URL").ok())
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::new("Gateway base URL missing: set gateway.base_url or API_BASE_URL")
            })
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct LoggingSettings {
    /// `pretty` or `json`
    format: LogFormat,
    /// Filter used when `RUST_LOG` is unset
    filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: "info".to_string(),
        }
    }
}

impl DreamConfig {
    /// Load configuration from `path` (or `dreamdx.toml` in the working
    /// directory) and the environment. The file is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or a value has the wrong type.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let settings = config::Config::builder()
            .add_source(config::File::from(file.as_path()).required(path.is_some()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to read configuration: {}", e)))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Invalid configuration: {}", e)))?;

        debug!(
            bind = %config.server.bind,
            stage = %config.server.stage,
            backend = %config.storage.backend,
            "Configuration loaded"
        );
        config.warn_on_timeout_mismatch();
        Ok(config)
    }

    /// Whether a gateway attempt outlives one generation.
    ///
    /// When it does not, a slow generation is cut off client-side and the
    /// caller never sees its result.
    pub fn gateway_outlasts_generator(&self) -> bool {
        self.gateway.timeout_secs > self.generator.timeout_secs
    }

    fn warn_on_timeout_mismatch(&self) {
        if !self.gateway_outlasts_generator() {
            warn!(
                gateway_timeout_secs = self.gateway.timeout_secs,
                generator_timeout_secs = self.generator.timeout_secs,
                "Gateway timeout does not exceed generator timeout; slow generations will time out"
            );
        }
    }

    /// Parse configuration from TOML text without consulting the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this shape.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| ConfigError::new(format!("Invalid configuration: {}", e)))
            .inspect(Self::warn_on_timeout_mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = DreamConfig::from_toml_str(
            r#"
            [server]
            stage = "prod"

            [storage]
            backend = "memory"
            delete_mode = "soft"

            [generator]
            max_tokens = 150
            "#,
        )
        .unwrap();

        assert_eq!(config.server().stage(), "prod");
        assert_eq!(config.server().bind(), "127.0.0.1:8080");
        assert_eq!(*config.storage().backend(), StorageBackend::Memory);
        assert_eq!(*config.storage().delete_mode(), DeleteMode::Soft);
        assert_eq!(*config.generator().max_tokens(), Some(150));
        assert_eq!(config.generator().model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_bad_value_is_rejected() {
        assert!(DreamConfig::from_toml_str("[gateway]\nmax_retries = \"lots\"").is_err());
    }

    #[test]
    fn test_explicit_storage_path_wins() {
        let config =
            DreamConfig::from_toml_str("[storage]\npath = \"/tmp/dreams.json\"").unwrap();
        assert_eq!(
            config.storage().resolve_path(),
            PathBuf::from("/tmp/dreams.json")
        );
    }

    #[test]
    fn test_default_gateway_timeout_outlasts_generation() {
        let config = DreamConfig::default();
        assert!(config.gateway().timeout() > config.generator().timeout());
        assert!(config.gateway_outlasts_generator());

        let short = DreamConfig::from_toml_str("[gateway]\ntimeout_secs = 30").unwrap();
        assert!(!short.gateway_outlasts_generator());
    }

    #[test]
    fn test_configured_key_is_preferred() {
        let config = DreamConfig::from_toml_str("[generator]\napi_key = \"sk-test\"").unwrap();
        assert_eq!(config.generator().resolve_api_key().unwrap(), "sk-test");
    }
}
