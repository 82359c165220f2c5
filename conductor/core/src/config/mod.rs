//! TOML Configuration File Support
//!
//! Centralized configuration loading for the Conductor, supporting a TOML
//! configuration file at `~/.config/chat-conductor/conductor.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables (`CHAT_CONDUCTOR_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/chat-conductor/conductor.toml`
//!   (typically `~/.config/chat-conductor/conductor.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [api]
//! base_url = "https://messaging.example.com"
//! live_url = "https://live.example.com"
//! request_timeout_secs = 30
//!
//! [brand]
//! brand_id = "12345678"
//! app_key = "my-app"
//! app_secret = "s3cret"
//!
//! [consumer]
//! user_name = "Ana"
//! mail = "ana@example.com"
//!
//! [campaign]
//! campaign_id = "99999"
//! engagement_id = "888888"
//! skill_id = "-1"
//!
//! [live]
//! channel_capacity = 100
//!
//! [store]
//! state_dir = "/var/lib/chat-conductor"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::AppCredentials;
use crate::live::DEFAULT_CHANNEL_CAPACITY;
use crate::messages::{CampaignInfo, UserProfile};
use crate::store::is_storable_brand_id;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "CHAT_CONDUCTOR_";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// API section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiToml {
    /// Base URL of the messaging REST API
    pub base_url: Option<String>,

    /// Base URL of the live notification stream (defaults to `base_url`)
    pub live_url: Option<String>,

    /// Per-request timeout in seconds
    pub request_timeout_secs: Option<u64>,
}

/// Brand section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandToml {
    /// Brand (account) id
    pub brand_id: Option<String>,

    /// Application key
    pub app_key: Option<String>,

    /// Application secret
    pub app_secret: Option<String>,
}

/// Consumer profile section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerToml {
    /// Display name, also sent as the profile's first name
    pub user_name: Option<String>,

    /// Profile last name
    pub last_name: Option<String>,

    /// Avatar image URL
    pub avatar_url: Option<String>,

    /// Background image URL
    pub background_image_url: Option<String>,

    /// Profile description
    pub description: Option<String>,

    /// Mobile number (brand-only)
    pub mobile_num: Option<String>,

    /// Email address (brand-only)
    pub mail: Option<String>,
}

/// Campaign routing section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignToml {
    /// Campaign id
    pub campaign_id: Option<String>,

    /// Engagement id
    pub engagement_id: Option<String>,

    /// Skill id (`-1` routes to any skill)
    pub skill_id: Option<String>,
}

/// Live events section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveToml {
    /// Buffered live signals per subscription
    pub channel_capacity: Option<usize>,
}

/// Persistence section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreToml {
    /// Directory for per-brand state files
    pub state_dir: Option<PathBuf>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConductorToml {
    /// API section
    pub api: ApiToml,

    /// Brand section
    pub brand: BrandToml,

    /// Consumer section
    pub consumer: ConsumerToml,

    /// Campaign section
    pub campaign: CampaignToml,

    /// Live section
    pub live: LiveToml,

    /// Store section
    pub store: StoreToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration for a Conductor
///
/// Use [`load_config`] to build one from all sources, then
/// [`ConductorConfig::validate`] before connecting.
#[derive(Clone, Debug)]
pub struct ConductorConfig {
    /// Base URL of the messaging REST API
    pub base_url: String,

    /// Base URL of the live stream, if different from `base_url`
    pub live_url: Option<String>,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Brand (account) id
    pub brand_id: String,

    /// Application key
    pub app_key: String,

    /// Application secret
    pub app_secret: String,

    /// Name stamped on sent messages
    pub user_name: String,

    /// Profile sent when opening (first name is taken from `user_name` unless it is empty)
    pub profile: UserProfile,

    /// Campaign the conversation is requested under
    pub campaign: CampaignInfo,

    /// Skill the conversation is routed to
    pub skill_id: String,

    /// Buffered live signals per subscription
    pub live_channel_capacity: usize,

    /// Directory for per-brand state files (`None` means the platform default)
    pub state_dir: Option<PathBuf>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        let profile = UserProfile::default();
        Self {
            base_url: String::new(),
            live_url: None,
            request_timeout: Duration::from_secs(30),
            brand_id: String::new(),
            app_key: String::new(),
            app_secret: String::new(),
            user_name: profile.first_name.clone(),
            profile,
            campaign: CampaignInfo::default(),
            skill_id: "-1".to_string(),
            live_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            state_dir: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ConductorConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for `brand_id` with the given app credentials and API URL
    pub fn for_brand(
        base_url: impl Into<String>,
        brand_id: impl Into<String>,
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            brand_id: brand_id.into(),
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            ..Self::default()
        }
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Base URL for the live stream
    #[must_use]
    pub fn live_url(&self) -> &str {
        self.live_url.as_deref().unwrap_or(&self.base_url)
    }

    /// Credentials for the first authentication step
    #[must_use]
    pub fn app_credentials(&self) -> AppCredentials {
        AppCredentials {
            app_key: self.app_key.clone(),
            app_secret: self.app_secret.clone(),
        }
    }

    /// Check that everything needed to talk to the platform is present
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("brand.brand_id", &self.brand_id),
            ("brand.app_key", &self.app_key),
            ("brand.app_secret", &self.app_secret),
            ("api.base_url", &self.base_url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!("{name} is required")));
            }
        }

        if !is_storable_brand_id(&self.brand_id) {
            return Err(ConfigError::ValidationError(format!(
                "brand.brand_id may only use ASCII letters, digits, '-', '_' and '.', got {:?}",
                self.brand_id
            )));
        }

        let urls = [
            ("api.base_url", self.base_url.as_str()),
            ("api.live_url", self.live_url()),
        ];
        for (name, url) in urls {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be an http(s) URL, got {url:?}"
                )));
            }
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "api.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.live_channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "live.channel_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/chat-conductor/conductor.toml` or
/// `~/.config/chat-conductor/conductor.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("chat-conductor").join("conductor.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<ConductorConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// Runs before the async runtime does any work, so the file is read
/// synchronously.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ConductorConfig, ConfigError> {
    load_config_with_env(path, |name| std::env::var(name).ok())
}

fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ConductorConfig, ConfigError> {
    let mut config = ConductorConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ConductorToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);

    Ok(config)
}

fn set_if<T: Clone>(target: &mut T, value: Option<&T>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ConductorConfig, toml: &ConductorToml) {
    // API
    set_if(&mut config.base_url, toml.api.base_url.as_ref());
    if toml.api.live_url.is_some() {
        config.live_url = toml.api.live_url.clone();
    }
    if let Some(secs) = toml.api.request_timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }

    // Brand
    set_if(&mut config.brand_id, toml.brand.brand_id.as_ref());
    set_if(&mut config.app_key, toml.brand.app_key.as_ref());
    set_if(&mut config.app_secret, toml.brand.app_secret.as_ref());

    // Consumer profile
    let consumer = &toml.consumer;
    set_if(&mut config.user_name, consumer.user_name.as_ref());
    set_if(&mut config.profile.last_name, consumer.last_name.as_ref());
    set_if(&mut config.profile.avatar_url, consumer.avatar_url.as_ref());
    set_if(
        &mut config.profile.backgnd_img_uri,
        consumer.background_image_url.as_ref(),
    );
    set_if(&mut config.profile.description, consumer.description.as_ref());
    set_if(
        &mut config.profile.private_data.mobile_num,
        consumer.mobile_num.as_ref(),
    );
    set_if(&mut config.profile.private_data.mail, consumer.mail.as_ref());

    // Campaign
    set_if(&mut config.campaign.campaign_id, toml.campaign.campaign_id.as_ref());
    set_if(
        &mut config.campaign.engagement_id,
        toml.campaign.engagement_id.as_ref(),
    );
    set_if(&mut config.skill_id, toml.campaign.skill_id.as_ref());

    // Live
    set_if(&mut config.live_channel_capacity, toml.live.channel_capacity.as_ref());

    // Store
    if toml.store.state_dir.is_some() {
        config.state_dir = toml.store.state_dir.clone();
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut ConductorConfig, env: impl Fn(&str) -> Option<String>) {
    let var = |suffix: &str| env(&format!("{ENV_PREFIX}{suffix}"));
    let mut from_env = false;

    let strings: [(&str, &mut String); 6] = [
        ("BASE_URL", &mut config.base_url),
        ("BRAND_ID", &mut config.brand_id),
        ("APP_KEY", &mut config.app_key),
        ("APP_SECRET", &mut config.app_secret),
        ("USER_NAME", &mut config.user_name),
        ("SKILL_ID", &mut config.skill_id),
    ];
    for (suffix, target) in strings {
        if let Some(value) = var(suffix) {
            *target = value;
            from_env = true;
        }
    }

    if let Some(url) = var("LIVE_URL") {
        config.live_url = Some(url);
        from_env = true;
    }
    if let Some(secs) = var("REQUEST_TIMEOUT").and_then(|v| v.parse::<u64>().ok()) {
        config.request_timeout = Duration::from_secs(secs);
        from_env = true;
    }
    if let Some(capacity) = var("LIVE_CAPACITY").and_then(|v| v.parse::<usize>().ok()) {
        config.live_channel_capacity = capacity;
        from_env = true;
    }
    if let Some(dir) = var("STATE_DIR") {
        config.state_dir = Some(PathBuf::from(dir));
        from_env = true;
    }

    if from_env {
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Brand id override
    pub brand_id: Option<String>,

    /// API base URL override
    pub base_url: Option<String>,

    /// User name override
    pub user_name: Option<String>,

    /// State directory override
    pub state_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set brand id override
    #[must_use]
    pub fn with_brand_id(mut self, brand_id: String) -> Self {
        self.brand_id = Some(brand_id);
        self
    }

    /// Set base URL override
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set user name override
    #[must_use]
    pub fn with_user_name(mut self, user_name: String) -> Self {
        self.user_name = Some(user_name);
        self
    }

    /// Set state directory override
    #[must_use]
    pub fn with_state_dir(mut self, state_dir: PathBuf) -> Self {
        self.state_dir = Some(state_dir);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ConductorConfig) {
        if self.brand_id.is_some()
            || self.base_url.is_some()
            || self.user_name.is_some()
            || self.state_dir.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        set_if(&mut config.brand_id, self.brand_id.as_ref());
        set_if(&mut config.base_url, self.base_url.as_ref());
        set_if(&mut config.user_name, self.user_name.as_ref());
        if self.state_dir.is_some() {
            config.state_dir = self.state_dir.clone();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn toml_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn valid_config() -> ConductorConfig {
        ConductorConfig::for_brand("https://api.example.com", "12345678", "key", "secret")
    }

    // =========================================================================
    // Default Configuration Tests
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = ConductorConfig::default();

        assert_eq!(config.user_name, "WEB UI USER");
        assert_eq!(config.campaign.campaign_id, "99999");
        assert_eq!(config.campaign.engagement_id, "888888");
        assert_eq!(config.skill_id, "-1");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.live_channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.to_string_lossy().contains("chat-conductor"));
            assert!(p.to_string_lossy().ends_with("conductor.toml"));
        }
    }

    // =========================================================================
    // TOML Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_valid_toml() {
        let file = toml_file(
            r#"
[api]
base_url = "https://api.example.com"
live_url = "https://live.example.com"
request_timeout_secs = 10

[brand]
brand_id = "12345678"
app_key = "key"
app_secret = "secret"

[consumer]
user_name = "Ana"
mail = "ana@example.com"

[campaign]
campaign_id = "1"
engagement_id = "2"
skill_id = "3"

[live]
channel_capacity = 8

[store]
state_dir = "/tmp/chat-state"
"#,
        );

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.live_url(), "https://live.example.com");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.brand_id, "12345678");
        assert_eq!(config.app_credentials().app_key, "key");
        assert_eq!(config.user_name, "Ana");
        assert_eq!(config.profile.private_data.mail, "ana@example.com");
        assert_eq!(config.campaign.campaign_id, "1");
        assert_eq!(config.campaign.engagement_id, "2");
        assert_eq!(config.skill_id, "3");
        assert_eq!(config.live_channel_capacity, 8);
        assert_eq!(config.state_dir, Some(PathBuf::from("/tmp/chat-state")));
        assert_eq!(config.source(), ConfigSource::File);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let file = toml_file("[brand]\nbrand_id = \"b1\"\n");
        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();

        assert_eq!(config.brand_id, "b1");
        // Defaults preserved
        assert_eq!(config.skill_id, "-1");
        assert_eq!(config.user_name, "WEB UI USER");
        assert_eq!(config.live_url(), config.base_url);
    }

    #[test]
    fn test_malformed_toml_error() {
        let file = toml_file("[api\nbase_url = 1\n");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_file_graceful() {
        let path = PathBuf::from("/nonexistent/path/conductor.toml");
        let config = load_config_with_env(Some(path), no_env).unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.config_file_path.is_none());
    }

    // =========================================================================
    // Priority Ordering Tests
    // =========================================================================

    #[test]
    fn test_env_overrides_file() {
        let file = toml_file("[brand]\nbrand_id = \"file-brand\"\napp_key = \"file-key\"\n");
        let env: HashMap<&str, &str> = HashMap::from([
            ("CHAT_CONDUCTOR_BRAND_ID", "env-brand"),
            ("CHAT_CONDUCTOR_REQUEST_TIMEOUT", "5"),
            ("CHAT_CONDUCTOR_LIVE_CAPACITY", "not-a-number"),
        ]);

        let config = load_config_with_env(Some(file.path().to_path_buf()), |name| {
            env.get(name).map(ToString::to_string)
        })
        .unwrap();

        assert_eq!(config.brand_id, "env-brand");
        assert_eq!(config.app_key, "file-key");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        // Unparseable values are ignored
        assert_eq!(config.live_channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = valid_config();
        config.user_name = "env-user".to_string();
        config.set_source(ConfigSource::Env);

        ConfigOverrides::new()
            .with_user_name("cli-user".to_string())
            .with_state_dir(PathBuf::from("/tmp/cli"))
            .apply(&mut config);

        assert_eq!(config.user_name, "cli-user");
        assert_eq!(config.state_dir, Some(PathBuf::from("/tmp/cli")));
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_config_overrides_empty_no_change() {
        let mut config = ConductorConfig::default();
        ConfigOverrides::new().apply(&mut config);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    // =========================================================================
    // Validation Tests
    // =========================================================================

    #[test]
    fn test_validate_requires_brand_credentials() {
        let mut config = valid_config();
        config.app_secret = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("brand.app_secret"));

        assert!(ConductorConfig::default().validate().is_err());
    }

    #[test]
    fn test_validate_urls() {
        let mut config = valid_config();
        config.live_url = Some("ws://live.example.com".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api.live_url"));

        let mut config = valid_config();
        config.base_url = "api.example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_brand_id_is_storable() {
        for bad in ["my brand", "../etc", ".hidden", "brand/1"] {
            let mut config = valid_config();
            config.brand_id = bad.to_string();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("brand.brand_id"), "{bad}");
        }

        let mut config = valid_config();
        config.brand_id = "acme_brand-1.eu".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_values() {
        let mut config = valid_config();
        config.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.live_channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // ConfigSource / Error Tests
    // =========================================================================

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::Cli), "CLI");
        assert_eq!(format!("{}", ConfigSource::Env), "environment");
        assert_eq!(format!("{}", ConfigSource::File), "config file");
        assert_eq!(format!("{}", ConfigSource::Default), "default");
    }

    #[test]
    fn test_config_error_display() {
        let read_err = ConfigError::ReadError {
            path: PathBuf::from("/test/path"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let msg = format!("{read_err}");
        assert!(msg.contains("/test/path"));
        assert!(msg.contains("Failed to read"));
    }
}
