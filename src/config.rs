//! Configuration loader and validator for the admin console.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub gateway: Gateway,
    pub session: Session,
    pub media: Media,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub page_size: usize,
    pub notification_ttl_ms: u64,
    pub popup_mode: PopupMode,
}

/// How many popup records the console manages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PopupMode {
    Single,
    List,
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Gateway {
    pub base_url: String,
    pub timeout_ms: u64,
}

/// Durable session storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub token_key: String,
}

/// Media host credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Media {
    pub upload_url: String,
    pub upload_preset: String,
    pub cloud_name: String,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Full path of the file holding the bearer token.
    pub fn token_path(&self) -> PathBuf {
        Path::new(&self.app.data_dir).join(&self.session.token_key)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway.timeout_ms)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.app.notification_ttl_ms)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.page_size == 0 {
        return Err(ConfigError::Invalid("app.page_size must be > 0"));
    }
    if cfg.app.notification_ttl_ms == 0 {
        return Err(ConfigError::Invalid("app.notification_ttl_ms must be > 0"));
    }

    match reqwest::Url::parse(&cfg.gateway.base_url) {
        Ok(url) if url.cannot_be_a_base() => {
            return Err(ConfigError::Invalid("gateway.base_url must be an absolute URL"))
        }
        Ok(_) => {}
        Err(_) => return Err(ConfigError::Invalid("gateway.base_url must be an absolute URL")),
    }
    // Url::join drops the last segment unless the base ends in a slash.
    if !cfg.gateway.base_url.ends_with('/') {
        return Err(ConfigError::Invalid("gateway.base_url must end with '/'"));
    }
    if cfg.gateway.timeout_ms == 0 {
        return Err(ConfigError::Invalid("gateway.timeout_ms must be > 0"));
    }

    let key = cfg.session.token_key.trim();
    if key.is_empty() {
        return Err(ConfigError::Invalid("session.token_key must be non-empty"));
    }
    if key.contains('/') || key.contains('\\') {
        return Err(ConfigError::Invalid("session.token_key must be a plain file name"));
    }

    if reqwest::Url::parse(&cfg.media.upload_url).is_err() {
        return Err(ConfigError::Invalid("media.upload_url must be an absolute URL"));
    }
    if cfg.media.upload_preset.trim().is_empty() {
        return Err(ConfigError::Invalid("media.upload_preset must be non-empty"));
    }
    if cfg.media.cloud_name.trim().is_empty() {
        return Err(ConfigError::Invalid("media.cloud_name must be non-empty"));
    }

    Ok(())
}

/// Returns the example YAML shipped with the console.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  page_size: 8
  notification_ttl_ms: 3000
  popup_mode: single

gateway:
  base_url: "https://backend-vtwx.onrender.com/api/"
  timeout_ms: 5000

session:
  token_key: "token"

media:
  upload_url: "https://api.cloudinary.com/v1_1/YOUR_CLOUD_NAME/image/upload"
  upload_preset: "YOUR_UPLOAD_PRESET"
  cloud_name: "YOUR_CLOUD_NAME"
"#
}
