use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

/// Sentinel for "no upper bound" on the parental rating preference.
pub const UNBOUNDED_RATING: i32 = -1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub screensaver: ScreensaverConfig,
    #[serde(default)]
    pub parental: ParentalConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Media server connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_url")]
    pub url: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

/// Rotation cadence and artwork sizing.  All durations are in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreensaverConfig {
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
    /// How long a successfully resolved showcase stays up before the next poll.
    #[serde(default = "default_showcase_secs")]
    pub showcase_secs: u64,
    /// Delay after an empty or failed poll.
    #[serde(default = "default_retry_secs")]
    pub retry_secs: u64,
    #[serde(default = "default_batch_limit")]
    pub batch_limit: u32,
    #[serde(default = "default_backdrop_rotation_secs")]
    pub backdrop_rotation_secs: u64,
    #[serde(default = "default_backdrop_max_width")]
    pub backdrop_max_width: u32,
    #[serde(default = "default_logo_max_width")]
    pub logo_max_width: u32,
    #[serde(default = "default_poster_max_width")]
    pub poster_max_width: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentalConfig {
    #[serde(default)]
    pub require_rating: bool,
    /// `-1` disables the upper bound.
    #[serde(default = "default_max_rating")]
    pub max_rating: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ScreensaverConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn showcase_duration(&self) -> Duration {
        Duration::from_secs(self.showcase_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_secs)
    }

    pub fn backdrop_rotation(&self) -> Duration {
        Duration::from_secs(self.backdrop_rotation_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            user_id: String::new(),
            access_token: String::new(),
            device_name: default_device_name(),
        }
    }
}

impl Default for ScreensaverConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: default_initial_delay_secs(),
            showcase_secs: default_showcase_secs(),
            retry_secs: default_retry_secs(),
            batch_limit: default_batch_limit(),
            backdrop_rotation_secs: default_backdrop_rotation_secs(),
            backdrop_max_width: default_backdrop_max_width(),
            logo_max_width: default_logo_max_width(),
            poster_max_width: default_poster_max_width(),
        }
    }
}

impl Default for ParentalConfig {
    fn default() -> Self {
        Self {
            require_rating: false,
            max_rating: default_max_rating(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_server_url() -> String {
    "http://127.0.0.1:8096".to_string()
}

fn default_device_name() -> String {
    "tv-dream".to_string()
}

fn default_initial_delay_secs() -> u64 {
    2
}

fn default_showcase_secs() -> u64 {
    30
}

fn default_retry_secs() -> u64 {
    3
}

fn default_batch_limit() -> u32 {
    5
}

fn default_backdrop_rotation_secs() -> u64 {
    8
}

fn default_backdrop_max_width() -> u32 {
    1920
}

fn default_logo_max_width() -> u32 {
    800
}

fn default_poster_max_width() -> u32 {
    500
}

fn default_max_rating() -> i32 {
    UNBOUNDED_RATING
}

fn default_http_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8996
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
