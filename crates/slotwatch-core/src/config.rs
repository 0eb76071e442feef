//! YAML configuration loaded once at startup.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::poll::Channels;
use crate::query::{DEFAULT_API_ROOT, QueryMode};
use crate::seen::{DropPastDates, EvictionPolicy, RetainAll};

pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub area: AreaConfig,
    #[serde(default)]
    pub query: QueryConfig,
    /// Minimum ages accepted in postal-code mode.
    #[serde(default = "default_age_limits")]
    pub age_limits: Vec<u32>,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AreaConfig {
    #[serde(default)]
    pub district_code: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default)]
    pub mode: QueryMode,
    #[serde(default = "default_api_root")]
    pub api_root: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            mode: QueryMode::default(),
            api_root: default_api_root(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
    pub channel_18: String,
    pub channel_45: String,
    /// Destination for postal-mode results; falls back to `channel_18`.
    #[serde(default)]
    pub channel_postal: Option<String>,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

// Keep the bot token out of logs.
impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("channel_18", &self.channel_18)
            .field("channel_45", &self.channel_45)
            .field("channel_postal", &self.channel_postal)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            request_timeout_secs: 10,
            max_attempts: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 8_000,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub evict_past_dates: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            evict_past_dates: true,
        }
    }
}

impl DedupConfig {
    pub fn eviction_policy(&self) -> Box<dyn EvictionPolicy> {
        if self.evict_past_dates {
            Box::new(DropPastDates)
        } else {
            Box::new(RetainAll)
        }
    }
}

impl TelegramConfig {
    /// The bot token, required only when actually delivering to Telegram.
    pub fn token(&self) -> Result<&str, ConfigError> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err(invalid("telegram.token is empty"));
        }
        Ok(token)
    }
}

fn default_age_limits() -> Vec<u32> {
    vec![18, 45]
}

fn default_api_root() -> String {
    DEFAULT_API_ROOT.to_string()
}

fn default_telegram_api() -> String {
    DEFAULT_TELEGRAM_API.to_string()
}

impl Config {
    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse without validating, so callers can apply overrides first.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let code = self.area_code()?;
        // District ids and pincodes are numeric.
        if !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(&format!("area code {code:?} must be digits only")));
        }
        if self.query.mode == QueryMode::ByPostalCode && self.age_limits.is_empty() {
            return Err(invalid("age_limits must list at least one age"));
        }
        if self.telegram.channel_18.trim().is_empty() || self.telegram.channel_45.trim().is_empty()
        {
            return Err(invalid("telegram channels must not be empty"));
        }
        if self.poll.interval_secs == 0 {
            return Err(invalid("poll.interval_secs must be positive"));
        }
        if self.poll.max_attempts == 0 {
            return Err(invalid("poll.max_attempts must be at least 1"));
        }
        Ok(())
    }

    /// The district code or pincode matching the configured mode.
    pub fn area_code(&self) -> Result<&str, ConfigError> {
        let (code, key) = match self.query.mode {
            QueryMode::ByArea => (&self.area.district_code, "area.district_code"),
            QueryMode::ByPostalCode => (&self.area.pincode, "area.pincode"),
        };
        code.as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| invalid(&format!("{key} is required for {} mode", self.query.mode)))
    }

    pub fn channels(&self) -> Channels {
        Channels {
            age_18: self.telegram.channel_18.clone(),
            age_45: self.telegram.channel_45.clone(),
            postal: self
                .telegram
                .channel_postal
                .clone()
                .unwrap_or_else(|| self.telegram.channel_18.clone()),
        }
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Invalid(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
area:
  district_code: "294"
telegram:
  token: "123:abc"
  channel_18: vaccine_18
  channel_45: vaccine_45
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = Config::from_yaml_str(MINIMAL).unwrap();
        config.validate().unwrap();
        assert_eq!(config.query.mode, QueryMode::ByArea);
        assert_eq!(config.query.api_root, DEFAULT_API_ROOT);
        assert_eq!(config.age_limits, vec![18, 45]);
        assert_eq!(config.poll.interval_secs, 60);
        assert_eq!(config.poll.max_attempts, 3);
        assert!(config.dedup.evict_past_dates);
        assert_eq!(config.area_code().unwrap(), "294");
    }

    #[test]
    fn postal_mode_requires_pincode() {
        let yaml = format!("{MINIMAL}query:\n  mode: by_postal_code\n");
        let config = Config::from_yaml_str(&yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("area.pincode"));
    }

    #[test]
    fn non_numeric_area_code_rejected() {
        let yaml = MINIMAL.replace("\"294\"", "\"294&date=01-01-2020\"");
        let config = Config::from_yaml_str(&yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("digits only"));

        let padded = MINIMAL.replace("\"294\"", "\" 294 \"");
        Config::from_yaml_str(&padded).unwrap().validate().unwrap();
    }

    #[test]
    fn postal_channel_falls_back_to_18() {
        let config = Config::from_yaml_str(MINIMAL).unwrap();
        let channels = config.channels();
        assert_eq!(channels.postal, "vaccine_18");
        assert_eq!(channels.age_45, "vaccine_45");
    }

    #[test]
    fn zero_interval_rejected() {
        let yaml = format!("{MINIMAL}poll:\n  interval_secs: 0\n");
        let config = Config::from_yaml_str(&yaml).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn partial_poll_section_keeps_other_defaults() {
        let yaml = format!("{MINIMAL}poll:\n  interval_secs: 9\n");
        let config = Config::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.poll.interval_secs, 9);
        assert_eq!(config.poll.request_timeout_secs, 10);
    }

    #[test]
    fn debug_redacts_token() {
        let config = Config::from_yaml_str(MINIMAL).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("123:abc"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn token_may_be_omitted_until_needed() {
        let yaml = MINIMAL.replace("  token: \"123:abc\"\n", "");
        let config = Config::from_yaml_str(&yaml).unwrap();
        config.validate().unwrap();
        assert!(config.telegram.token().is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.telegram.channel_18, "vaccine_18");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load(Path::new("/nonexistent/slotwatch.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
