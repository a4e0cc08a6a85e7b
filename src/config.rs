use std::fmt;
use std::path::PathBuf;

/// Page polled when `FACEBOOK_PAGE_ID` is not set (the original deployment).
const DEFAULT_PAGE_ID: &str = "1601597320127277";

/// Feed fetch limit when `FEED_PAGE_SIZE` is not set.
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required variable is absent or empty.
    Missing(&'static str),
    /// A variable is present but its value is unusable.
    Invalid { key: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "required variable {key} is not set"),
            Self::Invalid { key, reason } => write!(f, "invalid value for {key}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug)]
pub struct Config {
    pub telegram_token: String,
    pub redis_url: String,
    pub facebook_token: String,
    pub facebook_page_id: String,
    pub feed_page_size: u32,
    /// StatHat EZ key; metrics are disabled when unset.
    pub stathat_key: Option<String>,
    /// Directory for the file logging layer; stdout only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a config from any variable lookup. `from_env` wires this to the
    /// process environment; tests pass a closure over a map.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let telegram_token = required(&lookup, "TELEGRAM_TOKEN")?;
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Invalid {
                key: "TELEGRAM_TOKEN",
                reason: "expected format 123456789:ABCdefGHI...".into(),
            });
        }

        let redis_url = required(&lookup, "REDIS_URL")?;
        let facebook_token = required(&lookup, "FACEBOOK_TOKEN")?;

        let facebook_page_id = lookup("FACEBOOK_PAGE_ID")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_PAGE_ID.to_string());

        let feed_page_size = match lookup("FEED_PAGE_SIZE").filter(|v| !v.is_empty()) {
            Some(raw) => raw.parse::<u32>().map_err(|e| ConfigError::Invalid {
                key: "FEED_PAGE_SIZE",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            telegram_token,
            redis_url,
            facebook_token,
            facebook_page_id,
            feed_page_size,
            stathat_key: lookup("STATHAT_EZKEY").filter(|v| !v.is_empty()),
            log_dir: lookup("LOG_DIR").filter(|v| !v.is_empty()).map(PathBuf::from),
        })
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}
