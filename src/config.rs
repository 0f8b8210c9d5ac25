use std::path::PathBuf;
use std::time::Duration;

use directories::UserDirs;
use thiserror::Error;
use url::Url;

/// Per-request timeout for CDX lookups and capture downloads.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Total tries per extension: one initial attempt plus retries.
pub const MAX_ATTEMPTS: u32 = 3;

/// Pause between retry attempts on one extension.
pub const RETRY_COOLDOWN: Duration = Duration::from_secs(5);

/// Pause between batch items, throttling the shared archive service.
pub const ITEM_COOLDOWN: Duration = Duration::from_millis(500);

const DEFAULT_MEDIA_HOST: &str = "i.imgur.com";
const DEFAULT_CDX_ENDPOINT: &str = "https://web.archive.org/cdx/search/cdx";
const DEFAULT_PLAYBACK_ENDPOINT: &str = "https://web.archive.org";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
    #[error("no downloads directory could be determined; set DOWNLOAD_DIR")]
    NoDownloadDir,
}

/// Run configuration.
///
/// The only user-facing knobs are the destination directory and the
/// best-quality flag; everything else is a fixed constant of the core that
/// tests override through the public fields.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory finished files land in.
    pub download_dir: PathBuf,
    /// Probe video formats first instead of the quick-scan order.
    pub best_quality: bool,
    /// Host the original media lived on; probe URLs are built against it.
    pub media_host: String,
    /// Wayback CDX search endpoint.
    pub cdx_endpoint: String,
    /// Wayback playback host; capture URLs are built against it.
    pub playback_endpoint: String,
    /// Timeout applied to every outbound request.
    pub request_timeout: Duration,
    /// Total tries per extension before giving up on it.
    pub max_attempts: u32,
    /// Pause between retry attempts on one extension.
    pub retry_cooldown: Duration,
    /// Pause between batch items.
    pub item_cooldown: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `DOWNLOAD_DIR` overrides the platform downloads directory and
    /// `BEST_QUALITY` flips the extension search order; everything else uses
    /// the fixed defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if no downloads directory can be determined or an
    /// environment variable holds an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let download_dir = match optional_env("DOWNLOAD_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_download_dir().ok_or(ConfigError::NoDownloadDir)?,
        };

        Ok(Self {
            download_dir,
            best_quality: parse_env_bool("BEST_QUALITY", false)?,
            media_host: DEFAULT_MEDIA_HOST.to_string(),
            cdx_endpoint: DEFAULT_CDX_ENDPOINT.to_string(),
            playback_endpoint: DEFAULT_PLAYBACK_ENDPOINT.to_string(),
            request_timeout: REQUEST_TIMEOUT,
            max_attempts: MAX_ATTEMPTS,
            retry_cooldown: RETRY_COOLDOWN,
            item_cooldown: ITEM_COOLDOWN,
        })
    }

    /// Configuration for integration tests: current directory, short
    /// cooldowns, endpoints meant to be overridden with a mock server.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            download_dir: PathBuf::from("."),
            best_quality: false,
            media_host: DEFAULT_MEDIA_HOST.to_string(),
            cdx_endpoint: DEFAULT_CDX_ENDPOINT.to_string(),
            playback_endpoint: DEFAULT_PLAYBACK_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(5),
            max_attempts: MAX_ATTEMPTS,
            retry_cooldown: Duration::from_millis(10),
            item_cooldown: Duration::from_millis(10),
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.media_host.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "media_host".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        for (name, value) in [
            ("cdx_endpoint", &self.cdx_endpoint),
            ("playback_endpoint", &self.playback_endpoint),
        ] {
            if Url::parse(value).is_err() {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    message: format!("not a valid URL: '{value}'"),
                });
            }
        }
        Ok(())
    }
}

/// Platform downloads directory, e.g. `~/Downloads`.
fn default_download_dir() -> Option<PathBuf> {
    UserDirs::new().and_then(|dirs| dirs.download_dir().map(PathBuf::from))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_env_bool("NONEXISTENT_VAR", true).unwrap());
        assert!(!parse_env_bool("NONEXISTENT_VAR", false).unwrap());
    }

    #[test]
    fn test_validate_defaults() {
        let config = Config::for_testing();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = Config {
            max_attempts: 0,
            ..Config::for_testing()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let config = Config {
            cdx_endpoint: "not a url".to_string(),
            ..Config::for_testing()
        };
        assert!(config.validate().is_err());
    }
}
