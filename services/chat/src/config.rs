use aidwin_core::ChatEndpoints;
use reqwest::Url;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_CHAT_API_URL: &str = "https://your-api-url.com/api/chat";
pub const DEFAULT_AUDIO_API_URL: &str = "https://your-api-url.com/api/audio";
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub endpoints: ChatEndpoints,
    pub log_level: Level,
    /// `None` disables the periodic connectivity probe.
    pub probe_interval: Option<Duration>,
    /// How long a connectivity probe waits for any answer.
    pub probe_timeout: Duration,
    pub audio_device: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let chat_url = std::env::var("CHAT_API_URL")
            .unwrap_or_else(|_| DEFAULT_CHAT_API_URL.to_string());
        let audio_url = std::env::var("AUDIO_API_URL")
            .unwrap_or_else(|_| DEFAULT_AUDIO_API_URL.to_string());
        let endpoints = ChatEndpoints {
            chat: parse_endpoint("CHAT_API_URL", &chat_url)?,
            audio: parse_endpoint("AUDIO_API_URL", &audio_url)?,
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let probe_secs = match std::env::var("PROBE_INTERVAL_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue("PROBE_INTERVAL_SECS".to_string(), e.to_string())
            })?,
            Err(_) => DEFAULT_PROBE_INTERVAL_SECS,
        };
        let probe_interval = (probe_secs > 0).then(|| Duration::from_secs(probe_secs));

        let probe_timeout = match std::env::var("PROBE_TIMEOUT_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::InvalidValue(
                        "PROBE_TIMEOUT_SECS".to_string(),
                        "must be at least 1".to_string(),
                    ));
                }
                Ok(secs) => Duration::from_secs(secs),
                Err(e) => {
                    return Err(ConfigError::InvalidValue(
                        "PROBE_TIMEOUT_SECS".to_string(),
                        e.to_string(),
                    ));
                }
            },
            Err(_) => Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        };

        let audio_device =
            std::env::var("AUDIO_DEVICE").unwrap_or_else(|_| "default".to_string());

        Ok(Self {
            endpoints,
            log_level,
            probe_interval,
            probe_timeout,
            audio_device,
        })
    }

    /// Replaces endpoints given on the command line.
    pub fn with_endpoint_overrides(
        mut self,
        chat_url: Option<&str>,
        audio_url: Option<&str>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = chat_url {
            self.endpoints.chat = parse_endpoint("--chat-url", url)?;
        }
        if let Some(url) = audio_url {
            self.endpoints.audio = parse_endpoint("--audio-url", url)?;
        }
        Ok(self)
    }
}

fn parse_endpoint(var: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidValue(
            var.to_string(),
            format!("unsupported scheme '{}'", other),
        )),
    }
}
