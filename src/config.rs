//! Runtime configuration for the display binary

use crate::transport::ReconnectPolicy;
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:5000/ws";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server URL {0:?}: expected ws://, wss://, http:// or https://")]
    InvalidUrl(String),

    #[error("PANDORA_RECONNECT_MIN_MS ({min}) exceeds PANDORA_RECONNECT_MAX_MS ({max})")]
    InvalidBackoff { min: u64, max: u64 },
}

#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// WebSocket URL of the game server
    pub server_url: String,
    pub reconnect: ReconnectPolicy,
    /// Suppress audio cues
    pub muted: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
            muted: false,
        }
    }
}

fn env_trimmed(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn env_millis(name: &str) -> Option<u64> {
    let raw = env_trimmed(name)?;
    match raw.parse() {
        Ok(ms) => Some(ms),
        Err(_) => {
            tracing::warn!("{}={} is not a number of milliseconds, using default", name, raw);
            None
        }
    }
}

/// Accept ws(s) URLs as-is and rewrite http(s) to the matching ws scheme
pub fn normalize_ws_url(url: &str) -> Result<String, ConfigError> {
    if url.starts_with("ws://") || url.starts_with("wss://") {
        Ok(url.to_string())
    } else if let Some(rest) = url.strip_prefix("https://") {
        Ok(format!("wss://{}", rest))
    } else if let Some(rest) = url.strip_prefix("http://") {
        Ok(format!("ws://{}", rest))
    } else {
        Err(ConfigError::InvalidUrl(url.to_string()))
    }
}

impl DisplayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let server_url = normalize_ws_url(
            &env_trimmed("PANDORA_SERVER_URL").unwrap_or(defaults.server_url),
        )?;

        let min = env_millis("PANDORA_RECONNECT_MIN_MS")
            .unwrap_or(defaults.reconnect.min_delay.as_millis() as u64);
        let max = env_millis("PANDORA_RECONNECT_MAX_MS")
            .unwrap_or(defaults.reconnect.max_delay.as_millis() as u64);
        if min > max {
            return Err(ConfigError::InvalidBackoff { min, max });
        }

        let muted = env_trimmed("PANDORA_MUTE")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            server_url,
            reconnect: ReconnectPolicy {
                min_delay: Duration::from_millis(min),
                max_delay: Duration::from_millis(max),
            },
            muted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 4] = [
        "PANDORA_SERVER_URL",
        "PANDORA_RECONNECT_MIN_MS",
        "PANDORA_RECONNECT_MAX_MS",
        "PANDORA_MUTE",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_normalize_ws_url() {
        assert_eq!(normalize_ws_url("ws://host/ws").unwrap(), "ws://host/ws");
        assert_eq!(normalize_ws_url("wss://host/ws").unwrap(), "wss://host/ws");
        assert_eq!(normalize_ws_url("http://host:5000/ws").unwrap(), "ws://host:5000/ws");
        assert_eq!(normalize_ws_url("https://host/ws").unwrap(), "wss://host/ws");
        assert!(matches!(
            normalize_ws_url("ftp://host"),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    #[serial]
    fn test_defaults_when_unset() {
        clear_env();
        let config = DisplayConfig::from_env().unwrap();

        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.reconnect, ReconnectPolicy::default());
        assert!(!config.muted);
    }

    #[test]
    #[serial]
    fn test_reads_environment() {
        clear_env();
        std::env::set_var("PANDORA_SERVER_URL", "  https://show.example/ws ");
        std::env::set_var("PANDORA_RECONNECT_MIN_MS", "250");
        std::env::set_var("PANDORA_RECONNECT_MAX_MS", "4000");
        std::env::set_var("PANDORA_MUTE", "true");

        let config = DisplayConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.server_url, "wss://show.example/ws");
        assert_eq!(config.reconnect.min_delay, Duration::from_millis(250));
        assert_eq!(config.reconnect.max_delay, Duration::from_millis(4000));
        assert!(config.muted);
    }

    #[test]
    #[serial]
    fn test_blank_and_garbage_fall_back() {
        clear_env();
        std::env::set_var("PANDORA_SERVER_URL", "   ");
        std::env::set_var("PANDORA_RECONNECT_MIN_MS", "soon");
        std::env::set_var("PANDORA_MUTE", "0");

        let config = DisplayConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.reconnect.min_delay, Duration::from_millis(500));
        assert!(!config.muted);
    }

    #[test]
    #[serial]
    fn test_rejects_inverted_backoff() {
        clear_env();
        std::env::set_var("PANDORA_RECONNECT_MIN_MS", "5000");
        std::env::set_var("PANDORA_RECONNECT_MAX_MS", "100");

        let result = DisplayConfig::from_env();
        clear_env();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidBackoff { min: 5000, max: 100 })
        ));
    }
}
