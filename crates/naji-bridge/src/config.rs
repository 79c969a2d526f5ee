//! Bridge Configuration
//!
//! Every field can be omitted from a serialized config and falls back to its
//! default: a 30 second request deadline and `*` as the target origin.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`Bridge`](crate::Bridge)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Default deadline for requests, in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Target origin used when posting to the parent window
    #[serde(default = "default_target_origin")]
    pub target_origin: String,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_target_origin() -> String {
    "*".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            target_origin: default_target_origin(),
        }
    }
}

impl BridgeConfig {
    /// Parse a config from JSON, filling in defaults for missing fields.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    pub fn with_target_origin(mut self, origin: impl Into<String>) -> Self {
        self.target_origin = origin.into();
        self
    }

    /// Default request deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.target_origin, "*");
    }

    #[test]
    fn test_from_json_partial() {
        let config = BridgeConfig::from_json(r#"{"request_timeout_ms": 45000}"#).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(45));
        assert_eq!(config.target_origin, "*");

        let config = BridgeConfig::from_json("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_builder() {
        let config = BridgeConfig::default()
            .with_request_timeout(Duration::from_millis(250))
            .with_target_origin("https://najime.app");
        assert_eq!(config.request_timeout_ms, 250);
        assert_eq!(config.target_origin, "https://najime.app");
    }
}
