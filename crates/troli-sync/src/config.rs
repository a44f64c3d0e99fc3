//! # Sync Configuration
//!
//! Configuration for the cart synchronization engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TROLI_BROKER_URL=wss://broker.lan:8081/mqtt                        │
//! │     TROLI_CLIENT_PREFIX=tablet-3                                       │
//! │     TROLI_PUBLISH_INTERVAL_MS=1000                                     │
//! │     TROLI_DEBOUNCE_MS=300                                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/troli-pos/sync.toml (Linux)                              │
//! │     ~/Library/Application Support/com.troli.pos/sync.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     public test broker, 10 s connect timeout, 2 s reconnect,           │
//! │     1 s publish cadence, 300 ms search debounce                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [broker]
//! url = "wss://broker.lan:8081/mqtt"
//! client_id_prefix = "tablet"
//! connect_timeout_secs = 10
//! reconnect_delay_ms = 2000
//!
//! [publisher]
//! interval_ms = 1000
//!
//! [search]
//! debounce_ms = 300
//! min_query_len = 2
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::transport::TransportConfig;

// =============================================================================
// Sections
// =============================================================================

/// Broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    /// Broker endpoint URL.
    pub url: String,

    /// Client-id prefix; a random suffix is appended per connection.
    pub client_id_prefix: String,

    /// Bound on the initial connection attempt.
    pub connect_timeout_secs: u64,

    /// Fixed delay between automatic reconnect attempts.
    pub reconnect_delay_ms: u64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        BrokerSettings {
            // The development/test broker; stores override this per site.
            url: "wss://test.mosquitto.org:8081/mqtt".to_string(),
            client_id_prefix: "tablet".to_string(),
            connect_timeout_secs: 10,
            reconnect_delay_ms: 2_000,
        }
    }
}

/// Snapshot publisher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherSettings {
    /// Publish cadence in milliseconds.
    pub interval_ms: u64,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        PublisherSettings { interval_ms: 1_000 }
    }
}

/// Catalog search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Input quiescence window before a lookup fires.
    pub debounce_ms: u64,

    /// Minimum query length before a lookup is attempted.
    pub min_query_len: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            debounce_ms: 300,
            min_query_len: 2,
        }
    }
}

// =============================================================================
// Sync Config
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub broker: BrokerSettings,
    pub publisher: PublisherSettings,
    pub search: SearchSettings,
}

impl SyncConfig {
    /// Loads configuration: file (explicit path or the platform config
    /// dir), then environment overrides, then validation.
    pub fn load_or_default(path: Option<PathBuf>) -> SyncResult<Self> {
        let path = path.or_else(default_config_path);

        let mut config = match path {
            Some(ref path) if path.exists() => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| SyncError::Config(format!("read {}: {}", path.display(), e)))?;
                let config: SyncConfig = toml::from_str(&text)
                    .map_err(|e| SyncError::Config(format!("parse {}: {}", path.display(), e)))?;
                info!(path = %path.display(), "Loaded sync configuration");
                config
            }
            _ => {
                debug!("No config file, using defaults");
                SyncConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Applies `TROLI_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TROLI_BROKER_URL") {
            debug!(url = %url, "Broker URL overridden from environment");
            self.broker.url = url;
        }
        if let Ok(prefix) = std::env::var("TROLI_CLIENT_PREFIX") {
            self.broker.client_id_prefix = prefix;
        }
        if let Ok(ms) = std::env::var("TROLI_PUBLISH_INTERVAL_MS") {
            if let Ok(ms) = ms.parse() {
                self.publisher.interval_ms = ms;
            }
        }
        if let Ok(ms) = std::env::var("TROLI_DEBOUNCE_MS") {
            if let Ok(ms) = ms.parse() {
                self.search.debounce_ms = ms;
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.broker.url.trim().is_empty() {
            return Err(SyncError::Config("broker URL is required".into()));
        }

        url::Url::parse(&self.broker.url)
            .map_err(|e| SyncError::Config(format!("broker URL: {}", e)))?;

        if self.publisher.interval_ms == 0 {
            return Err(SyncError::Config("publish interval must be > 0".into()));
        }

        if self.search.min_query_len == 0 {
            return Err(SyncError::Config("min query length must be > 0".into()));
        }

        Ok(())
    }

    /// Transport configuration derived from the broker section.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            url: self.broker.url.clone(),
            client_id_prefix: self.broker.client_id_prefix.clone(),
            connect_timeout: Duration::from_secs(self.broker.connect_timeout_secs),
            reconnect_delay: Duration::from_millis(self.broker.reconnect_delay_ms),
            ..Default::default()
        }
    }

    /// Publisher cadence as a Duration.
    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publisher.interval_ms)
    }

    /// Search debounce window as a Duration.
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }
}

/// Platform config file path: `<config dir>/sync.toml`.
fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "troli", "troli-pos")
        .map(|dirs| dirs.config_dir().join("sync.toml"))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_constants() {
        let config = SyncConfig::default();

        assert_eq!(config.broker.connect_timeout_secs, 10);
        assert_eq!(config.broker.reconnect_delay_ms, 2_000);
        assert_eq!(config.publisher.interval_ms, 1_000);
        assert_eq!(config.search.debounce_ms, 300);
        assert_eq!(config.search.min_query_len, 2);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: SyncConfig = toml::from_str(
            r#"
            [broker]
            url = "mqtt://broker.lan"

            [publisher]
            interval_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.broker.url, "mqtt://broker.lan");
        assert_eq!(config.publisher.interval_ms, 500);
        // Unspecified sections fall back to defaults
        assert_eq!(config.search.debounce_ms, 300);
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let mut config = SyncConfig::default();
        config.broker.url = "".into();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.broker.url = "not a url".into();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.publisher.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transport_config_derivation() {
        let config = SyncConfig::default();
        let transport = config.transport_config();

        assert_eq!(transport.url, config.broker.url);
        assert_eq!(transport.connect_timeout, Duration::from_secs(10));
        assert_eq!(transport.reconnect_delay, Duration::from_secs(2));
    }
}
