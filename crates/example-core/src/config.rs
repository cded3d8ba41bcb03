//! Configuration types for the example integration
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Integration domain, used as the prefix of every entity unique id
pub const DOMAIN: &str = "example_integration";

/// Default polling interval (in seconds)
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 30;

/// Host pre-filled in the setup form
pub const DEFAULT_HOST: &str = "192.168.1.100";

/// Entity platforms provided by this integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Read-only numeric sensors
    Sensor,
}

/// Platforms set up for every config entry
pub const PLATFORMS: &[Platform] = &[Platform::Sensor];

/// Connection parameters for one device
///
/// Immutable once an integration instance has been created.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Device hostname or IP address
    pub host: String,

    /// API key used to authenticate
    pub api_key: String,
}

impl Credentials {
    /// Create new credentials
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
        }
    }

    /// Validate the credentials
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.host.trim().is_empty() {
            return Err(crate::Error::config("Host cannot be empty"));
        }
        if self.api_key.is_empty() {
            return Err(crate::Error::config("API key cannot be empty"));
        }
        Ok(())
    }
}

// The API key never appears in Debug output
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

/// Main integration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Device connection parameters
    pub credentials: Credentials,

    /// Coordinator settings
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// API client settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl IntegrationConfig {
    /// Create a new configuration with defaults for everything but the credentials
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            coordinator: CoordinatorConfig::default(),
            api: ApiConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.credentials.validate()?;
        self.coordinator.validate()?;
        self.api.validate()?;
        Ok(())
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Interval between scheduled refreshes (in seconds)
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Capacity of the coordinator event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 100 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl CoordinatorConfig {
    /// Refresh period as a [`Duration`]
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    /// Validate the coordinator configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.update_interval_secs == 0 {
            return Err(crate::Error::config("Update interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: default_update_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// API client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Timeout applied by the HTTP session to every request (in seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Simulated network latency of the mock device (in milliseconds)
    #[serde(default = "default_simulated_latency_ms")]
    pub simulated_latency_ms: u64,
}

impl ApiConfig {
    /// Request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Simulated latency as a [`Duration`]
    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }

    /// Validate the API configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("Request timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            simulated_latency_ms: default_simulated_latency_ms(),
        }
    }
}

fn default_update_interval_secs() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}

fn default_event_channel_capacity() -> usize {
    100
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_simulated_latency_ms() -> u64 {
    100
}
