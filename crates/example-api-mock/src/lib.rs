// # Mock Device API
//
// This crate provides a simulated device behind the `DeviceApi` trait, used
// until real device protocols exist and by the daemon and demos.
//
// ## Behaviour
//
// - Every call waits for a configurable simulated latency (100 ms by default)
// - The API key `"invalid"` is rejected; any other key is accepted
// - Data operations fail with an authentication error until `authenticate`
//   has succeeded
// - Readings are random: temperature 20 ± 5 °C, humidity 50 ± 10 %,
//   battery 80 to 100 %
//
// ## Sessions
//
// Clients built with `create` share the factory's HTTP session. Clients built
// with `create_scoped` get a private session that is released on `close`.
//
// ## Security Requirements
//
// - The API key NEVER appears in logs or Debug output

use async_trait::async_trait;
use example_core::config::ApiConfig;
use example_core::traits::{DeviceApi, DeviceApiFactory};
use example_core::{DeviceSnapshot, Error, Result};
use rand::Rng;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// API key the simulated device always rejects
pub const INVALID_API_KEY: &str = "invalid";

/// Device id reported by the simulated device
pub const MOCK_DEVICE_ID: &str = "example_device_001";

/// Model reported by the simulated device
pub const MOCK_MODEL: &str = "Example Model v1.0";

/// Firmware reported by the simulated device
pub const MOCK_FIRMWARE: &str = "1.2.3";

/// Simulated device client
pub struct MockApiClient {
    /// Device hostname or IP address
    host: String,

    /// HTTP session, `None` once the client has been closed
    session: Mutex<Option<reqwest::Client>>,

    /// Set by a successful `authenticate`, cleared by `close`
    authenticated: AtomicBool,

    /// Delay applied to every call
    latency: Duration,
}

// Custom Debug implementation that hides the session internals
impl std::fmt::Debug for MockApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockApiClient")
            .field("host", &self.host)
            .field("authenticated", &self.is_authenticated())
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

impl MockApiClient {
    /// Create a new client on an existing HTTP session
    pub fn new(host: impl Into<String>, session: reqwest::Client, latency: Duration) -> Self {
        Self {
            host: host.into(),
            session: Mutex::new(Some(session)),
            authenticated: AtomicBool::new(false),
            latency,
        }
    }

    /// Whether the client still holds its HTTP session
    pub fn has_session(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn ensure_authenticated(&self) -> Result<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(Error::auth("Not authenticated"))
        }
    }

    /// Payload as the device reports it on the wire
    fn device_payload(&self) -> serde_json::Value {
        let mut rng = rand::thread_rng();
        let temperature = round_tenth(20.0 + rng.gen_range(-5.0..=5.0));
        let humidity = round_tenth(50.0 + rng.gen_range(-10.0..=10.0));
        let battery: i64 = rng.gen_range(80..=100);

        json!({
            "device_id": MOCK_DEVICE_ID,
            "name": format!("Example Device ({})", self.host),
            "model": MOCK_MODEL,
            "firmware": MOCK_FIRMWARE,
            "online": true,
            "sensors": {
                "temperature": temperature,
                "humidity": humidity,
                "battery": battery,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[async_trait]
impl DeviceApi for MockApiClient {
    async fn authenticate(&self, api_key: &str) -> Result<()> {
        self.simulate_latency().await;

        if api_key == INVALID_API_KEY {
            return Err(Error::auth("Invalid API key"));
        }

        self.authenticated.store(true, Ordering::SeqCst);
        info!("Successfully authenticated with device at {}", self.host);
        Ok(())
    }

    async fn fetch_device_data(&self) -> Result<DeviceSnapshot> {
        self.ensure_authenticated()?;
        self.simulate_latency().await;

        let snapshot: DeviceSnapshot = serde_json::from_value(self.device_payload())?;
        debug!("Fetched data from device at {}", self.host);
        Ok(snapshot)
    }

    async fn set_device_state(&self, on: bool) -> Result<()> {
        self.ensure_authenticated()?;
        self.simulate_latency().await;

        info!("Set device at {} to {}", self.host, if on { "on" } else { "off" });
        Ok(())
    }

    async fn close(&self) {
        self.authenticated.store(false, Ordering::SeqCst);
        let released = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if released.is_some() {
            debug!("Closed connection to device at {}", self.host);
        }
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    fn host(&self) -> &str {
        &self.host
    }
}

/// Factory for creating mock clients
pub struct MockApiFactory {
    /// Session shared by every client built with `create`
    session: reqwest::Client,

    /// Timeout and latency settings
    config: ApiConfig,
}

impl MockApiFactory {
    /// Create a factory with its own shared session
    pub fn new(config: ApiConfig) -> Result<Self> {
        config.validate()?;
        let session = build_session(&config)?;
        Ok(Self { session, config })
    }

    /// Create a factory that hands out an existing session
    pub fn with_session(session: reqwest::Client, config: ApiConfig) -> Self {
        Self { session, config }
    }

    fn check_host(host: &str) -> Result<()> {
        if host.trim().is_empty() {
            return Err(Error::config("Host is required"));
        }
        Ok(())
    }
}

impl DeviceApiFactory for MockApiFactory {
    fn create(&self, host: &str) -> Result<Box<dyn DeviceApi>> {
        Self::check_host(host)?;
        Ok(Box::new(MockApiClient::new(
            host,
            self.session.clone(),
            self.config.simulated_latency(),
        )))
    }

    fn create_scoped(&self, host: &str) -> Result<Box<dyn DeviceApi>> {
        Self::check_host(host)?;
        let session = build_session(&self.config)?;
        Ok(Box::new(MockApiClient::new(
            host,
            session,
            self.config.simulated_latency(),
        )))
    }
}

fn build_session(config: &ApiConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| Error::config(format!("Failed to build HTTP session: {}", e)))
}
