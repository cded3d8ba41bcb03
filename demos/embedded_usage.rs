//! Minimal embedding example for example-core
//!
//! This example demonstrates using example-core as a library in a custom
//! application with its own device client. The integration lifecycle is fully
//! managed by the application.

use async_trait::async_trait;
use example_api_mock::{MockApiFactory, INVALID_API_KEY};
use example_core::config::{ApiConfig, CoordinatorConfig, Credentials};
use example_core::{
    validate_input, ConfigEntry, DeviceApi, DeviceApiFactory, DeviceSnapshot, EntityRegistry,
    EntryStore, Integration, MemoryEntryStore, Result,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

/// In-process device whose temperature rises on every fetch
struct EmbeddedThermometer {
    host: String,
    authenticated: AtomicBool,
    fetches: Arc<AtomicUsize>,
}

#[async_trait]
impl DeviceApi for EmbeddedThermometer {
    async fn authenticate(&self, _api_key: &str) -> Result<()> {
        self.authenticated.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_device_data(&self) -> Result<DeviceSnapshot> {
        if !self.authenticated.load(Ordering::SeqCst) {
            return Err(example_core::Error::auth("Not authenticated"));
        }
        let n = self.fetches.fetch_add(1, Ordering::SeqCst);

        Ok(DeviceSnapshot::new("embedded_001")
            .with_name("Embedded Thermometer")
            .with_online(true)
            .with_sensor("temperature", 20.0 + n as f64 * 0.5)
            .with_sensor("battery", 100_i64))
    }

    async fn set_device_state(&self, on: bool) -> Result<()> {
        println!("[Embedded] Device switched {}", if on { "on" } else { "off" });
        Ok(())
    }

    async fn close(&self) {
        self.authenticated.store(false, Ordering::SeqCst);
        println!("[Embedded] Session closed");
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    fn host(&self) -> &str {
        &self.host
    }
}

struct EmbeddedFactory {
    fetches: Arc<AtomicUsize>,
}

impl DeviceApiFactory for EmbeddedFactory {
    fn create(&self, host: &str) -> Result<Box<dyn DeviceApi>> {
        Ok(Box::new(EmbeddedThermometer {
            host: host.to_string(),
            authenticated: AtomicBool::new(false),
            fetches: Arc::clone(&self.fetches),
        }))
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    println!("=== Embedded example-core Example ===\n");

    // Validation against the simulated device
    println!("1. Validating credentials against the mock device...");
    let mock = MockApiFactory::new(ApiConfig::default())?;
    match validate_input(&mock, "10.0.0.2", INVALID_API_KEY).await {
        Ok(device) => println!("   unexpected success: {:?}", device),
        Err(e) => println!("   '{}' rejected with code {}", INVALID_API_KEY, e.code()),
    }

    // Custom device
    println!("2. Storing a config entry for the embedded device...");
    let store = MemoryEntryStore::new();
    let entry = ConfigEntry::new("Embedded Thermometer", Credentials::new("local", "unused"))
        .with_unique_id("embedded_001");
    store.add(entry.clone()).await?;

    let fetches = Arc::new(AtomicUsize::new(0));
    let factory = EmbeddedFactory {
        fetches: Arc::clone(&fetches),
    };
    let registry = Arc::new(EntityRegistry::new());
    let config = CoordinatorConfig {
        update_interval_secs: 1,
        ..CoordinatorConfig::default()
    };

    println!("3. Setting up the integration...");
    let (integration, mut events) =
        Integration::setup(&entry, &factory, Arc::clone(&registry), &config).await?;

    let event_listener = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("[Event] {:?}", event);
        }
    });

    for _ in 0..3 {
        for view in registry.states() {
            println!("   {} = {}", view.unique_id, view.state);
        }
        tokio::time::sleep(Duration::from_millis(1100)).await;
    }

    println!("4. Tearing down...");
    integration.teardown().await;
    event_listener.abort();

    println!("\n=== Embedding Successful ===");
    println!("Fetches performed: {}", fetches.load(Ordering::SeqCst));
    println!("Entities left registered: {}", registry.len());

    Ok(())
}

