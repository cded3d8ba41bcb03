//! Integration lifecycle
//!
//! Turns a stored [`ConfigEntry`] into a running integration instance and
//! back. Setup either completes fully or leaves nothing behind: on any
//! failure the client is closed and no entity stays registered.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::{CoordinatorConfig, Platform, PLATFORMS};
use crate::coordinator::{Coordinator, CoordinatorEvent, PollScheduler};
use crate::error::{FailureKind, SetupError};
use crate::registry::EntityRegistry;
use crate::sensor::SensorEntity;
use crate::snapshot::DeviceSnapshot;
use crate::traits::{ConfigEntry, DeviceApi, DeviceApiFactory, Entity, Poller};

/// A running integration instance for one config entry
pub struct Integration {
    entry_id: String,
    device_id: String,
    coordinator: Arc<Coordinator>,
    sensors: Vec<Arc<SensorEntity>>,
    registry: Arc<EntityRegistry>,
    scheduler: PollScheduler,
}

impl Integration {
    /// Set up an integration instance
    ///
    /// # Steps
    ///
    /// 1. Create a client on the shared session and authenticate it
    /// 2. Run the first refresh
    /// 3. Create and register the entities of every platform
    /// 4. Start periodic polling
    ///
    /// # Returns
    ///
    /// - `Ok((integration, events))`: running, with the coordinator's event stream
    /// - `Err(SetupError::AuthFailed)`: the stored credentials were rejected
    /// - `Err(SetupError::NotReady)`: the device could not be reached
    pub async fn setup(
        entry: &ConfigEntry,
        factory: &dyn DeviceApiFactory,
        registry: Arc<EntityRegistry>,
        config: &CoordinatorConfig,
    ) -> Result<(Self, mpsc::Receiver<CoordinatorEvent>), SetupError> {
        let host = entry.data.host.as_str();
        let api: Arc<dyn DeviceApi> = Arc::from(factory.create(host)?);

        if let Err(e) = api.authenticate(&entry.data.api_key).await {
            error!("Failed to authenticate with {}: {}", host, e);
            api.close().await;
            return Err(match e.kind() {
                FailureKind::Authentication => SetupError::AuthFailed(e.to_string()),
                _ => SetupError::NotReady(e.to_string()),
            });
        }

        let (coordinator, events) = match Coordinator::new(Arc::clone(&api), config) {
            Ok(created) => created,
            Err(e) => {
                api.close().await;
                return Err(e.into());
            }
        };
        let coordinator = Arc::new(coordinator);

        let snapshot = match coordinator.first_refresh().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                coordinator.close().await;
                return Err(e.into());
            }
        };

        let device_id = snapshot
            .device_id
            .clone()
            .unwrap_or_else(|| "unknown".to_string());

        let mut sensors = Vec::new();
        for platform in PLATFORMS {
            match platform {
                Platform::Sensor => sensors.extend(
                    SensorEntity::for_device(&coordinator, &device_id)
                        .into_iter()
                        .map(Arc::new),
                ),
            }
        }

        let mut registered: Vec<String> = Vec::with_capacity(sensors.len());
        for sensor in &sensors {
            let entity = Arc::clone(sensor);
            if let Err(e) = registry.register(entity) {
                error!("Failed to register entities of {}: {}", device_id, e);
                for unique_id in &registered {
                    registry.unregister(unique_id);
                }
                coordinator.close().await;
                return Err(e.into());
            }
            registered.push(sensor.unique_id());
        }

        let poller: Arc<dyn Poller<DeviceSnapshot>> = coordinator.clone();
        let scheduler = match PollScheduler::spawn(poller) {
            Ok(scheduler) => scheduler,
            Err(e) => {
                error!("Failed to start polling of {}: {}", device_id, e);
                for unique_id in &registered {
                    registry.unregister(unique_id);
                }
                coordinator.close().await;
                return Err(e.into());
            }
        };

        info!(
            "Set up entry {} for device {} with {} entities",
            entry.entry_id,
            device_id,
            sensors.len()
        );

        let integration = Self {
            entry_id: entry.entry_id.clone(),
            device_id,
            coordinator,
            sensors,
            registry,
            scheduler,
        };

        Ok((integration, events))
    }

    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Entities created by this instance
    pub fn entities(&self) -> &[Arc<SensorEntity>] {
        &self.sensors
    }

    /// Tear the instance down
    ///
    /// Entities are unregistered first, then polling stops (waiting for an
    /// in-flight refresh) and finally the coordinator closes the client.
    pub async fn teardown(self) {
        for sensor in &self.sensors {
            let unique_id = sensor.unique_id();
            if !self.registry.unregister(&unique_id) {
                warn!("Entity {} was not registered", unique_id);
            }
        }

        self.scheduler.shutdown().await;
        self.coordinator.close().await;

        info!("Unloaded entry {}", self.entry_id);
    }
}
