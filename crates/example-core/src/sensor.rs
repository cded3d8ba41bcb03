//! Sensor entities
//!
//! Each configured device exposes one [`SensorEntity`] per [`SensorKind`].
//! Entities hold no readings of their own; every accessor projects the
//! coordinator's current snapshot.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::DOMAIN;
use crate::coordinator::Coordinator;
use crate::snapshot::{DeviceSnapshot, SensorValue};
use crate::traits::{DeviceInfo, Entity};

/// Device name shown when the device does not report one
pub const DEFAULT_DEVICE_NAME: &str = "Example Device";

/// Model shown when the device does not report one
pub const DEFAULT_MODEL: &str = "Unknown Model";

/// Firmware version shown when the device does not report one
pub const DEFAULT_FIRMWARE: &str = "Unknown";

/// Manufacturer of every device handled by this integration
pub const MANUFACTURER: &str = "Example Manufacturer";

/// The measured quantity a sensor exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Battery,
}

impl SensorKind {
    /// Every kind, in the order entities are created
    pub const ALL: [SensorKind; 3] = [
        SensorKind::Temperature,
        SensorKind::Humidity,
        SensorKind::Battery,
    ];

    /// Key of the reading in the snapshot's sensor map
    pub fn key(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Battery => "battery",
        }
    }

    /// Display name of the entity
    pub fn name(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "Temperature",
            SensorKind::Humidity => "Humidity",
            SensorKind::Battery => "Battery",
        }
    }

    /// Device class understood by the host
    pub fn device_class(&self) -> &'static str {
        self.key()
    }

    /// State class; all readings are instantaneous measurements
    pub fn state_class(&self) -> &'static str {
        "measurement"
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "°C",
            SensorKind::Humidity | SensorKind::Battery => "%",
        }
    }

    pub fn display_precision(&self) -> Option<u8> {
        match self {
            SensorKind::Temperature | SensorKind::Humidity => Some(1),
            SensorKind::Battery => None,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Build the unique id of a sensor
pub fn unique_id(device_id: &str, kind: SensorKind) -> String {
    format!("{}_{}_{}", DOMAIN, device_id, kind.key())
}

/// Build device registry metadata from a snapshot, applying fallbacks
///
/// With no snapshot at all every descriptive field takes its fallback.
pub fn device_info(device_id: &str, snapshot: Option<&DeviceSnapshot>) -> DeviceInfo {
    let or_default = |value: Option<&String>, fallback: &str| {
        value.cloned().unwrap_or_else(|| fallback.to_string())
    };

    DeviceInfo {
        identifiers: vec![(DOMAIN.to_string(), device_id.to_string())],
        name: or_default(snapshot.and_then(|s| s.name.as_ref()), DEFAULT_DEVICE_NAME),
        manufacturer: MANUFACTURER.to_string(),
        model: or_default(snapshot.and_then(|s| s.model.as_ref()), DEFAULT_MODEL),
        sw_version: or_default(snapshot.and_then(|s| s.firmware.as_ref()), DEFAULT_FIRMWARE),
    }
}

/// A read-only sensor bound to one coordinator
pub struct SensorEntity {
    coordinator: Arc<Coordinator>,
    device_id: String,
    kind: SensorKind,
}

impl SensorEntity {
    pub fn new(coordinator: Arc<Coordinator>, device_id: impl Into<String>, kind: SensorKind) -> Self {
        Self {
            coordinator,
            device_id: device_id.into(),
            kind,
        }
    }

    /// One entity per kind for a device
    pub fn for_device(coordinator: &Arc<Coordinator>, device_id: &str) -> Vec<SensorEntity> {
        SensorKind::ALL
            .iter()
            .map(|kind| SensorEntity::new(Arc::clone(coordinator), device_id, *kind))
            .collect()
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

impl fmt::Debug for SensorEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorEntity")
            .field("device_id", &self.device_id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Entity for SensorEntity {
    fn unique_id(&self) -> String {
        unique_id(&self.device_id, self.kind)
    }

    fn name(&self) -> &str {
        self.kind.name()
    }

    fn device_info(&self) -> DeviceInfo {
        device_info(&self.device_id, self.coordinator.data().as_deref())
    }

    fn native_value(&self) -> Option<SensorValue> {
        self.coordinator
            .data()
            .and_then(|snapshot| snapshot.sensor(self.kind.key()))
    }

    /// The coordinator must be healthy and the device must report itself online
    fn available(&self) -> bool {
        self.coordinator.is_healthy()
            && self
                .coordinator
                .data()
                .is_some_and(|snapshot| snapshot.online)
    }

    fn unit_of_measurement(&self) -> Option<&'static str> {
        Some(self.kind.unit())
    }

    fn suggested_display_precision(&self) -> Option<u8> {
        self.kind.display_precision()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_id_format() {
        assert_eq!(
            unique_id("d1", SensorKind::Temperature),
            "example_integration_d1_temperature"
        );
        assert_eq!(
            unique_id("example_device_001", SensorKind::Battery),
            "example_integration_example_device_001_battery"
        );
    }

    #[test]
    fn test_unique_ids_distinct_per_kind() {
        let ids: std::collections::HashSet<_> =
            SensorKind::ALL.iter().map(|k| unique_id("d1", *k)).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_kind_attributes() {
        assert_eq!(SensorKind::Temperature.unit(), "°C");
        assert_eq!(SensorKind::Humidity.unit(), "%");
        assert_eq!(SensorKind::Battery.unit(), "%");
        assert_eq!(SensorKind::Temperature.display_precision(), Some(1));
        assert_eq!(SensorKind::Battery.display_precision(), None);
        assert_eq!(SensorKind::Humidity.state_class(), "measurement");
    }

    #[test]
    fn test_device_info_fallbacks() {
        let info = device_info("d1", None);
        assert_eq!(info.name, DEFAULT_DEVICE_NAME);
        assert_eq!(info.model, DEFAULT_MODEL);
        assert_eq!(info.sw_version, DEFAULT_FIRMWARE);
        assert_eq!(info.manufacturer, MANUFACTURER);
        assert_eq!(info.identifiers, vec![(DOMAIN.to_string(), "d1".to_string())]);

        let partial = DeviceSnapshot::new("d1").with_name("Kitchen");
        let info = device_info("d1", Some(&partial));
        assert_eq!(info.name, "Kitchen");
        assert_eq!(info.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_device_info_from_snapshot() {
        let snapshot = DeviceSnapshot::new("d1")
            .with_name("Kitchen")
            .with_model("Example Model v1.0")
            .with_firmware("1.2.3");
        let info = device_info("d1", Some(&snapshot));
        assert_eq!(info.name, "Kitchen");
        assert_eq!(info.model, "Example Model v1.0");
        assert_eq!(info.sw_version, "1.2.3");
    }
}
