// # Entity Trait
//
// Defines the read accessors the host's entity registry expects from every
// entity this integration exposes.

use serde::{Deserialize, Serialize};

use crate::snapshot::SensorValue;

/// Device registry metadata for the device an entity belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// `(domain, device_id)` pairs identifying the device
    pub identifiers: Vec<(String, String)>,
    /// Device name
    pub name: String,
    /// Manufacturer
    pub manufacturer: String,
    /// Model
    pub model: String,
    /// Firmware version
    pub sw_version: String,
}

/// Read-only view of one entity
///
/// Implementations are projections over state owned elsewhere; every call
/// reflects the current state at the time of the call.
pub trait Entity: Send + Sync {
    /// Stable id, never regenerated across restarts
    fn unique_id(&self) -> String;

    /// Display name
    fn name(&self) -> &str;

    /// Metadata of the owning device
    fn device_info(&self) -> DeviceInfo;

    /// Current reading, `None` when the device did not report one
    fn native_value(&self) -> Option<SensorValue>;

    /// Whether the current reading can be trusted
    fn available(&self) -> bool;

    /// Unit of the reading
    fn unit_of_measurement(&self) -> Option<&'static str> {
        None
    }

    /// Number of decimals to display
    fn suggested_display_precision(&self) -> Option<u8> {
        None
    }

    /// Rendered state as the host would show it
    fn state(&self) -> String {
        if !self.available() {
            return "unavailable".to_string();
        }
        match self.native_value() {
            Some(value) => value.format(self.suggested_display_precision()),
            None => "unknown".to_string(),
        }
    }
}
