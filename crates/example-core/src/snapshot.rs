//! Device snapshot types
//!
//! A [`DeviceSnapshot`] is one complete poll result. The coordinator replaces
//! its current snapshot in one step; a snapshot is never mutated after it has
//! been published.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One sensor reading
///
/// Devices report whole numbers for counters such as battery level and
/// decimals for continuous measurements; both are kept as reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    /// Whole-number reading (e.g. battery percentage)
    Integer(i64),
    /// Continuous reading (e.g. temperature)
    Float(f64),
}

impl SensorValue {
    /// The reading as a floating point number
    pub fn as_f64(&self) -> f64 {
        match *self {
            SensorValue::Integer(v) => v as f64,
            SensorValue::Float(v) => v,
        }
    }

    /// Format the reading with a fixed number of decimals
    ///
    /// `None` keeps integers as integers and floats in their shortest form.
    pub fn format(&self, precision: Option<u8>) -> String {
        match (precision, *self) {
            (Some(p), value) => format!("{:.*}", p as usize, value.as_f64()),
            (None, SensorValue::Integer(v)) => v.to_string(),
            (None, SensorValue::Float(v)) => v.to_string(),
        }
    }
}

impl From<i64> for SensorValue {
    fn from(value: i64) -> Self {
        SensorValue::Integer(value)
    }
}

impl From<f64> for SensorValue {
    fn from(value: f64) -> Self {
        SensorValue::Float(value)
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(None))
    }
}

/// Complete, immutable result of one successful poll
///
/// Devices may omit descriptive fields; consumers apply their own fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Stable device identifier
    #[serde(default)]
    pub device_id: Option<String>,

    /// Human-readable device name
    #[serde(default)]
    pub name: Option<String>,

    /// Device model
    #[serde(default)]
    pub model: Option<String>,

    /// Firmware version
    #[serde(default)]
    pub firmware: Option<String>,

    /// Whether the device reports itself as online
    #[serde(default)]
    pub online: bool,

    /// Sensor readings keyed by sensor kind
    #[serde(default)]
    pub sensors: BTreeMap<String, SensorValue>,

    /// Device-reported timestamp of the readings
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl DeviceSnapshot {
    /// Create an empty snapshot for a device
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            ..Self::default()
        }
    }

    /// Set the device name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the device model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the firmware version
    pub fn with_firmware(mut self, firmware: impl Into<String>) -> Self {
        self.firmware = Some(firmware.into());
        self
    }

    /// Set the online flag
    pub fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    /// Add a sensor reading
    pub fn with_sensor(mut self, key: impl Into<String>, value: impl Into<SensorValue>) -> Self {
        self.sensors.insert(key.into(), value.into());
        self
    }

    /// Set the timestamp
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Reading for one sensor key, if reported
    pub fn sensor(&self, key: &str) -> Option<SensorValue> {
        self.sensors.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_partial_payload() {
        let snapshot: DeviceSnapshot = serde_json::from_value(serde_json::json!({
            "device_id": "test_device_123",
            "name": "Test Device",
        }))
        .unwrap();

        assert_eq!(snapshot.device_id.as_deref(), Some("test_device_123"));
        assert_eq!(snapshot.model, None);
        assert!(!snapshot.online);
        assert!(snapshot.sensors.is_empty());
    }

    #[test]
    fn test_sensor_values_keep_their_type() {
        let snapshot: DeviceSnapshot = serde_json::from_value(serde_json::json!({
            "sensors": { "temperature": 22.5, "battery": 95 }
        }))
        .unwrap();

        assert_eq!(snapshot.sensor("temperature"), Some(SensorValue::Float(22.5)));
        assert_eq!(snapshot.sensor("battery"), Some(SensorValue::Integer(95)));
        assert_eq!(snapshot.sensor("humidity"), None);
    }

    #[test]
    fn test_format_precision() {
        assert_eq!(SensorValue::Float(22.46).format(Some(1)), "22.5");
        assert_eq!(SensorValue::Integer(95).format(None), "95");
        assert_eq!(SensorValue::Integer(55).format(Some(1)), "55.0");
    }
}
