//! Contract Test: Entity Availability and Projection
//!
//! This test verifies that sensor entities are pure projections of the
//! coordinator's current snapshot.
//!
//! Constraints verified:
//! - An entity is available only if the coordinator is healthy AND the
//!   device reports itself online
//! - Values come straight from the current snapshot, or are absent
//! - Health is updated before a new snapshot is published
//! - Unique ids and device metadata are stable and use fallbacks
//!
//! If this test fails, someone has:
//! - Cached readings inside entities
//! - Shown stale data as available
//! - Changed the unique id format (breaks every existing installation)

mod common;

use common::*;
use example_core::sensor::{DEFAULT_DEVICE_NAME, DEFAULT_FIRMWARE, DEFAULT_MODEL, MANUFACTURER};
use example_core::{DeviceSnapshot, Entity, SensorEntity, SensorKind, SensorValue};
use std::time::Duration;
use tokio_stream::StreamExt;

#[tokio::test]
async fn temperature_sensor_reports_current_reading() {
    let api = ScriptedApi::new("10.0.0.2").with_fetches(vec![Step::Data(snapshot("d1", 22.5))]);
    let (coordinator, _events) = start_coordinator(api).await;
    coordinator.first_refresh().await.unwrap();

    let sensor = SensorEntity::new(coordinator.clone(), "d1", SensorKind::Temperature);

    assert_eq!(sensor.native_value(), Some(SensorValue::Float(22.5)));
    assert_eq!(sensor.unique_id(), "example_integration_d1_temperature");
    assert!(sensor.available());
    assert_eq!(sensor.state(), "22.5");
    assert_eq!(sensor.unit_of_measurement(), Some("°C"));
    assert_eq!(sensor.name(), "Temperature");
}

#[tokio::test]
async fn available_when_healthy_and_online() {
    let api = ScriptedApi::new("10.0.0.2").with_fetches(vec![Step::Data(snapshot("d1", 22.5))]);
    let (coordinator, _events) = start_coordinator(api).await;
    coordinator.refresh().await.unwrap();

    let sensor = SensorEntity::new(coordinator, "d1", SensorKind::Humidity);
    assert!(sensor.available());
}

#[tokio::test]
async fn unavailable_when_device_offline() {
    let offline = snapshot("d1", 22.5).with_online(false);
    let api = ScriptedApi::new("10.0.0.2").with_fetches(vec![Step::Data(offline)]);
    let (coordinator, _events) = start_coordinator(api).await;
    coordinator.refresh().await.unwrap();
    assert!(coordinator.is_healthy());

    let sensor = SensorEntity::new(coordinator, "d1", SensorKind::Temperature);
    assert!(!sensor.available());
    assert_eq!(sensor.state(), "unavailable");
    // The reading itself is still projected
    assert_eq!(sensor.native_value(), Some(SensorValue::Float(22.5)));
}

#[tokio::test]
async fn unavailable_when_degraded_even_if_online() {
    let api = ScriptedApi::new("10.0.0.2")
        .with_fetches(vec![Step::Data(snapshot("d1", 22.5)), Step::ConnectionError]);
    let (coordinator, _events) = start_coordinator(api).await;
    coordinator.refresh().await.unwrap();
    coordinator.refresh().await.unwrap_err();

    let sensor = SensorEntity::new(coordinator.clone(), "d1", SensorKind::Temperature);
    assert!(coordinator.data().unwrap().online);
    assert!(!sensor.available(), "stale data must not be shown as available");
    // The last good reading is still what the sensor projects
    assert_eq!(sensor.native_value(), Some(SensorValue::Float(22.5)));
    assert_eq!(sensor.state(), "unavailable");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn subscribers_see_recovered_snapshot_as_available() {
    let api = ScriptedApi::new("10.0.0.2").with_fetches(vec![
        Step::Data(snapshot("d1", 22.5)),
        Step::ConnectionError,
        Step::Data(snapshot("d1", 23.0)),
    ]);
    let (coordinator, _events) = start_coordinator(api).await;
    coordinator.refresh().await.unwrap();
    coordinator.refresh().await.unwrap_err();

    let sensor = SensorEntity::new(coordinator.clone(), "d1", SensorKind::Temperature);
    let mut updates = coordinator.subscribe();
    let observer = tokio::spawn(async move {
        let fresh = updates.next().await.expect("stream open");
        (fresh.sensor("temperature"), sensor.available())
    });

    coordinator.refresh().await.unwrap();

    let (value, available) = tokio::time::timeout(Duration::from_secs(1), observer)
        .await
        .expect("recovered snapshot is published")
        .unwrap();
    assert_eq!(value, Some(SensorValue::Float(23.0)));
    assert!(available, "a fresh snapshot must never be seen with degraded health");
}

#[tokio::test]
async fn unavailable_when_degraded_and_offline() {
    let offline = snapshot("d1", 22.5).with_online(false);
    let api = ScriptedApi::new("10.0.0.2")
        .with_fetches(vec![Step::Data(offline), Step::ConnectionError]);
    let (coordinator, _events) = start_coordinator(api).await;
    coordinator.refresh().await.unwrap();
    coordinator.refresh().await.unwrap_err();

    let sensor = SensorEntity::new(coordinator, "d1", SensorKind::Battery);
    assert!(!sensor.available());
}

#[tokio::test]
async fn unavailable_before_any_data() {
    let (coordinator, _events) = start_coordinator(ScriptedApi::new("10.0.0.2")).await;

    let sensor = SensorEntity::new(coordinator, "d1", SensorKind::Temperature);
    assert!(!sensor.available());
    assert_eq!(sensor.native_value(), None);
}

#[tokio::test]
async fn missing_reading_is_absent_not_an_error() {
    let partial = DeviceSnapshot::new("d1")
        .with_online(true)
        .with_sensor("temperature", 21.0);
    let api = ScriptedApi::new("10.0.0.2").with_fetches(vec![Step::Data(partial)]);
    let (coordinator, _events) = start_coordinator(api).await;
    coordinator.refresh().await.unwrap();

    let humidity = SensorEntity::new(coordinator.clone(), "d1", SensorKind::Humidity);
    assert_eq!(humidity.native_value(), None);
    assert_eq!(humidity.state(), "unknown");

    // Display precision pads whole readings
    let temperature = SensorEntity::new(coordinator, "d1", SensorKind::Temperature);
    assert_eq!(temperature.state(), "21.0");
}

#[tokio::test]
async fn entities_follow_each_new_snapshot() {
    let api = ScriptedApi::new("10.0.0.2").with_fetches(vec![
        Step::Data(snapshot("d1", 22.5)),
        Step::Data(snapshot("d1", 24.1)),
    ]);
    let (coordinator, _events) = start_coordinator(api).await;
    let sensor = SensorEntity::new(coordinator.clone(), "d1", SensorKind::Temperature);

    coordinator.refresh().await.unwrap();
    assert_eq!(sensor.native_value(), Some(SensorValue::Float(22.5)));

    coordinator.refresh().await.unwrap();
    assert_eq!(sensor.native_value(), Some(SensorValue::Float(24.1)));
}

#[tokio::test]
async fn battery_is_reported_as_integer() {
    let api = ScriptedApi::new("10.0.0.2").with_fetches(vec![Step::Data(snapshot("d1", 22.5))]);
    let (coordinator, _events) = start_coordinator(api).await;
    coordinator.refresh().await.unwrap();

    let battery = SensorEntity::new(coordinator, "d1", SensorKind::Battery);
    assert_eq!(battery.native_value(), Some(SensorValue::Integer(90)));
    assert_eq!(battery.state(), "90");
    assert_eq!(battery.unit_of_measurement(), Some("%"));
}

#[tokio::test]
async fn device_info_uses_snapshot_and_fallbacks() {
    let bare = DeviceSnapshot::new("d1").with_online(true);
    let api = ScriptedApi::new("10.0.0.2")
        .with_fetches(vec![Step::Data(bare), Step::Data(snapshot("d1", 22.5))]);
    let (coordinator, _events) = start_coordinator(api).await;
    let sensor = SensorEntity::new(coordinator.clone(), "d1", SensorKind::Temperature);

    coordinator.refresh().await.unwrap();
    let info = sensor.device_info();
    assert_eq!(info.name, DEFAULT_DEVICE_NAME);
    assert_eq!(info.model, DEFAULT_MODEL);
    assert_eq!(info.sw_version, DEFAULT_FIRMWARE);
    assert_eq!(info.manufacturer, MANUFACTURER);
    assert_eq!(
        info.identifiers,
        vec![("example_integration".to_string(), "d1".to_string())]
    );

    coordinator.refresh().await.unwrap();
    let info = sensor.device_info();
    assert_eq!(info.name, "Test Device");
    assert_eq!(info.model, "Test Model");
    assert_eq!(info.sw_version, "0.1.0");
}

#[tokio::test]
async fn each_device_gets_one_entity_per_kind() {
    let (coordinator, _events) = start_coordinator(ScriptedApi::new("10.0.0.2")).await;

    let ids: Vec<String> = SensorEntity::for_device(&coordinator, "d1")
        .iter()
        .map(|sensor| sensor.unique_id())
        .collect();

    assert_eq!(
        ids,
        vec![
            "example_integration_d1_temperature",
            "example_integration_d1_humidity",
            "example_integration_d1_battery",
        ]
    );
}
