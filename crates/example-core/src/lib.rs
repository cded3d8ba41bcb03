// # example-core
//
// Core library for the example device integration.
//
// ## Architecture Overview
//
// This library provides everything needed to run one polled device inside a
// host platform:
// - **DeviceApi**: Trait for talking to a device (authenticate, fetch, control)
// - **Coordinator**: Owns the client, polls it and publishes snapshots
// - **PollScheduler**: Drives a coordinator on a fixed period
// - **SensorEntity**: Read-only projections of the current snapshot
// - **ConfigFlow**: Validates user input and creates config entries
// - **Integration**: Sets up and tears down one config entry
//
// ## Design Principles
//
// 1. **Single Owner**: The coordinator is the only writer of device data
// 2. **Projection Entities**: Entities never cache readings
// 3. **Classified Failures**: Authentication failures never look like outages
// 4. **Library-First**: All core functionality can be used as a library

pub mod config;
pub mod config_flow;
pub mod coordinator;
pub mod error;
pub mod integration;
pub mod registry;
pub mod sensor;
pub mod snapshot;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{ApiConfig, CoordinatorConfig, Credentials, IntegrationConfig, DOMAIN};
pub use config_flow::{validate_input, ConfigFlow, FlowResult, UserInput, ValidatedDevice};
pub use coordinator::{
    Coordinator, CoordinatorEvent, CoordinatorPhase, CoordinatorStatus, PollScheduler,
};
pub use error::{Error, FailureKind, FlowError, RefreshError, Result, SetupError};
pub use integration::Integration;
pub use registry::{EntityRegistry, EntityStateView};
pub use sensor::{SensorEntity, SensorKind};
pub use snapshot::{DeviceSnapshot, SensorValue};
pub use state::MemoryEntryStore;
pub use traits::{ConfigEntry, DeviceApi, DeviceApiFactory, DeviceInfo, Entity, EntryStore, Poller};
