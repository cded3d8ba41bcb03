//! Core traits for the example integration
//!
//! This module defines the abstract interfaces at every seam of the system.
//!
//! - [`DeviceApi`]: Session with one remote device
//! - [`Poller`]: Anything the scheduler refreshes on a fixed period
//! - [`Entity`]: Read accessors exposed to the host's entity registry
//! - [`EntryStore`]: Config-entry persistence

pub mod device_api;
pub mod entity;
pub mod entry_store;
pub mod poller;

pub use device_api::{DeviceApi, DeviceApiFactory};
pub use entity::{DeviceInfo, Entity};
pub use entry_store::{ConfigEntry, EntryStore};
pub use poller::Poller;
