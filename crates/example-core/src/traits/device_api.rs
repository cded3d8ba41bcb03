// # Device API Trait
//
// Defines the interface for talking to one remote device.
//
// ## Implementations
//
// - Mock device: `example-api-mock` crate
// - Future: real device protocols
//
// ## Usage
//
// ```rust,ignore
// use example_core::DeviceApi;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let client = /* DeviceApi implementation */;
//
//     client.authenticate("my-api-key").await?;
//     let snapshot = client.fetch_device_data().await?;
//     client.close().await;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::snapshot::DeviceSnapshot;

/// Trait for device API clients
///
/// A client wraps one session with one device. The session starts
/// unauthenticated; [`DeviceApi::authenticate`] must succeed before any data
/// operation, and [`DeviceApi::close`] returns it to the unauthenticated state.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks. All
/// methods take `&self`; session state lives behind interior mutability.
///
/// # Error Contract
///
/// - `Error::Authentication`: credentials rejected, or a data operation was
///   attempted without a successful `authenticate`
/// - `Error::Connection`: device unreachable
/// - anything else is treated as unclassified by callers
///
/// # No Retries
///
/// Clients fail fast. Retry cadence is owned by the coordinator, which simply
/// polls again at the next scheduled period.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Authenticate the session with an API key
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the session is now authenticated
    /// - `Err(Error::Authentication)`: the key was rejected
    /// - `Err(Error::Connection)`: the device is unreachable
    async fn authenticate(&self, api_key: &str) -> Result<(), crate::Error>;

    /// Fetch the current device state and sensor readings
    ///
    /// # Returns
    ///
    /// - `Ok(DeviceSnapshot)`: a complete snapshot
    /// - `Err(Error::Authentication)`: not authenticated
    /// - `Err(Error::Connection)`: the device is unreachable
    async fn fetch_device_data(&self) -> Result<DeviceSnapshot, crate::Error>;

    /// Switch the device on or off
    ///
    /// Fails with the same errors as [`DeviceApi::fetch_device_data`].
    async fn set_device_state(&self, on: bool) -> Result<(), crate::Error>;

    /// Release held resources and reset the authenticated flag
    ///
    /// Must be idempotent.
    async fn close(&self);

    /// Whether `authenticate` has succeeded since construction or the last `close`
    fn is_authenticated(&self) -> bool;

    /// Host this client talks to (for logging)
    fn host(&self) -> &str;
}

/// Helper trait for constructing API clients
///
/// The host supplies one shared HTTP session; factories hand it to every
/// client they create. Config validation instead asks for a scoped client
/// with its own session, released when the client is closed.
pub trait DeviceApiFactory: Send + Sync {
    /// Create a client that uses the shared session
    fn create(&self, host: &str) -> Result<Box<dyn DeviceApi>, crate::Error>;

    /// Create a client with a fresh, private session
    fn create_scoped(&self, host: &str) -> Result<Box<dyn DeviceApi>, crate::Error> {
        self.create(host)
    }
}
