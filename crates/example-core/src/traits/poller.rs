// # Poller Trait
//
// Defines what the scheduler needs from anything it polls.
//
// ## Usage
//
// ```rust,ignore
// use example_core::{Poller, PollScheduler};
//
// let coordinator: Arc<dyn Poller<DeviceSnapshot>> = /* ... */;
// let scheduler = PollScheduler::spawn(coordinator)?;
// // ...
// scheduler.shutdown().await;
// ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::RefreshError;

/// Something that can be refreshed on a fixed period
///
/// The scheduler never calls `refresh` concurrently on the same poller and
/// stops polling once a refresh reports [`RefreshError::AuthFailed`] or
/// [`RefreshError::Closed`].
#[async_trait]
pub trait Poller<T>: Send + Sync
where
    T: Send + Sync,
{
    /// Name used in log messages
    fn name(&self) -> &str;

    /// Fixed period between refreshes
    fn update_interval(&self) -> Duration;

    /// Fetch fresh data and publish it
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<T>)`: the data now current
    /// - `Err(RefreshError)`: classified failure
    async fn refresh(&self) -> Result<Arc<T>, RefreshError>;
}
