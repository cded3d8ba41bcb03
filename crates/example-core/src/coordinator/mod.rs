//! Poll coordinator
//!
//! The Coordinator is responsible for:
//! - Fetching fresh device data through its API client
//! - Classifying fetch failures
//! - Publishing the latest snapshot to entities and subscribers
//! - Closing the API client on teardown
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   tick    ┌──────────────┐  fetch   ┌─────────────┐
//! │ PollScheduler │──────────▶│ Coordinator  │─────────▶│ DeviceApi   │
//! └───────────────┘           └──────────────┘          └─────────────┘
//!                                     │
//!                  ┌──────────────────┼──────────────────┐
//!                  ▼                  ▼                  ▼
//!          ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!          │ snapshot cell│   │ status cell  │   │   Events     │
//!          │ (entities)   │   │ (health)     │   │  (notify)    │
//!          └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! ## State Machine
//!
//! ```text
//! Uninitialized ──ok──▶ Active ◀──ok──▶ Degraded
//!        │                 │                │
//!        └──── auth ───────┴──── auth ──────┴──▶ AuthFailed
//!
//! any ── close() ──▶ Closed
//! ```
//!
//! Connection and unclassified failures degrade the coordinator but keep the
//! last snapshot. Authentication failures are reported as
//! [`RefreshError::AuthFailed`] so the owner can ask for new credentials.

pub mod scheduler;

pub use scheduler::PollScheduler;

use crate::config::CoordinatorConfig;
use crate::error::{FailureKind, RefreshError};
use crate::snapshot::DeviceSnapshot;
use crate::traits::{DeviceApi, Poller};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

/// Events emitted by the Coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    /// A refresh produced a snapshot with new content
    Refreshed {
        device_id: String,
    },

    /// A refresh produced the same content as the current snapshot
    Unchanged {
        device_id: String,
    },

    /// A refresh failed with a transient error
    Degraded {
        error: String,
    },

    /// A refresh succeeded after one or more failures
    Recovered,

    /// The device rejected the credentials; new ones are required
    ReauthRequired {
        error: String,
    },

    /// Coordinator closed
    Closed,
}

/// Lifecycle phase of a Coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinatorPhase {
    /// No refresh has completed yet
    Uninitialized,
    /// Last refresh succeeded
    Active,
    /// Last refresh failed with a connection or unclassified error
    Degraded,
    /// Last refresh failed with an authentication error
    AuthFailed,
    /// Torn down
    Closed,
}

/// Health of a Coordinator as seen by readers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorStatus {
    /// Current phase
    pub phase: CoordinatorPhase,
    /// Message of the last failed refresh, cleared on success
    pub last_error: Option<String>,
    /// Time of the last successful refresh
    pub last_success: Option<DateTime<Utc>>,
}

impl CoordinatorStatus {
    fn initial() -> Self {
        Self {
            phase: CoordinatorPhase::Uninitialized,
            last_error: None,
            last_success: None,
        }
    }
}

/// Per-device poll coordinator
///
/// The coordinator owns the device's API client and the current snapshot.
/// Entities read the snapshot through [`Coordinator::data`]; they never hold
/// a copy of their own.
///
/// ## Concurrency
///
/// At most one fetch is in flight at any time: `refresh` and `close` both
/// take the fetch lock, so closing waits for an in-flight fetch to settle and
/// the session is never closed under a running request.
///
/// ## Change Suppression
///
/// A refresh whose snapshot equals the current one (whole-snapshot equality)
/// leaves the cell untouched and does not wake subscribers.
pub struct Coordinator {
    /// Name used in log messages
    name: String,

    /// API client for the device
    api: Arc<dyn DeviceApi>,

    /// Period between scheduled refreshes
    update_interval: Duration,

    /// Current snapshot (single writer, many readers)
    data: watch::Sender<Option<Arc<DeviceSnapshot>>>,

    /// Current health
    status: watch::Sender<CoordinatorStatus>,

    /// Serializes fetches and teardown
    fetch_lock: Mutex<()>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<CoordinatorEvent>,
}

impl Coordinator {
    /// Create a new coordinator
    ///
    /// # Parameters
    ///
    /// - `api`: API client, already authenticated by the caller
    /// - `config`: Coordinator configuration
    ///
    /// # Returns
    ///
    /// A tuple of (coordinator, event_receiver) where event_receiver yields coordinator events
    pub fn new(
        api: Arc<dyn DeviceApi>,
        config: &CoordinatorConfig,
    ) -> crate::Result<(Self, mpsc::Receiver<CoordinatorEvent>)> {
        config.validate()?;

        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        let (data, _) = watch::channel(None);
        let (status, _) = watch::channel(CoordinatorStatus::initial());

        let coordinator = Self {
            name: format!("{} ({})", crate::config::DOMAIN, api.host()),
            api,
            update_interval: config.update_interval(),
            data,
            status,
            fetch_lock: Mutex::new(()),
            event_tx,
        };

        Ok((coordinator, event_rx))
    }

    /// Override the refresh period
    ///
    /// Fails with `Error::Config` for a zero period.
    pub fn with_update_interval(mut self, update_interval: Duration) -> crate::Result<Self> {
        if update_interval.is_zero() {
            return Err(crate::Error::config("Update interval must be > 0"));
        }
        self.update_interval = update_interval;
        Ok(self)
    }

    /// Run the first refresh during setup
    ///
    /// Setup must not continue unless this succeeds; the error tells the
    /// caller whether the device was unreachable or rejected the credentials.
    pub async fn first_refresh(&self) -> Result<Arc<DeviceSnapshot>, RefreshError> {
        match self.refresh().await {
            Ok(snapshot) => {
                info!("First refresh of {} succeeded", self.name);
                Ok(snapshot)
            }
            Err(e) => {
                error!("First refresh of {} failed: {}", self.name, e);
                Err(e)
            }
        }
    }

    /// Fetch fresh data and update the snapshot and health
    pub async fn refresh(&self) -> Result<Arc<DeviceSnapshot>, RefreshError> {
        let _fetch = self.fetch_lock.lock().await;

        if self.phase() == CoordinatorPhase::Closed {
            debug!("Refresh requested on closed coordinator {}", self.name);
            return Err(RefreshError::Closed);
        }

        match self.api.fetch_device_data().await {
            Ok(snapshot) => Ok(self.handle_success(snapshot)),
            Err(e) => Err(self.handle_failure(e)),
        }
    }

    /// Record a successful fetch
    fn handle_success(&self, snapshot: DeviceSnapshot) -> Arc<DeviceSnapshot> {
        let device_id = snapshot
            .device_id
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        debug!("Successfully fetched data for device {}", device_id);

        // Health first: subscribers woken by the snapshot must see Active
        let previous_phase = self.phase();
        self.status.send_modify(|status| {
            status.phase = CoordinatorPhase::Active;
            status.last_error = None;
            status.last_success = Some(Utc::now());
        });

        let fresh = Arc::new(snapshot);
        let changed = self.data.send_if_modified(|current| {
            if current.as_deref() == Some(fresh.as_ref()) {
                return false;
            }
            *current = Some(Arc::clone(&fresh));
            true
        });

        if matches!(
            previous_phase,
            CoordinatorPhase::Degraded | CoordinatorPhase::AuthFailed
        ) {
            info!("Coordinator {} recovered", self.name);
            self.emit_event(CoordinatorEvent::Recovered);
        }

        if changed {
            self.emit_event(CoordinatorEvent::Refreshed { device_id });
        } else {
            debug!("Data for device {} unchanged, not notifying", device_id);
            self.emit_event(CoordinatorEvent::Unchanged { device_id });
        }

        fresh
    }

    /// Classify a failed fetch and update health; the snapshot is kept
    fn handle_failure(&self, err: crate::Error) -> RefreshError {
        let kind = err.kind();
        match kind {
            FailureKind::Authentication => error!("Authentication failed: {}", err),
            FailureKind::Connection => warn!("Connection error: {}", err),
            FailureKind::Unclassified => error!("Unexpected error fetching data: {}", err),
        }

        let refresh_error = RefreshError::from(err);
        let phase = match kind {
            FailureKind::Authentication => CoordinatorPhase::AuthFailed,
            FailureKind::Connection | FailureKind::Unclassified => CoordinatorPhase::Degraded,
        };

        self.status.send_modify(|status| {
            status.phase = phase;
            status.last_error = Some(refresh_error.to_string());
        });

        match phase {
            CoordinatorPhase::AuthFailed => self.emit_event(CoordinatorEvent::ReauthRequired {
                error: refresh_error.to_string(),
            }),
            _ => self.emit_event(CoordinatorEvent::Degraded {
                error: refresh_error.to_string(),
            }),
        }

        refresh_error
    }

    /// Tear down the coordinator
    ///
    /// Waits for an in-flight fetch, closes the API client and rejects every
    /// later refresh. Calling it again is a no-op.
    pub async fn close(&self) {
        let _fetch = self.fetch_lock.lock().await;

        if self.phase() == CoordinatorPhase::Closed {
            return;
        }

        self.api.close().await;
        self.status.send_modify(|status| status.phase = CoordinatorPhase::Closed);
        info!("Coordinator {} closed", self.name);
        self.emit_event(CoordinatorEvent::Closed);
    }

    /// Current snapshot, if any refresh has succeeded
    pub fn data(&self) -> Option<Arc<DeviceSnapshot>> {
        self.data.borrow().clone()
    }

    /// Current health
    pub fn status(&self) -> CoordinatorStatus {
        self.status.borrow().clone()
    }

    /// Current phase
    pub fn phase(&self) -> CoordinatorPhase {
        self.status.borrow().phase
    }

    /// Whether the last refresh succeeded
    pub fn is_healthy(&self) -> bool {
        self.phase() == CoordinatorPhase::Active
    }

    /// Watch health changes
    pub fn watch_status(&self) -> watch::Receiver<CoordinatorStatus> {
        self.status.subscribe()
    }

    /// Stream of snapshots, yielding only when the content changes
    pub fn subscribe(&self) -> Pin<Box<dyn Stream<Item = Arc<DeviceSnapshot>> + Send + 'static>> {
        let stream = WatchStream::from_changes(self.data.subscribe()).filter_map(|snapshot| snapshot);
        Box::pin(stream)
    }

    /// Emit a coordinator event
    fn emit_event(&self, event: CoordinatorEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping coordinator event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

#[async_trait]
impl Poller<DeviceSnapshot> for Coordinator {
    fn name(&self) -> &str {
        &self.name
    }

    fn update_interval(&self) -> Duration {
        self.update_interval
    }

    async fn refresh(&self) -> Result<Arc<DeviceSnapshot>, RefreshError> {
        Coordinator::refresh(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status() {
        let status = CoordinatorStatus::initial();
        assert_eq!(status.phase, CoordinatorPhase::Uninitialized);
        assert!(status.last_error.is_none());
        assert!(status.last_success.is_none());
    }

    #[test]
    fn test_coordinator_event_equality() {
        let event = CoordinatorEvent::Refreshed {
            device_id: "d1".to_string(),
        };
        assert_eq!(event.clone(), event);
        assert_ne!(event, CoordinatorEvent::Recovered);
    }
}
