//! Fixed-period poll scheduler
//!
//! Drives a [`Poller`] from a background task until it is shut down or the
//! poller reports a failure that polling cannot fix.
//!
//! Ticks missed while a refresh was still running are skipped, not queued.
//! A refresh that has already started always completes before the task
//! observes a shutdown request, and a pending shutdown wins over a due tick.

use crate::error::{Error, RefreshError};
use crate::traits::Poller;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Handle to a running poll loop
pub struct PollScheduler {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PollScheduler {
    /// Spawn a poll loop for `poller`
    ///
    /// The first scheduled refresh happens one period after spawning; the
    /// caller is expected to have run the first refresh itself.
    ///
    /// # Returns
    ///
    /// - `Ok(scheduler)`: the loop is running
    /// - `Err(Error::Config)`: the poller's period is zero; nothing was spawned
    pub fn spawn<T>(poller: Arc<dyn Poller<T>>) -> crate::Result<Self>
    where
        T: Send + Sync + 'static,
    {
        if poller.update_interval().is_zero() {
            return Err(Error::config(format!(
                "Update interval of {} must be > 0",
                poller.name()
            )));
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run(poller, shutdown_rx));

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Whether the poll loop has exited on its own
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|handle| handle.is_finished())
    }

    /// Stop the poll loop and wait for it to exit
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // The loop may already have exited
            let _ = tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("Poll task terminated abnormally: {}", e);
            }
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run<T>(poller: Arc<dyn Poller<T>>, mut shutdown_rx: oneshot::Receiver<()>)
where
    T: Send + Sync + 'static,
{
    let period = poller.update_interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Polling {} every {:?}", poller.name(), period);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown_rx => {
                info!("Shutdown signal received, stopping polling of {}", poller.name());
                break;
            }

            _ = ticker.tick() => {
                match poller.refresh().await {
                    Ok(_) => debug!("Scheduled refresh of {} succeeded", poller.name()),
                    Err(RefreshError::AuthFailed(e)) => {
                        error!("Stopping polling of {}: {}", poller.name(), e);
                        break;
                    }
                    Err(RefreshError::Closed) => {
                        debug!("Stopping polling of {}: closed", poller.name());
                        break;
                    }
                    // Retried at the next period
                    Err(RefreshError::UpdateFailed(_)) => {}
                }
            }
        }
    }
}
