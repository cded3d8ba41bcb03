//! Test doubles and common utilities for contract tests
//!
//! This module provides a scripted device client whose responses and timing
//! are controlled by the test, plus shared counters to observe how the core
//! drives it.

#![allow(dead_code)]

use async_trait::async_trait;
use example_core::config::CoordinatorConfig;
use example_core::error::Result;
use example_core::traits::{DeviceApi, DeviceApiFactory};
use example_core::{Coordinator, CoordinatorEvent, DeviceSnapshot, Error};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// One scripted response of the device
#[derive(Debug, Clone)]
pub enum Step {
    /// Succeed (for fetches: with this snapshot)
    Data(DeviceSnapshot),
    /// Fail with an authentication error
    AuthError,
    /// Fail with a connection error
    ConnectionError,
    /// Fail with an unclassified error
    OtherError,
}

impl Step {
    fn into_result(self) -> Result<DeviceSnapshot> {
        match self {
            Step::Data(snapshot) => Ok(snapshot),
            Step::AuthError => Err(Error::auth("Invalid API key")),
            Step::ConnectionError => Err(Error::connection("Device unreachable")),
            Step::OtherError => Err(Error::Other("Malformed response".to_string())),
        }
    }
}

/// Build an online snapshot with all three readings
pub fn snapshot(device_id: &str, temperature: f64) -> DeviceSnapshot {
    DeviceSnapshot::new(device_id)
        .with_name("Test Device")
        .with_model("Test Model")
        .with_firmware("0.1.0")
        .with_online(true)
        .with_sensor("temperature", temperature)
        .with_sensor("humidity", 45.0)
        .with_sensor("battery", 90_i64)
}

/// Counters shared by every client a test creates
#[derive(Debug, Default)]
pub struct ApiCounters {
    pub auth_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub clients_created: AtomicUsize,
    pub scoped_created: AtomicUsize,
    pub closed_during_fetch: AtomicBool,
}

impl ApiCounters {
    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn clients_created(&self) -> usize {
        self.clients_created.load(Ordering::SeqCst)
    }

    pub fn scoped_created(&self) -> usize {
        self.scoped_created.load(Ordering::SeqCst)
    }

    pub fn closed_during_fetch(&self) -> bool {
        self.closed_during_fetch.load(Ordering::SeqCst)
    }
}

/// A device client that replays a script
///
/// Fetch steps are consumed in order; the last one repeats forever.
pub struct ScriptedApi {
    host: String,
    auth_step: Step,
    fetch_script: Mutex<VecDeque<Step>>,
    fetch_delay: Duration,
    authenticated: AtomicBool,
    closed: AtomicBool,
    counters: Arc<ApiCounters>,
}

impl ScriptedApi {
    /// Create a client that authenticates and returns `snapshot("d1", 22.5)`
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            auth_step: Step::Data(DeviceSnapshot::default()),
            fetch_script: Mutex::new(VecDeque::from([Step::Data(snapshot("d1", 22.5))])),
            fetch_delay: Duration::ZERO,
            authenticated: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            counters: Arc::new(ApiCounters::default()),
        }
    }

    /// Replace the fetch script
    pub fn with_fetches(self, steps: Vec<Step>) -> Self {
        *self.fetch_script.lock().unwrap() = steps.into();
        self
    }

    /// Outcome of `authenticate` (any `Data` step means success)
    pub fn with_auth(mut self, step: Step) -> Self {
        self.auth_step = step;
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Create a client that records into another client's counters
    pub fn sharing_counters_with(mut self, counters: &Arc<ApiCounters>) -> Self {
        self.counters = Arc::clone(counters);
        self
    }

    pub fn counters(&self) -> Arc<ApiCounters> {
        Arc::clone(&self.counters)
    }

    fn next_fetch(&self) -> Step {
        let mut script = self.fetch_script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script
                .front()
                .cloned()
                .unwrap_or_else(|| Step::Data(DeviceSnapshot::default()))
        }
    }
}

#[async_trait]
impl DeviceApi for ScriptedApi {
    async fn authenticate(&self, _api_key: &str) -> Result<()> {
        self.counters.auth_calls.fetch_add(1, Ordering::SeqCst);
        self.auth_step.clone().into_result()?;
        self.authenticated.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_device_data(&self) -> Result<DeviceSnapshot> {
        self.counters.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if !self.is_authenticated() {
            return Err(Error::auth("Not authenticated"));
        }

        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }

        if self.closed.load(Ordering::SeqCst) {
            self.counters.closed_during_fetch.store(true, Ordering::SeqCst);
        }
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.next_fetch().into_result()
    }

    async fn set_device_state(&self, _on: bool) -> Result<()> {
        if !self.is_authenticated() {
            return Err(Error::auth("Not authenticated"));
        }
        Ok(())
    }

    async fn close(&self) {
        self.counters.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        self.authenticated.store(false, Ordering::SeqCst);
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    fn host(&self) -> &str {
        &self.host
    }
}

/// Factory producing scripted clients that share one set of counters
pub struct ScriptedFactory {
    auth_step: Step,
    fetch_steps: Vec<Step>,
    counters: Arc<ApiCounters>,
}

impl ScriptedFactory {
    pub fn new(auth_step: Step, fetch_steps: Vec<Step>) -> Self {
        Self {
            auth_step,
            fetch_steps,
            counters: Arc::new(ApiCounters::default()),
        }
    }

    /// Every client authenticates and returns `snapshot`
    pub fn returning(snapshot: DeviceSnapshot) -> Self {
        Self::new(Step::Data(DeviceSnapshot::default()), vec![Step::Data(snapshot)])
    }

    pub fn counters(&self) -> Arc<ApiCounters> {
        Arc::clone(&self.counters)
    }

    fn build(&self, host: &str) -> ScriptedApi {
        self.counters.clients_created.fetch_add(1, Ordering::SeqCst);
        ScriptedApi::new(host)
            .with_auth(self.auth_step.clone())
            .with_fetches(self.fetch_steps.clone())
            .sharing_counters_with(&self.counters)
    }
}

impl DeviceApiFactory for ScriptedFactory {
    fn create(&self, host: &str) -> Result<Box<dyn DeviceApi>> {
        Ok(Box::new(self.build(host)))
    }

    fn create_scoped(&self, host: &str) -> Result<Box<dyn DeviceApi>> {
        self.counters.scoped_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.build(host)))
    }
}

/// Authenticate `api` and wrap it in a coordinator with default settings
pub async fn start_coordinator(
    api: ScriptedApi,
) -> (Arc<Coordinator>, mpsc::Receiver<CoordinatorEvent>) {
    api.authenticate("test-key").await.expect("scripted auth succeeds");
    let (coordinator, events) = Coordinator::new(Arc::new(api), &CoordinatorConfig::default())
        .expect("coordinator construction succeeds");
    (Arc::new(coordinator), events)
}

/// Drain every event emitted so far
pub fn drain_events(events: &mut mpsc::Receiver<CoordinatorEvent>) -> Vec<CoordinatorEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
