// # exampled - Example Integration Daemon
//
// The exampled daemon is a thin host for one device. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Running the setup flow against the device
// 4. Polling the device until a shutdown signal arrives
//
// All integration logic lives in example-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `EXAMPLE_HOST`: Device hostname or IP (default `192.168.1.100`)
// - `EXAMPLE_API_KEY`: API key (required)
// - `EXAMPLE_SCAN_INTERVAL_SECS`: Poll interval in seconds (default 30)
// - `EXAMPLE_REQUEST_TIMEOUT_SECS`: HTTP timeout in seconds (default 10)
// - `EXAMPLE_LOG_LEVEL`: trace, debug, info, warn or error (default info)
//
// ## Example
//
// ```bash
// export EXAMPLE_HOST=10.0.0.2
// export EXAMPLE_API_KEY=your_key
// export EXAMPLE_SCAN_INTERVAL_SECS=15
//
// exampled
// ```

use anyhow::{Context, Result};
use example_api_mock::MockApiFactory;
use example_core::config::{Credentials, IntegrationConfig, DEFAULT_HOST};
use example_core::config_flow::BASE_ERROR_KEY;
use example_core::{
    ConfigFlow, CoordinatorEvent, CoordinatorPhase, EntityRegistry, EntryStore, FlowResult,
    Integration, MemoryEntryStore, UserInput,
};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Upper bound on teardown, including an in-flight refresh
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (including credentials rejected while running)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    host: String,
    api_key: String,
    scan_interval_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("EXAMPLE_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            api_key: env::var("EXAMPLE_API_KEY").context("EXAMPLE_API_KEY is not set")?,
            scan_interval_secs: parse_var("EXAMPLE_SCAN_INTERVAL_SECS")?,
            request_timeout_secs: parse_var("EXAMPLE_REQUEST_TIMEOUT_SECS")?,
            log_level: env::var("EXAMPLE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("EXAMPLE_HOST cannot be empty");
        }

        if self.api_key.is_empty() {
            anyhow::bail!(
                "EXAMPLE_API_KEY is required. \
                Set it via: export EXAMPLE_API_KEY=your_key"
            );
        }

        if let Some(interval) = self.scan_interval_secs
            && !(1..=3600).contains(&interval)
        {
            anyhow::bail!(
                "EXAMPLE_SCAN_INTERVAL_SECS must be between 1 and 3600 seconds. Got: {}",
                interval
            );
        }

        if let Some(timeout) = self.request_timeout_secs
            && !(1..=300).contains(&timeout)
        {
            anyhow::bail!(
                "EXAMPLE_REQUEST_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                timeout
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "EXAMPLE_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the integration configuration
    fn integration_config(&self) -> Result<IntegrationConfig> {
        let mut config = IntegrationConfig::new(Credentials::new(&self.host, &self.api_key));

        if let Some(interval) = self.scan_interval_secs {
            config.coordinator.update_interval_secs = interval;
        }
        if let Some(timeout) = self.request_timeout_secs {
            config.api.request_timeout_secs = timeout;
        }

        config.validate()?;
        Ok(config)
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Parse an optional numeric environment variable
fn parse_var(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a whole number. Got: '{}'", name, value)),
        Err(_) => Ok(None),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    let integration_config = match config.integration_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    info!("Starting exampled daemon");
    info!(
        "Device {} polled every {:?}",
        integration_config.credentials.host,
        integration_config.coordinator.update_interval()
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        let registry = Arc::new(EntityRegistry::new());

        let (integration, events) = match start(&integration_config, Arc::clone(&registry)).await {
            Ok(started) => started,
            Err(e) => {
                error!("Setup failed: {:#}", e);
                return DaemonExitCode::ConfigError;
            }
        };

        match run(integration, events, registry).await {
            Ok(()) => DaemonExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DaemonExitCode::RuntimeError
            }
        }
    });

    code.into()
}

/// Run the setup flow and set up the integration
async fn start(
    config: &IntegrationConfig,
    registry: Arc<EntityRegistry>,
) -> Result<(Integration, mpsc::Receiver<CoordinatorEvent>)> {
    let factory = Arc::new(MockApiFactory::new(config.api.clone())?);
    let store = Arc::new(MemoryEntryStore::new());
    let flow = ConfigFlow::new(factory.clone(), store.clone());

    let input = UserInput::new(&config.credentials.host, &config.credentials.api_key);
    let entry_id = match flow.step_user(Some(input)).await {
        FlowResult::CreateEntry {
            entry_id,
            title,
            unique_id,
            ..
        } => {
            info!("Configured '{}' ({})", title, unique_id);
            entry_id
        }
        result @ FlowResult::Form { .. } => {
            let reason = result.error(BASE_ERROR_KEY).unwrap_or("invalid input");
            anyhow::bail!("Device rejected the configuration: {}", reason);
        }
        FlowResult::Abort { reason } => {
            anyhow::bail!("Setup aborted: {}", reason);
        }
    };

    let entry = store
        .get(&entry_id)
        .await?
        .context("Created entry disappeared from the store")?;

    let started = Integration::setup(&entry, &*factory, registry, &config.coordinator).await?;
    Ok(started)
}

/// Log every sensor state
fn log_states(registry: &EntityRegistry) {
    for view in registry.states() {
        match view.unit {
            Some(unit) if view.available => info!("{} = {} {}", view.unique_id, view.state, unit),
            _ => info!("{} = {}", view.unique_id, view.state),
        }
    }
}

/// Poll until shutdown or until the device stops accepting the credentials
async fn run(
    integration: Integration,
    mut events: mpsc::Receiver<CoordinatorEvent>,
    registry: Arc<EntityRegistry>,
) -> Result<()> {
    log_states(&registry);

    let mut updates = integration.coordinator().subscribe();
    let mut status = integration.coordinator().watch_status();
    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    let outcome = loop {
        tokio::select! {
            Some(_) = updates.next() => log_states(&registry),

            // Events may be dropped when the channel is full; the status cell is not
            Ok(()) = status.changed() => {
                let current = status.borrow_and_update().clone();
                if current.phase == CoordinatorPhase::AuthFailed {
                    error!(
                        "Device no longer accepts the API key: {}",
                        current.last_error.as_deref().unwrap_or("authentication failed")
                    );
                    break Err(anyhow::anyhow!("Re-authentication required"));
                }
            }

            Some(event) = events.recv() => match event {
                CoordinatorEvent::ReauthRequired { error } => {
                    error!("Device no longer accepts the API key: {}", error);
                    break Err(anyhow::anyhow!("Re-authentication required"));
                }
                CoordinatorEvent::Degraded { error } => warn!("Device unavailable: {}", error),
                CoordinatorEvent::Recovered => {
                    info!("Device available again");
                    log_states(&registry);
                }
                other => debug!("Coordinator event: {:?}", other),
            },

            received = &mut shutdown => match received {
                Ok(name) => {
                    info!("Received shutdown signal: {}", name);
                    break Ok(());
                }
                Err(e) => break Err(e),
            },
        }
    };

    info!("Shutting down daemon");
    if tokio::time::timeout(TEARDOWN_TIMEOUT, integration.teardown())
        .await
        .is_err()
    {
        error!("Teardown timeout after {:?}", TEARDOWN_TIMEOUT);
    }

    outcome
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
