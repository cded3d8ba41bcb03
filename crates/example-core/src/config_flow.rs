//! Config flow
//!
//! Interactive setup of a device. A flow step either asks for (more) input
//! with a [`FlowResult::Form`], creates a config entry, or aborts.
//!
//! ```text
//! step_user(None)          ──▶ Form "user"
//! step_user(Some(input))   ──▶ validate_input ──err──▶ Form "user" + errors
//!                                    │
//!                                    ok ──▶ unique id known? ──yes──▶ Abort "already_configured"
//!                                                 │
//!                                                 no ──▶ CreateEntry
//! ```
//!
//! Every validation attempt uses its own scoped client, closed before the
//! step returns.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{Credentials, DEFAULT_HOST};
use crate::error::{FailureKind, FlowError};
use crate::traits::{ConfigEntry, DeviceApi, DeviceApiFactory, EntryStore};

/// Step id of the initial setup form
pub const STEP_USER: &str = "user";

/// Step id of the re-authentication form
pub const STEP_REAUTH_CONFIRM: &str = "reauth_confirm";

/// Key under which form-wide errors are reported
pub const BASE_ERROR_KEY: &str = "base";

/// Identity of a device that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDevice {
    /// Entry title (the device name)
    pub title: String,
    /// Device id, used as the entry's unique id
    pub device_id: String,
}

/// One field of a setup form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl FormField {
    fn required(name: &str, default: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            required: true,
            default: default.map(str::to_string),
        }
    }
}

/// Values submitted on the user form
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInput {
    pub host: String,
    pub api_key: String,
}

impl UserInput {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
        }
    }
}

impl std::fmt::Debug for UserInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserInput")
            .field("host", &self.host)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

/// Outcome of one flow step
#[derive(Debug, Clone, PartialEq)]
pub enum FlowResult {
    /// Show (or re-show) a form
    Form {
        step_id: String,
        schema: Vec<FormField>,
        /// Field name (or `"base"`) to error code
        errors: HashMap<String, String>,
    },

    /// A new config entry was stored
    CreateEntry {
        entry_id: String,
        title: String,
        data: Credentials,
        unique_id: String,
    },

    /// The flow ended without creating an entry
    Abort { reason: String },
}

impl FlowResult {
    fn abort(reason: &str) -> Self {
        FlowResult::Abort {
            reason: reason.to_string(),
        }
    }

    /// Error code reported for `key`, if any
    pub fn error(&self, key: &str) -> Option<&str> {
        match self {
            FlowResult::Form { errors, .. } => errors.get(key).map(String::as_str),
            _ => None,
        }
    }
}

/// Check that a host and API key reach a real device
///
/// A scoped client is created for the check and closed on every path.
pub async fn validate_input(
    factory: &dyn DeviceApiFactory,
    host: &str,
    api_key: &str,
) -> Result<ValidatedDevice, FlowError> {
    let client = factory.create_scoped(host).map_err(|e| {
        error!("Failed to create API client for {}: {}", host, e);
        FlowError::Unknown(e.to_string())
    })?;

    let result = probe(client.as_ref(), host, api_key).await;
    client.close().await;
    result
}

async fn probe(
    client: &dyn DeviceApi,
    host: &str,
    api_key: &str,
) -> Result<ValidatedDevice, FlowError> {
    client.authenticate(api_key).await.map_err(|e| match e.kind() {
        FailureKind::Authentication => FlowError::InvalidAuth,
        FailureKind::Connection => FlowError::CannotConnect,
        FailureKind::Unclassified => {
            error!("Unexpected error authenticating with {}: {}", host, e);
            FlowError::Unknown(e.to_string())
        }
    })?;

    let snapshot = client.fetch_device_data().await.map_err(|e| match e.kind() {
        FailureKind::Connection => FlowError::CannotConnect,
        _ => {
            error!("Unexpected error fetching data from {}: {}", host, e);
            FlowError::Unknown(e.to_string())
        }
    })?;

    Ok(ValidatedDevice {
        title: snapshot
            .name
            .unwrap_or_else(|| format!("Device at {}", host)),
        device_id: snapshot.device_id.unwrap_or_else(|| "unknown".to_string()),
    })
}

/// Setup and re-authentication flow
pub struct ConfigFlow {
    factory: Arc<dyn DeviceApiFactory>,
    store: Arc<dyn EntryStore>,
}

impl ConfigFlow {
    pub fn new(factory: Arc<dyn DeviceApiFactory>, store: Arc<dyn EntryStore>) -> Self {
        Self { factory, store }
    }

    /// Schema of the user form
    pub fn user_schema() -> Vec<FormField> {
        vec![
            FormField::required("host", Some(DEFAULT_HOST)),
            FormField::required("api_key", None),
        ]
    }

    fn reauth_schema() -> Vec<FormField> {
        vec![FormField::required("api_key", None)]
    }

    fn form(step_id: &str, schema: Vec<FormField>, errors: HashMap<String, String>) -> FlowResult {
        FlowResult::Form {
            step_id: step_id.to_string(),
            schema,
            errors,
        }
    }

    fn base_error(err: &FlowError) -> HashMap<String, String> {
        HashMap::from([(BASE_ERROR_KEY.to_string(), err.code().to_string())])
    }

    /// Initial setup step
    ///
    /// Without input the empty form is returned. With input the device is
    /// validated; on success the entry is stored under the device id, unless
    /// that device is already configured.
    pub async fn step_user(&self, input: Option<UserInput>) -> FlowResult {
        let Some(input) = input else {
            return Self::form(STEP_USER, Self::user_schema(), HashMap::new());
        };

        let mut errors = HashMap::new();
        if input.host.trim().is_empty() {
            errors.insert("host".to_string(), "required".to_string());
        }
        if input.api_key.is_empty() {
            errors.insert("api_key".to_string(), "required".to_string());
        }
        if !errors.is_empty() {
            return Self::form(STEP_USER, Self::user_schema(), errors);
        }

        let device = match validate_input(self.factory.as_ref(), &input.host, &input.api_key).await {
            Ok(device) => device,
            Err(e) => {
                warn!("Validation of {} failed: {}", input.host, e);
                return Self::form(STEP_USER, Self::user_schema(), Self::base_error(&e));
            }
        };

        match self.store.get_by_unique_id(&device.device_id).await {
            Ok(Some(_)) => {
                info!("Device {} is already configured", device.device_id);
                return FlowResult::abort("already_configured");
            }
            Ok(None) => {}
            Err(e) => {
                error!("Failed to look up entry for {}: {}", device.device_id, e);
                let err = FlowError::Unknown(e.to_string());
                return Self::form(STEP_USER, Self::user_schema(), Self::base_error(&err));
            }
        }

        let data = Credentials::new(input.host, input.api_key);
        let entry = ConfigEntry::new(device.title.clone(), data.clone())
            .with_unique_id(device.device_id.clone());
        let entry_id = entry.entry_id.clone();

        if let Err(e) = self.store.add(entry).await {
            // A concurrent flow may have stored the same device since the lookup
            if let Ok(Some(_)) = self.store.get_by_unique_id(&device.device_id).await {
                debug!("Entry for {} stored concurrently: {}", device.device_id, e);
                return FlowResult::abort("already_configured");
            }
            error!("Failed to store entry for {}: {}", device.device_id, e);
            let err = FlowError::Unknown(e.to_string());
            return Self::form(STEP_USER, Self::user_schema(), Self::base_error(&err));
        }

        info!("Created entry {} for device {}", entry_id, device.device_id);
        FlowResult::CreateEntry {
            entry_id,
            title: device.title,
            data,
            unique_id: device.device_id,
        }
    }

    /// Replace the API key of an existing entry
    ///
    /// The new key is validated against the entry's host and must reach the
    /// same device the entry was created for.
    pub async fn step_reauth(&self, entry_id: &str, api_key: &str) -> FlowResult {
        let entry = match self.store.get(entry_id).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return FlowResult::abort("entry_not_found"),
            Err(e) => {
                error!("Failed to load entry {}: {}", entry_id, e);
                return FlowResult::abort("entry_not_found");
            }
        };

        if api_key.is_empty() {
            let errors = HashMap::from([("api_key".to_string(), "required".to_string())]);
            return Self::form(STEP_REAUTH_CONFIRM, Self::reauth_schema(), errors);
        }

        let host = entry.data.host.clone();
        let device = match validate_input(self.factory.as_ref(), &host, api_key).await {
            Ok(device) => device,
            Err(e) => {
                warn!("Re-authentication of {} failed: {}", host, e);
                return Self::form(STEP_REAUTH_CONFIRM, Self::reauth_schema(), Self::base_error(&e));
            }
        };

        if entry.unique_id.as_deref().is_some_and(|id| id != device.device_id) {
            warn!(
                "Host {} now reports device {}, expected {:?}",
                host, device.device_id, entry.unique_id
            );
            return FlowResult::abort("unique_id_mismatch");
        }

        match self
            .store
            .update_credentials(entry_id, Credentials::new(host, api_key))
            .await
        {
            Ok(_) => {
                info!("Updated credentials of entry {}", entry_id);
                FlowResult::abort("reauth_successful")
            }
            Err(e) => {
                error!("Failed to update entry {}: {}", entry_id, e);
                let err = FlowError::Unknown(e.to_string());
                Self::form(STEP_REAUTH_CONFIRM, Self::reauth_schema(), Self::base_error(&err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_schema_defaults() {
        let schema = ConfigFlow::user_schema();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema[0].name, "host");
        assert_eq!(schema[0].default.as_deref(), Some(DEFAULT_HOST));
        assert_eq!(schema[1].name, "api_key");
        assert!(schema[1].required);
        assert!(schema[1].default.is_none());
    }

    #[test]
    fn test_user_input_redacts_api_key() {
        let input = UserInput::new("10.0.0.2", "super-secret");
        let debug_str = format!("{:?}", input);
        assert!(!debug_str.contains("super-secret"));
    }

    #[test]
    fn test_flow_result_error_lookup() {
        let form = ConfigFlow::form(
            STEP_USER,
            ConfigFlow::user_schema(),
            ConfigFlow::base_error(&FlowError::InvalidAuth),
        );
        assert_eq!(form.error(BASE_ERROR_KEY), Some("invalid_auth"));
        assert_eq!(FlowResult::abort("x").error(BASE_ERROR_KEY), None);
    }
}
