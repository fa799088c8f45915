//! Mail engine configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding [`MailConfig::outbound_from_address`].
pub const ENV_FROM_ADDRESS: &str = "MAILROOM_FROM_ADDRESS";
/// Environment variable overriding [`MailConfig::outbound_from_name`].
pub const ENV_FROM_NAME: &str = "MAILROOM_FROM_NAME";
/// Environment variable overriding [`MailConfig::local_host_name`].
pub const ENV_LOCAL_HOST_NAME: &str = "MAILROOM_LOCAL_HOST_NAME";
/// Environment variable overriding [`MailConfig::message_id_domain`].
pub const ENV_MESSAGE_ID_DOMAIN: &str = "MAILROOM_MESSAGE_ID_DOMAIN";

/// Settings the engine reads; everything else comes from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Default sender address.
    pub outbound_from_address: Option<String>,
    /// Default sender display name.
    pub outbound_from_name: Option<String>,
    /// Name announced in `EHLO`.
    pub local_host_name: String,
    /// Domain tag of generated message-ids.
    pub message_id_domain: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            outbound_from_address: None,
            outbound_from_name: None,
            local_host_name: "localhost".to_string(),
            message_id_domain: "mailroom".to_string(),
        }
    }
}

impl MailConfig {
    /// Parses a JSON document; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a required value is
    /// blank.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loaded mail configuration");
        Self::from_json(&json)
    }

    /// Applies the `MAILROOM_*` environment variables.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key lookup; empty values are ignored.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(address) = get(ENV_FROM_ADDRESS) {
            self.outbound_from_address = Some(address);
        }
        if let Some(name) = get(ENV_FROM_NAME) {
            self.outbound_from_name = Some(name);
        }
        if let Some(host) = get(ENV_LOCAL_HOST_NAME) {
            self.local_host_name = host;
        }
        if let Some(domain) = get(ENV_MESSAGE_ID_DOMAIN) {
            self.message_id_domain = domain;
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.local_host_name.trim().is_empty() {
            return Err(Error::Config("local_host_name must not be empty".into()));
        }
        if self.message_id_domain.trim().is_empty() {
            return Err(Error::Config("message_id_domain must not be empty".into()));
        }
        Ok(())
    }
}
