mod settings;
mod transport;

pub use settings::{BasicAuth, LokiSettings, PUSH_PATH, SYSTEM_NAME_FIELD, TENANT_ID_FIELD};
pub use transport::{RESERVED_TRANSPORT_OPTIONS, TransportOptions, is_reserved_option};

use crate::domain::{FieldValue, Fields, Severity};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid entrypoint: {0}")]
    InvalidEntrypoint(String),
    #[error("Invalid tenant id: {0}")]
    InvalidTenantId(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Handler configuration as supplied by the user.
///
/// This is the raw surface: nothing is validated until it is turned into
/// [`LokiSettings`], which happens once when a handler is built.
#[derive(Debug, Clone, Deserialize)]
pub struct HandlerConfig {
    /// Scheme, host and port of the Loki service.
    pub entrypoint: String,

    /// Default structured fields added to every line.
    #[serde(default)]
    pub context: Fields,

    /// Default stream labels. Scalar values are stringified.
    #[serde(default)]
    pub labels: BTreeMap<String, FieldValue>,

    /// Name of the system sending the logs, added to every line as `host`.
    #[serde(default)]
    pub client_name: Option<String>,

    /// Transport tuning. Options the handler controls itself are dropped.
    #[serde(default, alias = "curl_options")]
    pub transport_options: BTreeMap<String, FieldValue>,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Sent as `X-Scope-OrgID` and added to every line as `tenantId`.
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// Minimum severity forwarded to Loki.
    #[serde(default)]
    pub level: Severity,

    /// Whether records keep propagating to the next handler in a chain.
    #[serde(default = "default_bubble")]
    pub bubble: bool,
}

fn default_bubble() -> bool {
    true
}

#[derive(Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// `[user, password]`. Any other number of elements disables authentication.
    #[serde(default)]
    pub basic: Option<Vec<String>>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("basic", &self.basic.as_ref().map(|pair| pair.len()))
            .finish()
    }
}

impl HandlerConfig {
    pub fn new(entrypoint: impl Into<String>) -> Self {
        Self {
            entrypoint: entrypoint.into(),
            context: Fields::new(),
            labels: BTreeMap::new(),
            client_name: None,
            transport_options: BTreeMap::new(),
            auth: AuthConfig::default(),
            tenant_id: None,
            level: Severity::Debug,
            bubble: true,
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    pub fn with_transport_option(
        mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Self {
        self.transport_options.insert(name.into(), value.into());
        self
    }

    pub fn with_basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth.basic = Some(vec![user.into(), password.into()]);
        self
    }

    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    pub fn with_bubble(mut self, bubble: bool) -> Self {
        self.bubble = bubble;
        self
    }

    /// Validates and normalizes the configuration.
    pub fn build(self) -> Result<LokiSettings, ConfigError> {
        LokiSettings::from_config(self)
    }
}
