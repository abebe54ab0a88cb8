use super::logging::{LogFormat, LogLevel};
use crate::config::{ConfigError, HandlerConfig};
use crate::domain::{FieldValue, Severity};
use crate::handler::BufferConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Stream label used when neither the config file nor `--label` sets one.
pub const DEFAULT_JOB_LABEL: (&str, &str) = ("job", "rask-loki-push");

/// Parses `key=value` pairs for `--label` and `--context`.
fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Ship log lines from stdin to a Loki push endpoint.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliConfig {
    /// Loki base URL (scheme, host, port)
    #[arg(long, env = "LOKI_ENTRYPOINT")]
    pub entrypoint: Option<String>,

    /// TOML file with the full handler configuration
    #[arg(long, env = "LOKI_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Tenant id sent as X-Scope-OrgID
    #[arg(long, env = "LOKI_TENANT_ID")]
    pub tenant_id: Option<String>,

    /// Name of the sending system (defaults to the hostname)
    #[arg(long, env = "LOKI_CLIENT_NAME")]
    pub client_name: Option<String>,

    /// Do not add a host field to log lines
    #[arg(long, conflicts_with = "client_name")]
    pub no_client_name: bool,

    /// Basic auth user
    #[arg(long, env = "LOKI_USERNAME")]
    pub username: Option<String>,

    /// Basic auth password
    #[arg(long, env = "LOKI_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Stream label, repeatable (KEY=VALUE)
    #[arg(long = "label", value_parser = parse_key_value)]
    pub labels: Vec<(String, String)>,

    /// Context field added to every line, repeatable (KEY=VALUE)
    #[arg(long = "context", value_parser = parse_key_value)]
    pub context: Vec<(String, String)>,

    /// Minimum severity forwarded to Loki
    #[arg(long, env = "LOKI_LEVEL")]
    pub level: Option<Severity>,

    /// Request timeout in milliseconds
    #[arg(long, env = "LOKI_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Number of records per push
    #[arg(long, env = "BATCH_SIZE", default_value = "500")]
    pub batch_size: usize,

    /// Flush interval in milliseconds
    #[arg(long, env = "FLUSH_INTERVAL_MS", default_value = "1000")]
    pub flush_interval_ms: u64,

    /// Records queued before new ones are dropped
    #[arg(long, env = "BUFFER_CAPACITY", default_value = "10000")]
    pub buffer_capacity: usize,

    /// Verbosity of this tool's own diagnostics
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Format of this tool's own diagnostics
    #[arg(long, env = "RUST_LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,
}

impl CliConfig {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = CliConfig::try_parse_from(args)
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entrypoint.is_none() && self.config_file.is_none() {
            return Err(ConfigError::InvalidConfig(
                "Either --entrypoint or --config-file is required".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.flush_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Flush interval must be greater than 0".to_string(),
            ));
        }

        if self.buffer_capacity < self.batch_size {
            return Err(ConfigError::InvalidConfig(format!(
                "Buffer capacity ({}) must be at least as large as batch size ({})",
                self.buffer_capacity, self.batch_size
            )));
        }

        Ok(())
    }

    /// Handler configuration: the config file if any, overridden by CLI values.
    pub fn handler_config(&self) -> Result<HandlerConfig, ConfigError> {
        let mut config = match (&self.config_file, &self.entrypoint) {
            (Some(path), _) => HandlerConfig::from_file(path)?,
            (None, Some(entrypoint)) => HandlerConfig::new(entrypoint.clone()),
            (None, None) => {
                return Err(ConfigError::InvalidConfig(
                    "Either --entrypoint or --config-file is required".to_string(),
                ));
            }
        };

        if let Some(entrypoint) = &self.entrypoint {
            config.entrypoint = entrypoint.clone();
        }

        if let Some(tenant_id) = &self.tenant_id {
            config.tenant_id = Some(tenant_id.clone());
        }

        if self.no_client_name {
            config.client_name = None;
        } else if let Some(client_name) = &self.client_name {
            config.client_name = Some(client_name.clone());
        } else if config.client_name.is_none() {
            config.client_name = hostname::get()
                .ok()
                .and_then(|name| name.into_string().ok());
        }

        match (&self.username, &self.password) {
            (Some(user), Some(password)) => {
                config.auth.basic = Some(vec![user.clone(), password.clone()]);
            }
            (None, None) => {}
            _ => warn!("Ignoring basic auth: both --username and --password are required"),
        }

        for (key, value) in &self.labels {
            config.labels.insert(key.clone(), FieldValue::from(value.as_str()));
        }

        // Loki rejects streams without a single label.
        if config.labels.is_empty() {
            config
                .labels
                .insert(DEFAULT_JOB_LABEL.0.to_string(), FieldValue::from(DEFAULT_JOB_LABEL.1));
        }

        for (key, value) in &self.context {
            config.context.insert(key.clone(), FieldValue::from(value.as_str()));
        }

        if let Some(level) = self.level {
            config.level = level;
        }

        if let Some(timeout_ms) = self.timeout_ms {
            config
                .transport_options
                .insert("timeout_ms".to_string(), FieldValue::UInt(timeout_ms));
        }

        Ok(config)
    }

    pub fn buffer_config(&self) -> BufferConfig {
        BufferConfig {
            batch_size: self.batch_size,
            flush_interval: Duration::from_millis(self.flush_interval_ms),
            channel_capacity: self.buffer_capacity,
        }
    }
}
