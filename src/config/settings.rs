use super::transport::TransportOptions;
use super::{ConfigError, HandlerConfig};
use crate::domain::{FieldValue, Fields, Labels, Severity};
use reqwest::header::HeaderValue;
use tracing::warn;
use url::Url;

/// Path of the Loki push API, appended to the entrypoint.
pub const PUSH_PATH: &str = "/loki/api/v1/push";

/// Context key carrying the configured system name.
pub const SYSTEM_NAME_FIELD: &str = "host";

/// Context key carrying the configured tenant id.
pub const TENANT_ID_FIELD: &str = "tenantId";

/// HTTP Basic Authentication credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validated, normalized handler settings. Immutable once built.
#[derive(Debug, Clone)]
pub struct LokiSettings {
    entrypoint: String,
    push_url: Url,
    global_labels: Labels,
    global_context: Fields,
    system_name: Option<String>,
    tenant_id: Option<String>,
    tenant_header: Option<HeaderValue>,
    basic_auth: Option<BasicAuth>,
    transport: TransportOptions,
    level: Severity,
    bubble: bool,
}

/// Strips trailing slashes and checks the entrypoint is an absolute http(s) URL.
fn normalize_entrypoint(raw: &str) -> Result<(String, Url), ConfigError> {
    let entrypoint = raw.trim().trim_end_matches('/');

    let parsed = Url::parse(entrypoint)
        .map_err(|e| ConfigError::InvalidEntrypoint(format!("'{raw}': {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEntrypoint(format!(
            "'{raw}': scheme must be http or https"
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::InvalidEntrypoint(format!("'{raw}': missing host")));
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err(ConfigError::InvalidEntrypoint(format!(
            "'{}': credentials belong in auth.basic, not in the URL",
            redact_userinfo(&parsed)
        )));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(ConfigError::InvalidEntrypoint(format!(
            "'{raw}': query strings and fragments are not allowed"
        )));
    }

    let push_url = Url::parse(&format!("{entrypoint}{PUSH_PATH}"))
        .map_err(|e| ConfigError::InvalidEntrypoint(format!("'{raw}': {e}")))?;

    Ok((entrypoint.to_string(), push_url))
}

fn redact_userinfo(url: &Url) -> Url {
    let mut redacted = url.clone();
    let _ = redacted.set_username("");
    let _ = redacted.set_password(None);
    redacted
}

fn basic_auth_from_pair(pair: Option<Vec<String>>) -> Option<BasicAuth> {
    let pair = pair?;
    match <[String; 2]>::try_from(pair) {
        Ok([username, password]) => Some(BasicAuth { username, password }),
        Err(pair) => {
            warn!(
                elements = pair.len(),
                "Ignoring auth.basic: expected exactly 2 elements (user, password)"
            );
            None
        }
    }
}

impl LokiSettings {
    pub fn from_config(config: HandlerConfig) -> Result<Self, ConfigError> {
        let (entrypoint, push_url) = normalize_entrypoint(&config.entrypoint)?;

        let global_labels: Labels = config
            .labels
            .iter()
            .map(|(key, value)| (key.clone(), value.to_label_value()))
            .collect();

        if global_labels.is_empty() {
            warn!("No global labels configured; Loki rejects records that carry no labels of their own");
        }

        let mut global_context = config.context;

        let tenant_header = match &config.tenant_id {
            Some(tenant) => {
                let header = HeaderValue::from_str(tenant).map_err(|e| {
                    ConfigError::InvalidTenantId(format!("'{tenant}' is not a valid header value: {e}"))
                })?;
                global_context.insert(TENANT_ID_FIELD.to_string(), FieldValue::from(tenant.as_str()));
                Some(header)
            }
            None => None,
        };

        let transport = TransportOptions::from_user_options(&config.transport_options);

        Ok(Self {
            entrypoint,
            push_url,
            global_labels,
            global_context,
            system_name: config.client_name,
            tenant_id: config.tenant_id,
            tenant_header,
            basic_auth: basic_auth_from_pair(config.auth.basic),
            transport,
            level: config.level,
            bubble: config.bubble,
        })
    }

    /// Base URL, never ending with `/`.
    pub fn entrypoint(&self) -> &str {
        &self.entrypoint
    }

    /// `{entrypoint}/loki/api/v1/push`
    pub fn push_url(&self) -> &Url {
        &self.push_url
    }

    pub fn global_labels(&self) -> &Labels {
        &self.global_labels
    }

    /// Global context, including the tenant id when one is configured.
    pub fn global_context(&self) -> &Fields {
        &self.global_context
    }

    pub fn system_name(&self) -> Option<&str> {
        self.system_name.as_deref()
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub(crate) fn tenant_header(&self) -> Option<&HeaderValue> {
        self.tenant_header.as_ref()
    }

    pub fn basic_auth(&self) -> Option<&BasicAuth> {
        self.basic_auth.as_ref()
    }

    pub fn transport(&self) -> &TransportOptions {
        &self.transport
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    pub fn bubble(&self) -> bool {
        self.bubble
    }
}
