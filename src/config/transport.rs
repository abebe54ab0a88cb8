use crate::domain::FieldValue;
use reqwest::header::HeaderValue;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Options the handler always sets itself: request method, response
/// capture, request body and request headers.
pub const RESERVED_TRANSPORT_OPTIONS: [&str; 4] = ["method", "capture_response", "body", "headers"];

// curl spellings of the reserved options, after `curlopt_` is stripped.
const RESERVED_ALIASES: [(&str, &str); 4] = [
    ("customrequest", "method"),
    ("returntransfer", "capture_response"),
    ("postfields", "body"),
    ("httpheader", "headers"),
];

/// Transport tuning that survived configuration-time filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportOptions {
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub proxy: Option<Url>,
    pub accept_invalid_certs: bool,
    pub user_agent: String,
    pub max_idle_connections: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: None,
            proxy: None,
            accept_invalid_certs: false,
            user_agent: format!("rask-loki-handler/{}", env!("CARGO_PKG_VERSION")),
            // One attempt per send, no pooled connections.
            max_idle_connections: 0,
        }
    }
}

/// Lowercases, strips a `curlopt_` prefix and maps curl spellings to canonical names.
fn canonical_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase().replace('-', "_");
    let stripped = lowered.strip_prefix("curlopt_").unwrap_or(&lowered);

    RESERVED_ALIASES
        .iter()
        .find(|(alias, _)| *alias == stripped)
        .map_or_else(|| stripped.to_string(), |(_, canonical)| (*canonical).to_string())
}

pub fn is_reserved_option(name: &str) -> bool {
    RESERVED_TRANSPORT_OPTIONS.contains(&canonical_name(name).as_str())
}

fn as_seconds(value: &FieldValue) -> Option<Duration> {
    match value {
        FieldValue::Int(i) if *i >= 0 => Some(Duration::from_secs(*i as u64)),
        FieldValue::UInt(u) => Some(Duration::from_secs(*u)),
        FieldValue::Float(f) => Duration::try_from_secs_f64(*f).ok(),
        FieldValue::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|f| Duration::try_from_secs_f64(f).ok()),
        _ => None,
    }
}

fn as_millis(value: &FieldValue) -> Option<Duration> {
    match value {
        FieldValue::Int(i) if *i >= 0 => Some(Duration::from_millis(*i as u64)),
        FieldValue::UInt(u) => Some(Duration::from_millis(*u)),
        FieldValue::String(s) => s.trim().parse::<u64>().ok().map(Duration::from_millis),
        _ => None,
    }
}

fn as_bool(value: &FieldValue) -> Option<bool> {
    match value {
        FieldValue::Bool(b) => Some(*b),
        FieldValue::Int(i) => Some(*i != 0),
        FieldValue::UInt(u) => Some(*u != 0),
        FieldValue::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_count(value: &FieldValue) -> Option<usize> {
    match value {
        FieldValue::Int(i) if *i >= 0 => Some(*i as usize),
        FieldValue::UInt(u) => Some(*u as usize),
        _ => None,
    }
}

impl TransportOptions {
    /// Builds transport options from the user-supplied map.
    ///
    /// Reserved options are dropped, as are unknown names and values of the
    /// wrong type. Nothing here fails: bad input falls back to defaults.
    pub fn from_user_options(options: &BTreeMap<String, FieldValue>) -> Self {
        let mut transport = TransportOptions::default();

        for (name, value) in options {
            let canonical = canonical_name(name);

            if RESERVED_TRANSPORT_OPTIONS.contains(&canonical.as_str()) {
                warn!(option = %name, "Dropping reserved transport option");
                continue;
            }

            let applied = match canonical.as_str() {
                "timeout" => as_seconds(value).map(|d| transport.timeout = Some(d)),
                "timeout_ms" => as_millis(value).map(|d| transport.timeout = Some(d)),
                "connecttimeout" | "connect_timeout" => {
                    as_seconds(value).map(|d| transport.connect_timeout = Some(d))
                }
                "connecttimeout_ms" | "connect_timeout_ms" => {
                    as_millis(value).map(|d| transport.connect_timeout = Some(d))
                }
                "proxy" => value
                    .as_str()
                    .and_then(|s| Url::parse(s).ok())
                    .map(|url| transport.proxy = Some(url)),
                "insecure" => as_bool(value).map(|b| transport.accept_invalid_certs = b),
                "ssl_verifypeer" => as_bool(value).map(|b| transport.accept_invalid_certs = !b),
                "useragent" | "user_agent" => value
                    .as_str()
                    .filter(|s| HeaderValue::from_str(s).is_ok())
                    .map(|s| transport.user_agent = s.to_string()),
                "max_idle_connections" => {
                    as_count(value).map(|n| transport.max_idle_connections = n)
                }
                _ => {
                    warn!(option = %name, "Dropping unknown transport option");
                    continue;
                }
            };

            if applied.is_none() {
                warn!(option = %name, value = ?value, "Dropping transport option with invalid value");
            }
        }

        transport
    }
}
