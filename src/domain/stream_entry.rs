use super::field_value::{Fields, Labels};
use super::severity::Severity;
use serde::Serialize;

/// One formatted stream: a label set and the lines pushed under it.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub labels: Labels,
    pub lines: Vec<EntryLine>,
}

/// A single timestamped line with its structured fields.
///
/// `timestamp` is already in the push API's unit: nanoseconds since the
/// Unix epoch, as a decimal string.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryLine {
    pub timestamp: String,
    pub message: String,
    pub level: Severity,
    pub channel: Option<String>,
    pub fields: Fields,
}

/// JSON document written as the Loki log line.
#[derive(Serialize)]
struct LineDocument<'a> {
    message: &'a str,
    level: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
    #[serde(skip_serializing_if = "Fields::is_empty")]
    context: &'a Fields,
}

impl EntryLine {
    /// Encodes the line text. Fails when a field holds a value JSON cannot represent.
    pub fn render(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&LineDocument {
            message: &self.message,
            level: self.level,
            channel: self.channel.as_deref(),
            context: &self.fields,
        })
    }
}
