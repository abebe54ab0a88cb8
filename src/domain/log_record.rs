use super::field_value::{FieldValue, Fields, Labels};
use super::severity::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A log record as handed over by the host logging pipeline.
///
/// The message is already rendered (placeholders interpolated upstream).
/// `labels` are per-record stream label overrides; `context` holds the
/// record's own structured fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_severity", alias = "level_name")]
    pub level: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Fields::is_empty")]
    pub context: Fields,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

fn default_severity() -> Severity {
    Severity::Info
}

impl LogRecord {
    pub fn new(level: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            channel: None,
            context: Fields::new(),
            labels: Labels::new(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accumulates_fields() {
        let record = LogRecord::new(Severity::Error, "disk full")
            .with_channel("storage")
            .with_context("free_bytes", 0u64)
            .with_label("job", "backup");

        assert_eq!(record.level, Severity::Error);
        assert_eq!(record.channel.as_deref(), Some("storage"));
        assert_eq!(record.context["free_bytes"], FieldValue::UInt(0));
        assert_eq!(record.labels["job"], "backup");
    }

    #[test]
    fn test_deserialize_minimal_record_uses_defaults() {
        let record: LogRecord = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(record.level, Severity::Info);
        assert!(record.context.is_empty());
        assert!(record.channel.is_none());
    }
}
