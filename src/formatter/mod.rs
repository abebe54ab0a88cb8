//! Turns log records into Loki stream entries.
//!
//! Formatting is pure: no I/O, no shared mutable state, and ordered maps so
//! the same record always yields the same entry.

use crate::config::{LokiSettings, SYSTEM_NAME_FIELD, TENANT_ID_FIELD};
use crate::domain::{EntryLine, FieldValue, Fields, Labels, LogRecord, StreamEntry};
use chrono::{DateTime, Utc};

/// Nanoseconds since the Unix epoch as a decimal string.
///
/// Computed in `i128`, so every representable `DateTime<Utc>` converts
/// (`timestamp_nanos_opt` only covers 1677..2262).
pub fn nanos_timestamp(timestamp: &DateTime<Utc>) -> String {
    let nanos =
        i128::from(timestamp.timestamp()) * 1_000_000_000 + i128::from(timestamp.timestamp_subsec_nanos());
    nanos.to_string()
}

/// Formats records against the global labels and context of a handler.
#[derive(Debug, Clone, Default)]
pub struct LokiFormatter {
    global_labels: Labels,
    global_context: Fields,
    system_name: Option<String>,
    tenant_id: Option<String>,
}

impl LokiFormatter {
    pub fn new(global_labels: Labels, global_context: Fields, system_name: Option<String>) -> Self {
        Self {
            global_labels,
            global_context,
            system_name,
            tenant_id: None,
        }
    }

    pub fn from_settings(settings: &LokiSettings) -> Self {
        Self {
            global_labels: settings.global_labels().clone(),
            global_context: settings.global_context().clone(),
            system_name: settings.system_name().map(str::to_string),
            tenant_id: settings.tenant_id().map(str::to_string),
        }
    }

    pub fn format(&self, record: &LogRecord) -> StreamEntry {
        let mut labels = self.global_labels.clone();
        labels.extend(
            record
                .labels
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );

        let mut fields = self.global_context.clone();
        if let Some(system_name) = &self.system_name {
            fields.insert(SYSTEM_NAME_FIELD.to_string(), FieldValue::from(system_name.as_str()));
        }
        fields.extend(
            record
                .context
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        // The tenant is routing metadata, records cannot override it.
        if let Some(tenant_id) = &self.tenant_id {
            fields.insert(TENANT_ID_FIELD.to_string(), FieldValue::from(tenant_id.as_str()));
        }

        StreamEntry {
            labels,
            lines: vec![EntryLine {
                timestamp: nanos_timestamp(&record.timestamp),
                message: record.message.clone(),
                level: record.level,
                channel: record.channel.clone(),
                fields,
            }],
        }
    }

    pub fn format_batch<'a, I>(&self, records: I) -> Vec<StreamEntry>
    where
        I: IntoIterator<Item = &'a LogRecord>,
    {
        records.into_iter().map(|record| self.format(record)).collect()
    }
}
