use crate::domain::{LogRecord, Severity};

/// Turns one input line into a record.
///
/// A JSON object with at least a `message` is taken as a structured record;
/// anything else is forwarded verbatim at `info`. Blank lines are skipped.
pub fn parse_line(line: &str) -> Option<LogRecord> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.trim().is_empty() {
        return None;
    }

    if trimmed.trim_start().starts_with('{')
        && let Ok(record) = serde_json::from_str::<LogRecord>(trimmed)
    {
        return Some(record);
    }

    Some(LogRecord::new(Severity::Info, trimmed))
}
