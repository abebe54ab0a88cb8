//! Domain layer for rask-loki-handler.
//!
//! Contains the canonical types shared across all modules:
//! - `LogRecord`: what the host logging pipeline hands over
//! - `Severity`: record severity and the minimum-level filter
//! - `FieldValue` / `Fields` / `Labels`: structured data attached to records
//! - `StreamEntry` / `EntryLine`: a formatted Loki stream
//! - `HandlerError`: Top-level error type

pub mod error;
pub mod field_value;
pub mod log_record;
pub mod severity;
pub mod stream_entry;

pub use error::HandlerError;
pub use field_value::{FieldValue, Fields, Labels};
pub use log_record::LogRecord;
pub use severity::{ParseSeverityError, Severity};
pub use stream_entry::{EntryLine, StreamEntry};
