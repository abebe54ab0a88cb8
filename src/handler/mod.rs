//! Adapter entry points: filter, format and push log records.

mod buffered;

pub use buffered::{BufferConfig, BufferReport, BufferedHandler};

use crate::config::{ConfigError, HandlerConfig, LokiSettings};
use crate::domain::LogRecord;
use crate::formatter::LokiFormatter;
use crate::sender::{BatchSender, SendOutcome, SerializationError};
use std::sync::Arc;
use tracing::trace;

/// Hook run on every accepted record before it is formatted.
pub trait RecordProcessor: Send + Sync {
    fn process(&self, record: LogRecord) -> LogRecord;
}

impl<F> RecordProcessor for F
where
    F: Fn(LogRecord) -> LogRecord + Send + Sync,
{
    fn process(&self, record: LogRecord) -> LogRecord {
        self(record)
    }
}

/// What happened to a `handle_one` / `handle_batch` call.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// No record reached the minimum severity; nothing was sent.
    Filtered,
    /// One push was attempted.
    Attempted(SendOutcome),
}

impl Delivery {
    pub fn delivered(&self) -> bool {
        matches!(self, Delivery::Attempted(outcome) if outcome.delivered)
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, Delivery::Filtered)
    }

    pub fn outcome(&self) -> Option<&SendOutcome> {
        match self {
            Delivery::Attempted(outcome) => Some(outcome),
            Delivery::Filtered => None,
        }
    }
}

/// Forwards log records to Loki.
///
/// Cheap to clone and safe to share between tasks: all state is immutable
/// after construction. Each call formats its records and makes at most one
/// push, returning once that attempt is over.
#[derive(Clone)]
pub struct LokiHandler {
    settings: Arc<LokiSettings>,
    formatter: Arc<LokiFormatter>,
    sender: BatchSender,
    processors: Vec<Arc<dyn RecordProcessor>>,
}

impl LokiHandler {
    pub fn new(config: HandlerConfig) -> Result<Self, ConfigError> {
        Self::from_settings(config.build()?)
    }

    pub fn from_settings(settings: LokiSettings) -> Result<Self, ConfigError> {
        let settings = Arc::new(settings);
        let formatter = Arc::new(LokiFormatter::from_settings(&settings));
        let sender = BatchSender::new(Arc::clone(&settings))?;

        Ok(Self {
            settings,
            formatter,
            sender,
            processors: Vec::new(),
        })
    }

    /// Adds a processor. Processors run in the order they were added.
    pub fn with_processor<P>(mut self, processor: P) -> Self
    where
        P: RecordProcessor + 'static,
    {
        self.processors.push(Arc::new(processor));
        self
    }

    pub fn with_formatter(mut self, formatter: LokiFormatter) -> Self {
        self.formatter = Arc::new(formatter);
        self
    }

    pub fn settings(&self) -> &LokiSettings {
        &self.settings
    }

    pub fn formatter(&self) -> &LokiFormatter {
        &self.formatter
    }

    /// Whether the record reaches the configured minimum severity.
    pub fn is_handling(&self, record: &LogRecord) -> bool {
        record.level >= self.settings.level()
    }

    /// Whether records keep propagating to the next handler after this one.
    pub fn bubble(&self) -> bool {
        self.settings.bubble()
    }

    fn process(&self, record: LogRecord) -> LogRecord {
        self.processors
            .iter()
            .fold(record, |record, processor| processor.process(record))
    }

    /// Pushes a single record as its own payload.
    pub async fn handle_one(&self, record: LogRecord) -> Result<Delivery, SerializationError> {
        if !self.is_handling(&record) {
            trace!(level = %record.level, "Record below minimum severity");
            return Ok(Delivery::Filtered);
        }

        let entry = self.formatter.format(&self.process(record));
        let outcome = self.sender.send_batch(vec![entry]).await?;
        Ok(Delivery::Attempted(outcome))
    }

    /// Pushes every accepted record in one payload, one stream per record.
    pub async fn handle_batch<I>(&self, records: I) -> Result<Delivery, SerializationError>
    where
        I: IntoIterator<Item = LogRecord>,
    {
        let entries: Vec<_> = records
            .into_iter()
            .filter(|record| self.is_handling(record))
            .map(|record| self.formatter.format(&self.process(record)))
            .collect();

        if entries.is_empty() {
            trace!("No record in batch reached minimum severity");
            return Ok(Delivery::Filtered);
        }

        let outcome = self.sender.send_batch(entries).await?;
        Ok(Delivery::Attempted(outcome))
    }
}

impl std::fmt::Debug for LokiHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LokiHandler")
            .field("settings", &self.settings)
            .field("processors", &self.processors.len())
            .finish()
    }
}
