use super::{Delivery, LokiHandler};
use crate::domain::{HandlerError, LogRecord};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// `tokio::time::interval` rejects a zero period.
const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Pending records that trigger an immediate flush.
    pub batch_size: usize,
    pub flush_interval: Duration,
    /// Records queued between callers and the worker. Pushes beyond it are dropped.
    pub channel_capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            flush_interval: Duration::from_secs(1),
            channel_capacity: 10_000,
        }
    }
}

/// Counters collected over the lifetime of a [`BufferedHandler`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferReport {
    pub records_accepted: u64,
    pub records_dropped: u64,
    pub batches_delivered: u64,
    pub batches_failed: u64,
}

#[derive(Debug, Default)]
struct BufferStats {
    records_accepted: AtomicU64,
    records_dropped: AtomicU64,
    batches_delivered: AtomicU64,
    batches_failed: AtomicU64,
}

impl BufferStats {
    fn snapshot(&self) -> BufferReport {
        BufferReport {
            records_accepted: self.records_accepted.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
        }
    }
}

enum Command {
    Record(LogRecord),
    Flush(oneshot::Sender<()>),
}

/// Non-blocking front for [`LokiHandler`].
///
/// `push` only enqueues; a background task batches records and hands them
/// to `LokiHandler::handle_batch` when `batch_size` is reached or every
/// `flush_interval`. Delivery failures and encoding errors are logged by the
/// worker and never reach the caller.
pub struct BufferedHandler {
    handler: LokiHandler,
    tx: mpsc::Sender<Command>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
    stats: Arc<BufferStats>,
}

impl BufferedHandler {
    /// Starts the worker task. Must be called from within a Tokio runtime.
    pub fn spawn(handler: LokiHandler, config: BufferConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let cancel = CancellationToken::new();
        let stats = Arc::new(BufferStats::default());

        let worker = tokio::spawn(run_worker(
            handler.clone(),
            rx,
            cancel.clone(),
            config,
            Arc::clone(&stats),
        ));

        Self {
            handler,
            tx,
            cancel,
            worker,
            stats,
        }
    }

    /// Queues a record. Returns `false` when it was filtered out or dropped.
    pub fn push(&self, record: LogRecord) -> bool {
        if !self.handler.is_handling(&record) {
            return false;
        }

        match self.tx.try_send(Command::Record(record)) {
            Ok(()) => {
                self.stats.records_accepted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(err) => {
                self.stats.records_dropped.fetch_add(1, Ordering::Relaxed);
                let reason = match err {
                    mpsc::error::TrySendError::Full(_) => "buffer full",
                    mpsc::error::TrySendError::Closed(_) => "worker stopped",
                };
                warn!(reason, "Dropping log record");
                false
            }
        }
    }

    /// Queues a record, waiting for room in the channel instead of dropping it.
    ///
    /// Returns `false` when the record was filtered out.
    pub async fn send(&self, record: LogRecord) -> Result<bool, HandlerError> {
        if !self.handler.is_handling(&record) {
            return Ok(false);
        }

        self.tx
            .send(Command::Record(record))
            .await
            .map_err(|_| HandlerError::Shutdown("buffer worker is not running".to_string()))?;
        self.stats.records_accepted.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    /// Delivers everything queued so far and waits for the attempt to finish.
    pub async fn flush(&self) -> Result<(), HandlerError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(ack_tx))
            .await
            .map_err(|_| HandlerError::Shutdown("buffer worker is not running".to_string()))?;
        ack_rx
            .await
            .map_err(|_| HandlerError::Shutdown("buffer worker stopped before flushing".to_string()))
    }

    pub fn report(&self) -> BufferReport {
        self.stats.snapshot()
    }

    /// Stops accepting records, flushes what is queued and waits for the worker.
    pub async fn shutdown(self) -> Result<BufferReport, HandlerError> {
        self.cancel.cancel();
        drop(self.tx);
        self.worker
            .await
            .map_err(|e| HandlerError::Shutdown(format!("buffer worker panicked: {e}")))?;

        let report = self.stats.snapshot();
        info!(
            accepted = report.records_accepted,
            dropped = report.records_dropped,
            delivered = report.batches_delivered,
            failed = report.batches_failed,
            "Buffered Loki handler stopped"
        );
        Ok(report)
    }
}

async fn run_worker(
    handler: LokiHandler,
    mut rx: mpsc::Receiver<Command>,
    cancel: CancellationToken,
    config: BufferConfig,
    stats: Arc<BufferStats>,
) {
    let batch_size = config.batch_size.max(1);
    let mut pending: Vec<LogRecord> = Vec::with_capacity(batch_size);
    let flush_interval = config.flush_interval.max(MIN_FLUSH_INTERVAL);
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    debug!(batch_size, flush_interval_ms = flush_interval.as_millis() as u64, "Buffer worker started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            command = rx.recv() => match command {
                Some(Command::Record(record)) => {
                    pending.push(record);
                    if pending.len() >= batch_size {
                        flush_pending(&handler, &mut pending, &stats).await;
                    }
                }
                Some(Command::Flush(ack)) => {
                    flush_pending(&handler, &mut pending, &stats).await;
                    let _ = ack.send(());
                }
                None => break,
            },
            _ = ticker.tick() => flush_pending(&handler, &mut pending, &stats).await,
        }
    }

    // Drain whatever was queued before the stop.
    rx.close();
    let mut acks = Vec::new();
    while let Ok(command) = rx.try_recv() {
        match command {
            Command::Record(record) => pending.push(record),
            Command::Flush(ack) => acks.push(ack),
        }
    }
    for chunk in std::mem::take(&mut pending).chunks(batch_size) {
        let mut batch = chunk.to_vec();
        flush_pending(&handler, &mut batch, &stats).await;
    }
    for ack in acks {
        let _ = ack.send(());
    }
}

async fn flush_pending(handler: &LokiHandler, pending: &mut Vec<LogRecord>, stats: &BufferStats) {
    if pending.is_empty() {
        return;
    }

    let batch = std::mem::take(pending);
    let count = batch.len();

    match handler.handle_batch(batch).await {
        Ok(Delivery::Attempted(outcome)) if outcome.delivered => {
            stats.batches_delivered.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Delivery::Attempted(_)) => {
            stats.batches_failed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Delivery::Filtered) => {}
        Err(e) => {
            stats.batches_failed.fetch_add(1, Ordering::Relaxed);
            error!(records = count, error = %e, "Dropping batch that cannot be encoded");
        }
    }
}
