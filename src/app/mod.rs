pub mod cli;
pub mod input;
pub mod logging;

pub use cli::CliConfig;
pub use logging::{LogFormat, LogLevel, init_tracing};

use crate::domain::HandlerError;
use crate::handler::{BufferReport, BufferedHandler, LokiHandler};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Feeds lines from `reader` into the buffered handler until EOF or cancellation,
/// then flushes and stops it.
pub async fn forward_lines<R>(
    buffered: BufferedHandler,
    reader: R,
    cancel: CancellationToken,
) -> Result<BufferReport, HandlerError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Interrupted, flushing pending records");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(record) = input::parse_line(&line) {
                        buffered.send(record).await?;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Failed to read input");
                    buffered.shutdown().await?;
                    return Err(HandlerError::Input(e.to_string()));
                }
            },
        }
    }

    buffered.shutdown().await
}

/// Builds the handler from the CLI configuration and forwards stdin until EOF or Ctrl+C.
pub async fn run(config: CliConfig) -> Result<BufferReport, HandlerError> {
    let handler_config = config.handler_config()?;
    let handler = LokiHandler::new(handler_config)?;

    info!(
        "Starting rask-loki-push v{} (push_url={}, tenant={:?}, level={})",
        env!("CARGO_PKG_VERSION"),
        handler.settings().push_url(),
        handler.settings().tenant_id(),
        handler.settings().level()
    );

    let buffered = BufferedHandler::spawn(handler, config.buffer_config());

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    forward_lines(buffered, tokio::io::stdin(), cancel).await
}

pub async fn main() -> Result<(), anyhow::Error> {
    let config = CliConfig::parse();
    init_tracing(config.log_level, config.log_format)?;
    config.validate()?;

    let report = run(config).await?;
    info!(
        accepted = report.records_accepted,
        dropped = report.records_dropped,
        delivered_batches = report.batches_delivered,
        failed_batches = report.batches_failed,
        "rask-loki-push stopped"
    );

    Ok(())
}
