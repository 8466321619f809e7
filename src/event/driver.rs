use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::bus::EventStream;
use super::events::{ControlAction, Event, WatchFailure};
use crate::shared::AppError;

/// Why the driver stopped consuming events
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    /// A control command (or Ctrl-C) asked to stop
    Requested(ControlAction),
    /// The room watcher gave up and tore down its children
    WatcherFailed(WatchFailure),
    /// Every producer dropped its bus handle
    ProducersClosed,
}

/// The single consumer of the event stream
///
/// Writes each event as one line to `output` in arrival order and owns the
/// shutdown of the watcher hierarchy.
pub struct Driver<W> {
    events: EventStream,
    shutdown: CancellationToken,
    output: W,
}

impl<W> Driver<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(events: EventStream, shutdown: CancellationToken, output: W) -> Self {
        Self {
            events,
            shutdown,
            output,
        }
    }

    /// Runs until a termination event arrives, then cancels the hierarchy and
    /// waits for `hierarchy` to finish before returning.
    pub async fn run(self, hierarchy: JoinHandle<()>) -> Result<ShutdownReason, AppError> {
        let Driver {
            mut events,
            shutdown,
            mut output,
        } = self;

        let result = consume(&mut events, &mut output).await;

        shutdown.cancel();
        drop(events);

        if let Err(e) = hierarchy.await {
            error!(error = %e, "Watcher hierarchy ended abnormally");
        }
        info!("Watcher hierarchy stopped");

        result
    }
}

async fn consume<W>(events: &mut EventStream, output: &mut W) -> Result<ShutdownReason, AppError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = events.recv().await {
        // Control events end the stream without being echoed
        if !matches!(event, Event::Interface { .. }) {
            write_event(output, &event).await?;
        }

        if !event.is_termination() {
            continue;
        }

        return Ok(match event {
            Event::Interface { action } => {
                info!(action = action.as_str(), "Shutdown requested");
                ShutdownReason::Requested(action)
            }
            Event::RoomsFailed { failure } => {
                error!(error = %failure, "Room watcher failed, shutting down");
                ShutdownReason::WatcherFailed(failure)
            }
            _ => continue,
        });
    }

    Ok(ShutdownReason::ProducersClosed)
}

async fn write_event<W>(output: &mut W, event: &Event) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    match event.wire_line() {
        Ok(line) => {
            output.write_all(line.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
        }
        Err(e) => {
            warn!(
                domain = event.domain().as_str(),
                action = event.action(),
                error = %e,
                "Skipping event that could not be encoded"
            );
        }
    }
    Ok(())
}
