use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::backoff::PollSchedule;
use super::config::PollConfig;
use crate::api::RoomId;
use crate::event::{Event, EventBus, WatchFailure};
use crate::shared::AppError;

/// A per-room collection that is fetched and diffed on every tick
#[async_trait]
pub trait RoomPoller: Send + 'static {
    /// Short label used in logs
    fn name(&self) -> &'static str;

    fn room_id(&self) -> RoomId;

    /// Fetches a snapshot, folds it into the tracked state and returns the
    /// resulting events. An empty batch means nothing changed.
    async fn poll(&mut self) -> Result<Vec<Event>, AppError>;

    /// The terminal event reported to the parent when this poller gives up
    fn failed(&self, failure: WatchFailure) -> Event;
}

/// Drives a poller until `cancel` fires or its strikes run out.
///
/// Cancellation is only observed between polls; a request in flight always
/// completes first.
pub async fn run_poller<P: RoomPoller>(
    mut poller: P,
    config: PollConfig,
    events: EventBus,
    cancel: CancellationToken,
) {
    let name = poller.name();
    let room_id = poller.room_id();
    let mut schedule = PollSchedule::new(&config);

    let timer = sleep(schedule.current());
    tokio::pin!(timer);

    debug!(watcher = name, room_id = room_id, "Watcher started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(watcher = name, room_id = room_id, "Watcher cancelled");
                return;
            }
            _ = &mut timer => {}
        }

        let next = match poller.poll().await {
            Ok(batch) => {
                let changed = !batch.is_empty();
                for event in batch {
                    if !events.emit_until(event, &cancel).await {
                        return;
                    }
                }
                schedule.succeeded(changed)
            }
            Err(e) => {
                let detail = e.to_string();
                match schedule.failed(e) {
                    Ok(pause) => {
                        warn!(
                            watcher = name,
                            room_id = room_id,
                            strikes = schedule.strikes(),
                            error = %detail,
                            "Poll failed, retrying"
                        );
                        pause
                    }
                    Err(fatal) => {
                        error!(watcher = name, room_id = room_id, error = %fatal, "Watcher giving up");
                        events
                            .emit_until(poller.failed(WatchFailure::from(&fatal)), &cancel)
                            .await;
                        return;
                    }
                }
            }
        };

        timer.as_mut().reset(Instant::now() + next);
    }
}
