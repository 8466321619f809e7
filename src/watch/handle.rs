use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::PollConfig;
use super::poller::{run_poller, RoomPoller};
use crate::api::RoomId;
use crate::event::EventBus;

/// Ownership of one spawned child watcher
///
/// [`cancel`](Self::cancel) consumes the handle, so a watcher is cancelled at
/// most once and nothing can reference it afterwards.
#[derive(Debug)]
pub struct WatcherHandle {
    name: &'static str,
    room_id: RoomId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Spawns `poller` on its own task; it also stops when `parent` is cancelled
    pub fn spawn<P: RoomPoller>(
        poller: P,
        config: PollConfig,
        events: EventBus,
        parent: &CancellationToken,
    ) -> Self {
        let name = poller.name();
        let room_id = poller.room_id();
        let cancel = parent.child_token();
        let task = tokio::spawn(run_poller(poller, config, events, cancel.clone()));

        Self {
            name,
            room_id,
            cancel,
            task,
        }
    }

    /// Signals the watcher and waits until its task has returned
    pub async fn cancel(self) {
        self.cancel.cancel();
        match self.task.await {
            Ok(()) => debug!(watcher = self.name, room_id = self.room_id, "Watcher reclaimed"),
            Err(e) => warn!(
                watcher = self.name,
                room_id = self.room_id,
                error = %e,
                "Watcher task ended abnormally"
            ),
        }
    }
}
