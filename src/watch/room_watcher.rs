use futures::future::join_all;
use std::collections::{BTreeMap, VecDeque};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::backoff::PollSchedule;
use super::config::WatchConfig;
use super::handle::WatcherHandle;
use super::message_watcher::RoomMessageWatcher;
use super::user_watcher::RoomUserWatcher;
use crate::api::{ChatApi, Room, RoomId};
use crate::event::{Event, EventBus, EventStream, FailureKind, WatchFailure};

/// A known room and the two watchers it owns
struct WatchedRoom {
    room: Room,
    users: WatcherHandle,
    messages: WatcherHandle,
}

impl WatchedRoom {
    async fn release(self) {
        tokio::join!(self.users.cancel(), self.messages.cancel());
    }
}

/// Top of the watcher hierarchy
///
/// Polls the room list, starts a membership and a message watcher for every
/// room that appears, stops them when it disappears and relays their events
/// to the driver.
pub struct RoomWatcher {
    api: Arc<dyn ChatApi>,
    config: WatchConfig,
    outbound: EventBus,
    shutdown: CancellationToken,
    child_bus: EventBus,
    child_events: EventStream,
    /// Child events pulled off the channel while retiring a room, still to be handled
    backlog: VecDeque<Event>,
    rooms: BTreeMap<RoomId, WatchedRoom>,
}

impl RoomWatcher {
    pub fn new(
        api: Arc<dyn ChatApi>,
        config: WatchConfig,
        outbound: EventBus,
        shutdown: CancellationToken,
    ) -> Self {
        let (child_bus, child_events) = EventBus::channel(config.channel_capacity);
        Self {
            api,
            config,
            outbound,
            shutdown,
            child_bus,
            child_events,
            backlog: VecDeque::new(),
            rooms: BTreeMap::new(),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until shutdown is signalled or the room list can no longer be read.
    /// Every child has returned by the time this does.
    pub async fn run(mut self) {
        let mut schedule = PollSchedule::new(&self.config.rooms());

        let timer = sleep(schedule.current());
        tokio::pin!(timer);

        info!(
            min_delay_ms = self.config.min_delay.as_millis() as u64,
            max_delay_ms = self.config.max_delay.as_millis() as u64,
            "Room watcher started"
        );

        loop {
            if let Some(event) = self.backlog.pop_front() {
                if self.on_child_event(event).await.is_break() {
                    return;
                }
                continue;
            }

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!(rooms = self.rooms.len(), "Room watcher stopping");
                    self.release_all().await;
                    return;
                }
                Some(event) = self.child_events.recv() => {
                    if self.on_child_event(event).await.is_break() {
                        return;
                    }
                }
                _ = &mut timer => {
                    let next = match self.api.list_rooms().await {
                        Ok(rooms) => {
                            let changed = self.reconcile(rooms).await;
                            schedule.succeeded(changed)
                        }
                        Err(e) => {
                            let detail = e.to_string();
                            match schedule.failed(e) {
                                Ok(pause) => {
                                    warn!(strikes = schedule.strikes(), error = %detail, "Room list failed, retrying");
                                    pause
                                }
                                Err(fatal) => {
                                    self.fail(WatchFailure::from(&fatal)).await;
                                    return;
                                }
                            }
                        }
                    };
                    timer.as_mut().reset(Instant::now() + next);
                }
            }
        }
    }

    /// Applies a room list snapshot. Returns whether any room came or went.
    #[instrument(skip(self, snapshot), fields(known = self.rooms.len()))]
    async fn reconcile(&mut self, snapshot: Vec<Room>) -> bool {
        let fresh: BTreeMap<RoomId, Room> = snapshot.into_iter().map(|room| (room.id, room)).collect();

        let gone: Vec<RoomId> = self
            .rooms
            .keys()
            .filter(|id| !fresh.contains_key(*id))
            .copied()
            .collect();
        let mut changed = !gone.is_empty();

        for (room_id, room) in fresh {
            match self.rooms.get_mut(&room_id) {
                Some(watched) => watched.room = room,
                None => {
                    changed = true;
                    self.admit(room).await;
                }
            }
        }

        for room_id in gone {
            self.retire(room_id).await;
        }

        changed
    }

    /// Announces a new room and starts its watchers
    async fn admit(&mut self, room: Room) {
        let room_id = room.id;
        info!(room_id = room_id, name = %room.name, "Room added");

        self.emit(Event::RoomAdded { room: room.clone() }).await;

        let users = WatcherHandle::spawn(
            RoomUserWatcher::new(self.api.clone(), room_id),
            self.config.users(),
            self.child_bus.clone(),
            &self.shutdown,
        );
        let messages = WatcherHandle::spawn(
            RoomMessageWatcher::new(self.api.clone(), room_id, room.message_watermark()),
            self.config.messages(),
            self.child_bus.clone(),
            &self.shutdown,
        );

        self.rooms.insert(
            room_id,
            WatchedRoom {
                room,
                users,
                messages,
            },
        );
    }

    /// Stops a room's watchers, then announces its removal
    async fn retire(&mut self, room_id: RoomId) {
        let Some(watched) = self.rooms.remove(&room_id) else {
            debug!(room_id = room_id, "Room already retired");
            return;
        };

        let name = watched.room.name.clone();
        watched.release().await;

        // Its watchers are gone, so nothing for this room can follow what is
        // already queued. Observed changes still go out ahead of the removal.
        let mut observed = Vec::new();
        while let Ok(event) = self.child_events.try_recv() {
            if event.room_id() != Some(room_id) {
                self.backlog.push_back(event);
                continue;
            }
            match child_failure(&event) {
                // Rejected credentials still fail the hierarchy
                Some(FailureKind::Unauthorized) => self.backlog.push_back(event),
                Some(_) => debug!(room_id = room_id, "Dropping failure of retired watcher"),
                None => observed.push(event),
            }
        }
        for event in observed {
            self.emit(event).await;
        }

        info!(room_id = room_id, name = %name, "Room removed");
        self.emit(Event::RoomRemoved { room_id }).await;
    }

    async fn on_child_event(&mut self, event: Event) -> ControlFlow<()> {
        match event {
            Event::UsersFailed { room_id, failure } | Event::MessagesFailed { room_id, failure } => {
                if failure.kind == FailureKind::Unauthorized {
                    self.fail(failure).await;
                    return ControlFlow::Break(());
                }

                warn!(room_id = room_id, error = %failure, "Room watcher child failed, dropping room");
                self.retire(room_id).await;
            }
            event => match event.room_id() {
                Some(room_id) if self.rooms.contains_key(&room_id) => self.emit(event).await,
                _ => debug!(
                    domain = event.domain().as_str(),
                    action = event.action(),
                    "Dropping event for retired room"
                ),
            },
        }

        ControlFlow::Continue(())
    }

    /// Tears down every child and reports the terminal error
    async fn fail(&mut self, failure: WatchFailure) {
        error!(error = %failure, "Room watcher giving up");
        self.release_all().await;
        self.emit(Event::RoomsFailed { failure }).await;
    }

    async fn release_all(&mut self) {
        let rooms = std::mem::take(&mut self.rooms);
        join_all(rooms.into_values().map(WatchedRoom::release)).await;
    }

    async fn emit(&self, event: Event) {
        if !self.outbound.emit_until(event, &self.shutdown).await {
            debug!("Outbound event not delivered, shutting down");
        }
    }
}

fn child_failure(event: &Event) -> Option<FailureKind> {
    match event {
        Event::UsersFailed { failure, .. } | Event::MessagesFailed { failure, .. } => {
            Some(failure.kind)
        }
        _ => None,
    }
}
