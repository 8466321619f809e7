use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use super::poller::RoomPoller;
use crate::api::{ChatApi, Message, MessageId, RoomId};
use crate::event::{Event, WatchFailure};
use crate::shared::AppError;

/// Append-only view of a room's messages
///
/// `watermark` is the newest posted time seen so far and bounds the next
/// query. Ids are remembered only while they sit at or above the watermark;
/// anything older is never asked for again.
#[derive(Debug)]
pub struct MessageLog {
    room_id: RoomId,
    watermark: DateTime<Utc>,
    seen: HashMap<MessageId, DateTime<Utc>>,
}

impl MessageLog {
    pub fn new(room_id: RoomId, watermark: DateTime<Utc>) -> Self {
        Self {
            room_id,
            watermark,
            seen: HashMap::new(),
        }
    }

    pub fn watermark(&self) -> DateTime<Utc> {
        self.watermark
    }

    /// Folds a query window into the log and returns the unseen messages
    /// as events, oldest first.
    pub fn apply(&mut self, mut batch: Vec<Message>) -> Vec<Event> {
        batch.sort_by_key(|message| (message.posted_time, message.id));

        let floor = self.watermark;
        let mut events = Vec::new();

        for message in batch {
            if message.posted_time < floor || self.seen.contains_key(&message.id) {
                continue;
            }

            self.seen.insert(message.id, message.posted_time);
            self.watermark = self.watermark.max(message.posted_time);
            events.push(Event::MessagePosted { message });
        }

        let watermark = self.watermark;
        self.seen.retain(|_, posted| *posted >= watermark);

        events
    }
}

/// Message watcher for one room
pub struct RoomMessageWatcher {
    api: Arc<dyn ChatApi>,
    log: MessageLog,
}

impl RoomMessageWatcher {
    pub fn new(api: Arc<dyn ChatApi>, room_id: RoomId, watermark: DateTime<Utc>) -> Self {
        Self {
            api,
            log: MessageLog::new(room_id, watermark),
        }
    }
}

#[async_trait]
impl RoomPoller for RoomMessageWatcher {
    fn name(&self) -> &'static str {
        "messages"
    }

    fn room_id(&self) -> RoomId {
        self.log.room_id
    }

    async fn poll(&mut self) -> Result<Vec<Event>, AppError> {
        let batch = self
            .api
            .list_room_messages(self.log.room_id, self.log.watermark)
            .await?;
        Ok(self.log.apply(batch))
    }

    fn failed(&self, failure: WatchFailure) -> Event {
        Event::MessagesFailed {
            room_id: self.log.room_id,
            failure,
        }
    }
}
