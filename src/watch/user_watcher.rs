use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use super::poller::RoomPoller;
use crate::api::{ChatApi, RoomId, RoomMembership, UserId};
use crate::event::{Event, WatchFailure};
use crate::shared::AppError;

/// Last known membership of one room, diffed against each new snapshot
#[derive(Debug)]
pub struct MembershipTracker {
    room_id: RoomId,
    members: HashMap<UserId, RoomMembership>,
}

impl MembershipTracker {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            members: HashMap::new(),
        }
    }

    /// Number of members currently tracked
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Replaces the tracked membership with `snapshot` and returns the differences.
    ///
    /// Removals come first, then additions and online flips in user id order.
    /// Users seen for the first time are only ever reported as added.
    pub fn apply(&mut self, snapshot: Vec<RoomMembership>) -> Vec<Event> {
        let fresh: BTreeMap<UserId, RoomMembership> = snapshot
            .into_iter()
            .map(|membership| (membership.user.id.clone(), membership))
            .collect();

        let mut events = Vec::new();

        let mut departed: Vec<UserId> = self
            .members
            .keys()
            .filter(|id| !fresh.contains_key(*id))
            .cloned()
            .collect();
        departed.sort();
        for user_id in departed {
            self.members.remove(&user_id);
            events.push(Event::UserRemoved {
                room_id: self.room_id,
                user_id,
            });
        }

        for (user_id, membership) in fresh {
            match self.members.insert(user_id, membership.clone()) {
                None => events.push(Event::UserAdded { membership }),
                Some(previous) if previous.is_online != membership.is_online => {
                    events.push(Event::UserChanged { membership })
                }
                Some(_) => {}
            }
        }

        events
    }
}

/// Membership watcher for one room
pub struct RoomUserWatcher {
    api: Arc<dyn ChatApi>,
    tracker: MembershipTracker,
}

impl RoomUserWatcher {
    pub fn new(api: Arc<dyn ChatApi>, room_id: RoomId) -> Self {
        Self {
            api,
            tracker: MembershipTracker::new(room_id),
        }
    }
}

#[async_trait]
impl RoomPoller for RoomUserWatcher {
    fn name(&self) -> &'static str {
        "users"
    }

    fn room_id(&self) -> RoomId {
        self.tracker.room_id
    }

    async fn poll(&mut self) -> Result<Vec<Event>, AppError> {
        let snapshot = self.api.list_room_users(self.tracker.room_id).await?;
        let events = self.tracker.apply(snapshot);
        if !events.is_empty() {
            debug!(
                room_id = self.tracker.room_id,
                members = self.tracker.member_count(),
                changes = events.len(),
                "Membership changed"
            );
        }
        Ok(events)
    }

    fn failed(&self, failure: WatchFailure) -> Event {
        Event::UsersFailed {
            room_id: self.tracker.room_id,
            failure,
        }
    }
}
