use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use roomwatch::api::{Account, ChatApi, Message, Room, RoomId, RoomMembership};
use roomwatch::AppError;

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Queued responses, then a fallback repeated forever
struct Script<T> {
    queue: VecDeque<Result<T, AppError>>,
    fallback: Result<T, AppError>,
}

impl<T: Clone> Script<T> {
    fn new(fallback: Result<T, AppError>) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback,
        }
    }

    fn next(&mut self) -> Result<T, AppError> {
        self.queue
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Chat service double whose responses are scripted per call
pub struct ScriptedChatApi {
    account: Account,
    rooms: Mutex<Script<Vec<Room>>>,
    users: Mutex<HashMap<RoomId, Script<Vec<RoomMembership>>>>,
    messages: Mutex<HashMap<RoomId, Script<Vec<Message>>>>,
    room_latency: Mutex<Duration>,
    room_polls: Mutex<usize>,
    user_polls: Mutex<HashMap<RoomId, usize>>,
    message_queries: Mutex<Vec<(RoomId, DateTime<Utc>)>>,
    commands: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedChatApi {
    pub fn new() -> Self {
        Self {
            account: Account {
                user_id: "u-me".to_string(),
                login_user: "me".to_string(),
            },
            rooms: Mutex::new(Script::new(Ok(Vec::new()))),
            users: Mutex::new(HashMap::new()),
            messages: Mutex::new(HashMap::new()),
            room_latency: Mutex::new(Duration::ZERO),
            room_polls: Mutex::new(0),
            user_polls: Mutex::new(HashMap::new()),
            message_queries: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_rooms(&self, response: Result<Vec<Room>, AppError>) {
        self.rooms.lock().unwrap().queue.push_back(response);
    }

    pub fn always_rooms(&self, response: Result<Vec<Room>, AppError>) {
        self.rooms.lock().unwrap().fallback = response;
    }

    pub fn queue_users(&self, room_id: RoomId, response: Result<Vec<RoomMembership>, AppError>) {
        self.users
            .lock()
            .unwrap()
            .entry(room_id)
            .or_insert_with(|| Script::new(Ok(Vec::new())))
            .queue
            .push_back(response);
    }

    pub fn always_users(&self, room_id: RoomId, response: Result<Vec<RoomMembership>, AppError>) {
        self.users
            .lock()
            .unwrap()
            .entry(room_id)
            .or_insert_with(|| Script::new(Ok(Vec::new())))
            .fallback = response;
    }

    pub fn queue_messages(&self, room_id: RoomId, response: Result<Vec<Message>, AppError>) {
        self.messages
            .lock()
            .unwrap()
            .entry(room_id)
            .or_insert_with(|| Script::new(Ok(Vec::new())))
            .queue
            .push_back(response);
    }

    pub fn always_messages(&self, room_id: RoomId, response: Result<Vec<Message>, AppError>) {
        self.messages
            .lock()
            .unwrap()
            .entry(room_id)
            .or_insert_with(|| Script::new(Ok(Vec::new())))
            .fallback = response;
    }

    /// Makes every later room list request take `latency` to answer
    pub fn slow_rooms(&self, latency: Duration) {
        *self.room_latency.lock().unwrap() = latency;
    }

    pub fn user_polls(&self, room_id: RoomId) -> usize {
        self.user_polls
            .lock()
            .unwrap()
            .get(&room_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn room_polls(&self) -> usize {
        *self.room_polls.lock().unwrap()
    }

    pub fn message_queries(&self, room_id: RoomId) -> Vec<DateTime<Utc>> {
        self.message_queries
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == room_id)
            .map(|(_, since)| *since)
            .collect()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, command: String) {
        self.commands.lock().unwrap().push(command);
    }
}

#[async_trait]
impl ChatApi for ScriptedChatApi {
    fn account(&self) -> &Account {
        &self.account
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, AppError> {
        *self.room_polls.lock().unwrap() += 1;
        let response = self.rooms.lock().unwrap().next();

        let latency = *self.room_latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        response
    }

    async fn list_room_users(&self, room_id: RoomId) -> Result<Vec<RoomMembership>, AppError> {
        *self.user_polls.lock().unwrap().entry(room_id).or_insert(0) += 1;
        self.users
            .lock()
            .unwrap()
            .get_mut(&room_id)
            .map_or(Ok(Vec::new()), Script::next)
    }

    async fn list_room_messages(
        &self,
        room_id: RoomId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, AppError> {
        self.message_queries.lock().unwrap().push((room_id, since));
        let batch = self
            .messages
            .lock()
            .unwrap()
            .get_mut(&room_id)
            .map_or(Ok(Vec::new()), Script::next)?;

        // Behave like the server-side filter
        Ok(batch
            .into_iter()
            .filter(|message| message.posted_time >= since)
            .collect())
    }

    async fn join_room(&self, room_id: RoomId) -> Result<(), AppError> {
        self.record(format!("join {}", room_id));
        Ok(())
    }

    async fn leave_room(&self, room_id: RoomId) -> Result<(), AppError> {
        self.record(format!("leave {}", room_id));
        Ok(())
    }

    async fn post_message(&self, room_id: RoomId, text: &str) -> Result<(), AppError> {
        self.record(format!("send {} {}", room_id, text));
        Ok(())
    }
}
