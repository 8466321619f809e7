use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{Account, Message, Room, RoomId, RoomMembership};
use crate::shared::AppError;

/// Operations the watchers and the command dispatcher need from the chat service
///
/// Implementations must serialize their outbound requests; every watcher shares
/// one instance.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// The account established at login
    fn account(&self) -> &Account;

    async fn list_rooms(&self) -> Result<Vec<Room>, AppError>;
    async fn list_room_users(&self, room_id: RoomId) -> Result<Vec<RoomMembership>, AppError>;

    /// Messages posted at or after `since`. Windows may overlap between calls.
    async fn list_room_messages(
        &self,
        room_id: RoomId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, AppError>;

    async fn join_room(&self, room_id: RoomId) -> Result<(), AppError>;
    async fn leave_room(&self, room_id: RoomId) -> Result<(), AppError>;
    async fn post_message(&self, room_id: RoomId, text: &str) -> Result<(), AppError>;
}
