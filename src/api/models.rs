use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::shared::AppError;

pub type RoomId = i64;
pub type MessageId = i64;
pub type UserId = String;

/// Identity as returned inside rooms, memberships and messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Chat room as listed by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
    pub created_by: User,
    pub created_date: DateTime<Utc>,
    #[serde(default)]
    pub has_admin_permissions: bool,
    #[serde(default)]
    pub has_read_write_permissions: bool,
}

impl Room {
    /// Lower bound for the first message query of this room
    pub fn message_watermark(&self) -> DateTime<Utc> {
        self.last_activity.unwrap_or(self.created_date)
    }
}

/// A user's presence in one room, keyed by (room_id, user.id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMembership {
    pub room_id: RoomId,
    pub user: User,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default)]
    pub joined_date: Option<DateTime<Utc>>,
    pub is_online: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub message_type: String,
    pub posted_time: DateTime<Utc>,
    pub posted_room_id: RoomId,
    pub posted_by: User,
}

/// Identity of the logged-in user, reused by join/leave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub user_id: UserId,
    pub login_user: String,
}

impl Account {
    /// Parses the `<id>:<login>` user data header
    pub fn from_user_data(header: &str) -> Result<Self, AppError> {
        match header.split_once(':') {
            Some((user_id, login_user)) if !user_id.is_empty() => Ok(Self {
                user_id: user_id.to_string(),
                login_user: login_user.to_string(),
            }),
            _ => Err(AppError::Unauthorized(format!(
                "Invalid user data header: {}",
                header
            ))),
        }
    }
}

/// Collection envelope used by every list endpoint
#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    value: Vec<serde_json::Value>,
}

/// Decodes a list response item by item.
///
/// A malformed envelope fails the whole call; a malformed item is logged and
/// skipped so the remaining items still reach the watcher.
pub fn decode_listing<T: DeserializeOwned>(body: &[u8]) -> Result<Vec<T>, AppError> {
    let listing: Listing = serde_json::from_slice(body)?;

    let mut items = Vec::with_capacity(listing.value.len());
    for (index, raw) in listing.value.into_iter().enumerate() {
        match serde_json::from_value::<T>(raw) {
            Ok(item) => items.push(item),
            Err(e) => {
                warn!(
                    index = index,
                    item_type = std::any::type_name::<T>(),
                    error = %e,
                    "Skipping undecodable item"
                );
            }
        }
    }

    Ok(items)
}
