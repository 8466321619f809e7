use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::time::Duration;

use roomwatch::api::{Message, MessageId, Room, RoomId, RoomMembership, User};
use roomwatch::WatchConfig;

// ============================================================================
// Fixtures
// ============================================================================

pub const T0: i64 = 1_456_826_400; // 2016-03-01T10:00:00Z

/// Timestamp `offset_secs` after T0
pub fn at(offset_secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(T0, 0).unwrap() + ChronoDuration::seconds(offset_secs)
}

fn user(id: &str) -> User {
    User {
        id: id.to_string(),
        display_name: id.trim_start_matches("u-").to_string(),
        url: None,
        image_url: None,
    }
}

pub fn room(id: RoomId) -> Room {
    Room {
        id,
        name: format!("room-{}", id),
        description: String::new(),
        last_activity: Some(at(0)),
        created_by: user("u-admin"),
        created_date: at(-86_400),
        has_admin_permissions: false,
        has_read_write_permissions: true,
    }
}

pub fn member(room_id: RoomId, user_id: &str, is_online: bool) -> RoomMembership {
    RoomMembership {
        room_id,
        user: user(user_id),
        last_activity: None,
        joined_date: Some(at(-3_600)),
        is_online,
    }
}

pub fn message(room_id: RoomId, id: MessageId, author: &str, offset_secs: i64) -> Message {
    Message {
        id,
        content: format!("message {}", id),
        message_type: "normal".to_string(),
        posted_time: at(offset_secs),
        posted_room_id: room_id,
        posted_by: user(author),
    }
}

/// Short delays so paused-clock tests stay readable: 1s min, 8s max
pub fn test_config() -> WatchConfig {
    WatchConfig {
        min_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(8),
        strike_limit: 3,
        strike_pause: Duration::from_secs(1),
        channel_capacity: 64,
    }
}
