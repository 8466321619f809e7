use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::api::{Account, Message, Room, RoomId, RoomMembership, UserId};
use crate::shared::AppError;

/// Source of an event, the first word of its wire line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Accounts,
    Rooms,
    Users,
    Messages,
    Interface,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Accounts => "accounts",
            Domain::Rooms => "rooms",
            Domain::Users => "users",
            Domain::Messages => "messages",
            Domain::Interface => "interface",
        }
    }
}

/// Control-plane actions that end the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Error,
    Exit,
    Logout,
    Quit,
}

impl ControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::Error => "error",
            ControlAction::Exit => "exit",
            ControlAction::Logout => "logout",
            ControlAction::Quit => "quit",
        }
    }
}

impl FromStr for ControlAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(ControlAction::Error),
            "exit" => Ok(ControlAction::Exit),
            "logout" => Ok(ControlAction::Logout),
            "quit" => Ok(ControlAction::Quit),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Consecutive transient failures reached the strike limit
    StrikeLimit,
    /// Credentials were rejected; no watcher can make progress
    Unauthorized,
}

/// Why a watcher stopped on its own
#[derive(Debug, Clone, PartialEq)]
pub struct WatchFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl From<&AppError> for WatchFailure {
    fn from(err: &AppError) -> Self {
        let kind = match err {
            AppError::Unauthorized(_) => FailureKind::Unauthorized,
            _ => FailureKind::StrikeLimit,
        };
        Self {
            kind,
            detail: err.to_string(),
        }
    }
}

impl fmt::Display for WatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

/// Everything that flows toward the driver
///
/// Events describe changes that have already been observed on the remote
/// service, or control requests from the command input.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Login succeeded at startup
    AccountLogin { account: Account },

    RoomAdded { room: Room },
    RoomRemoved { room_id: RoomId },
    /// The room watcher stopped; the whole hierarchy is gone
    RoomsFailed { failure: WatchFailure },

    UserAdded { membership: RoomMembership },
    UserRemoved { room_id: RoomId, user_id: UserId },
    /// Online status flipped for a user present in both snapshots
    UserChanged { membership: RoomMembership },
    UsersFailed { room_id: RoomId, failure: WatchFailure },

    MessagePosted { message: Message },
    MessagesFailed { room_id: RoomId, failure: WatchFailure },

    Interface { action: ControlAction },
}

impl Event {
    pub fn domain(&self) -> Domain {
        match self {
            Event::AccountLogin { .. } => Domain::Accounts,
            Event::RoomAdded { .. } | Event::RoomRemoved { .. } | Event::RoomsFailed { .. } => {
                Domain::Rooms
            }
            Event::UserAdded { .. }
            | Event::UserRemoved { .. }
            | Event::UserChanged { .. }
            | Event::UsersFailed { .. } => Domain::Users,
            Event::MessagePosted { .. } | Event::MessagesFailed { .. } => Domain::Messages,
            Event::Interface { .. } => Domain::Interface,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Event::AccountLogin { .. } => "login",
            Event::RoomAdded { .. } | Event::UserAdded { .. } => "add",
            Event::RoomRemoved { .. } | Event::UserRemoved { .. } => "remove",
            Event::UserChanged { .. } => "change",
            Event::MessagePosted { .. } => "new",
            Event::RoomsFailed { .. } | Event::UsersFailed { .. } | Event::MessagesFailed { .. } => {
                "error"
            }
            Event::Interface { action } => action.as_str(),
        }
    }

    /// Room the event belongs to, if it is scoped to one
    pub fn room_id(&self) -> Option<RoomId> {
        match self {
            Event::RoomAdded { room } => Some(room.id),
            Event::RoomRemoved { room_id }
            | Event::UserRemoved { room_id, .. }
            | Event::UsersFailed { room_id, .. }
            | Event::MessagesFailed { room_id, .. } => Some(*room_id),
            Event::UserAdded { membership } | Event::UserChanged { membership } => {
                Some(membership.room_id)
            }
            Event::MessagePosted { message } => Some(message.posted_room_id),
            Event::AccountLogin { .. } | Event::RoomsFailed { .. } | Event::Interface { .. } => None,
        }
    }

    /// Whether the driver must stop after seeing this event
    pub fn is_termination(&self) -> bool {
        matches!(self, Event::Interface { .. } | Event::RoomsFailed { .. })
    }

    /// Renders the `<domain> <action> <id...> [<payload>]` line consumers read
    pub fn wire_line(&self) -> Result<String, AppError> {
        let head = format!("{} {}", self.domain().as_str(), self.action());

        let line = match self {
            Event::AccountLogin { account } => format!("{} {}", head, payload(account)?),
            Event::RoomAdded { room } => format!("{} {} {}", head, room.id, payload(room)?),
            Event::RoomRemoved { room_id } => format!("{} {}", head, room_id),
            Event::RoomsFailed { failure } => format!("{} {}", head, failure),
            Event::UserAdded { membership } | Event::UserChanged { membership } => format!(
                "{} {} {} {}",
                head,
                membership.room_id,
                membership.user.id,
                payload(membership)?
            ),
            Event::UserRemoved { room_id, user_id } => {
                format!("{} {} {}", head, room_id, user_id)
            }
            Event::UsersFailed { room_id, failure } | Event::MessagesFailed { room_id, failure } => {
                format!("{} {} {}", head, room_id, failure)
            }
            Event::MessagePosted { message } => format!(
                "{} {} {} {} {}",
                head,
                message.posted_room_id,
                message.posted_by.id,
                message.id,
                payload(message)?
            ),
            Event::Interface { .. } => head,
        };

        Ok(line)
    }
}

fn payload<T: Serialize>(value: &T) -> Result<String, AppError> {
    Ok(serde_json::to_string(value)?)
}
